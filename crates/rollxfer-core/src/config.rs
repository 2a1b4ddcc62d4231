use std::fs;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::{BaseDirs, ProjectDirs};
use eyre::{eyre, Context, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::orchestrator::PollOptions;
use crate::sizing::DEFAULT_THROUGHPUT;

pub const SETTINGS_FILE: &str = "rollxfer.toml";

/// Directory given with `--config-dir`. Wins over the per-user location.
static SETTINGS_DIR: Lazy<RwLock<Option<PathBuf>>> = Lazy::new(|| RwLock::new(None));

/// Read settings from `dir` for the rest of the process. `None` goes back
/// to the per-user location.
pub fn use_settings_dir(dir: Option<&Path>) {
    *SETTINGS_DIR.write() = dir.map(Path::to_path_buf);
}

/// Full path of the settings file this process reads.
pub fn settings_path() -> Result<PathBuf> {
    let chosen = SETTINGS_DIR.read().clone();
    let dir = chosen
        .or_else(|| {
            ProjectDirs::from("com", "Kniti", "rollxfer").map(|p| p.config_dir().to_path_buf())
        })
        .or_else(|| BaseDirs::new().map(|b| b.home_dir().join(".config").join("rollxfer")))
        .ok_or_else(|| {
            eyre!(
                "no home directory to look for {} in; pass --config-dir",
                SETTINGS_FILE
            )
        })?;
    Ok(dir.join(SETTINGS_FILE))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Root of machine-data (MDD) rolls on the inspection machine.
    pub mdd_dir: String,
    /// Root of fabric-defect image (FDA) rolls.
    pub fda_dir: String,
    /// Upload script on the inspection machine.
    pub transfer_script: String,
    /// Launcher argv that reaches the machine, e.g. `["ssh", "kniti@storage"]`.
    /// Empty runs commands in a local shell.
    pub remote_shell: Vec<String>,
    /// Assumed upload speed for time estimates.
    pub throughput_bytes_per_sec: u64,
    pub poll_interval_ms: u64,
    pub transfer_timeout_secs: Option<u64>,
    pub mill_name: Option<String>,
    pub machine_name: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mdd_dir: "/home/kniti/projects/knit-i/knitting-core/data".to_owned(),
            fda_dir: "/home/kniti/projects/knit-i/knitting-core/images".to_owned(),
            transfer_script: "/home/kniti/upload_to_onedrive.sh".to_owned(),
            remote_shell: Vec::new(),
            throughput_bytes_per_sec: DEFAULT_THROUGHPUT,
            poll_interval_ms: 200,
            transfer_timeout_secs: None,
            mill_name: None,
            machine_name: None,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .wrap_err_with(|| format!("failed to parse config file: {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Settings from `settings_path()`, or defaults when the file does not
    /// exist.
    pub fn load_default() -> Result<Self> {
        let path = settings_path()?;
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn validate(&self) -> Result<()> {
        self.throughput()?;
        if self.poll_interval_ms == 0 {
            return Err(eyre!("poll_interval_ms must be greater than zero"));
        }
        Ok(())
    }

    pub fn throughput(&self) -> Result<NonZeroU64> {
        NonZeroU64::new(self.throughput_bytes_per_sec)
            .ok_or_else(|| eyre!("throughput_bytes_per_sec must be greater than zero"))
    }

    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            timeout: self.transfer_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(
            &path,
            "remote_shell = [\"ssh\", \"kniti@10.0.0.5\"]\nmill_name = \"Mill A\"\ntransfer_timeout_secs = 600\n",
        )
        .unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.remote_shell, vec!["ssh", "kniti@10.0.0.5"]);
        assert_eq!(settings.mill_name.as_deref(), Some("Mill A"));
        assert_eq!(settings.throughput_bytes_per_sec, DEFAULT_THROUGHPUT);
        assert_eq!(
            settings.poll_options(),
            PollOptions {
                interval: Duration::from_millis(200),
                timeout: Some(Duration::from_secs(600)),
            }
        );
    }

    #[test]
    fn rejects_zero_throughput() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "throughput_bytes_per_sec = 0\n").unwrap();
        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn rejects_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "upload_speed = 5\n").unwrap();
        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn chosen_directory_holds_the_settings_file() {
        let dir = tempdir().unwrap();
        use_settings_dir(Some(dir.path()));
        assert_eq!(settings_path().unwrap(), dir.path().join(SETTINGS_FILE));
        let missing = Settings::load_default().unwrap();

        fs::write(dir.path().join(SETTINGS_FILE), "machine_name = \"KM-07\"\n").unwrap();
        let written = Settings::load_default().unwrap();
        use_settings_dir(None);

        assert_eq!(missing, Settings::default());
        assert_eq!(written.machine_name.as_deref(), Some("KM-07"));
        assert_ne!(settings_path().ok(), Some(dir.path().join(SETTINGS_FILE)));
    }
}
