use eyre::{bail, eyre, Result};
use rollxfer_core::channel::ShellChannel;
use rollxfer_core::config::{self, Settings};
use rollxfer_core::profile::DataProfile;
use rollxfer_core::roll::{parse_roll_date, RollChoice, RollLocator};
use rollxfer_core::transfer_script::TransferScript;

use crate::cli::{Cli, RollArgs, TargetArgs};

#[derive(Debug, Clone)]
pub struct AppContext {
    pub settings: Settings,
}

impl AppContext {
    pub fn load(cli: &Cli) -> Result<Self> {
        config::use_settings_dir(cli.config_dir.as_deref());
        let mut settings = Settings::load_default()?;
        if let Some(mib) = cli.throughput_mib {
            settings.throughput_bytes_per_sec = mib.saturating_mul(1024 * 1024);
            settings.validate()?;
        }
        Ok(Self { settings })
    }

    pub fn channel(&self) -> ShellChannel {
        if self.settings.remote_shell.is_empty() {
            ShellChannel::local()
        } else {
            ShellChannel::with_launcher(self.settings.remote_shell.iter().cloned())
        }
    }

    /// Roll location for `args`. Profiles that browse per date require one.
    pub fn locator(&self, args: &RollArgs) -> Result<RollLocator> {
        self.roll_locator(args.profile, &args.roll, args.date.as_deref())
    }

    pub fn roll_locator(
        &self,
        profile: DataProfile,
        roll: &str,
        date: Option<&str>,
    ) -> Result<RollLocator> {
        let roll = RollChoice::parse(roll)?;
        let locator = RollLocator::new(profile.base_dir(&self.settings), roll.name);
        match date {
            Some(raw) => Ok(locator.on(parse_roll_date(raw)?)),
            None => Ok(locator),
        }
    }

    /// Whole-roll folder under the MDD or FDA data root.
    pub fn full_roll_locator(&self, profile: DataProfile, roll: &str) -> Result<RollLocator> {
        match profile {
            DataProfile::Mdd | DataProfile::Fda => self.roll_locator(profile, roll, None),
            other => bail!("upload-roll takes --profile mdd or fda, not {}", other),
        }
    }

    pub fn transfer_script(&self, target: &TargetArgs) -> Result<TransferScript> {
        let mill = target
            .mill
            .clone()
            .or_else(|| self.settings.mill_name.clone())
            .ok_or_else(|| eyre!("mill name is required (--mill or mill_name in the config file)"))?;
        let machine = target
            .machine
            .clone()
            .or_else(|| self.settings.machine_name.clone())
            .ok_or_else(|| {
                eyre!("machine name is required (--machine or machine_name in the config file)")
            })?;
        let script = target
            .script
            .clone()
            .unwrap_or_else(|| self.settings.transfer_script.clone());
        TransferScript::new(script, mill, machine)
    }
}
