//! Byte accounting and upload time estimates.

use std::fmt;
use std::num::NonZeroU64;
use std::time::Duration;

use eyre::Result;
use serde::Serialize;

use crate::channel::{shell_quote, CommandChannel};
use crate::errors::RemoteError;
use crate::selection::RemoteFile;

/// Assumed uplink speed when nothing better is configured: 5 MiB/s.
pub const DEFAULT_THROUGHPUT: u64 = 5 * 1024 * 1024;

/// Summed sizes of a file set. `unknown_size` counts files whose size could
/// not be read; they contribute nothing to `total_bytes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SizeReport {
    pub total_bytes: u64,
    pub unknown_size: usize,
    pub files: Vec<RemoteFile>,
}

impl SizeReport {
    pub fn from_files(files: Vec<RemoteFile>) -> Self {
        let mut total_bytes = 0u64;
        let mut unknown_size = 0usize;
        for file in &files {
            match file.size_bytes() {
                Some(size) => total_bytes = total_bytes.saturating_add(size),
                None => unknown_size += 1,
            }
        }
        Self {
            total_bytes,
            unknown_size,
            files,
        }
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

pub struct SizeAggregator<C> {
    channel: C,
}

impl<C: CommandChannel> SizeAggregator<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Byte size of one remote path. Empty or non-numeric output means the
    /// size is unknown, which is reported as `RemoteError::SizeQuery`.
    pub fn size_of(&mut self, path: &str) -> Result<u64> {
        let command = format!("stat -c %s {} || true", shell_quote(path));
        let output = self.channel.run(&command)?;
        let text = output.stdout.trim();
        parse_decimal(text).ok_or_else(|| {
            let detail = if text.is_empty() {
                "no output".to_owned()
            } else {
                format!("unexpected output {:?}", text)
            };
            RemoteError::SizeQuery {
                path: path.to_owned(),
                detail,
            }
            .into()
        })
    }

    /// Fill in missing sizes (one query per file) and sum them.
    pub fn measure(&mut self, files: Vec<RemoteFile>) -> Result<SizeReport> {
        let mut measured = Vec::with_capacity(files.len());
        for file in files {
            if file.size_bytes().is_some() {
                measured.push(file);
                continue;
            }
            let size = match self.size_of(file.path()) {
                Ok(size) => Some(size),
                Err(err) => {
                    if crate::errors::remote_error(&err).is_none() {
                        return Err(err);
                    }
                    log::warn!("{:#}", err);
                    None
                }
            };
            measured.push(file.with_size(size));
        }
        Ok(SizeReport::from_files(measured))
    }

    /// File count and total bytes of a whole directory tree, for batch uploads.
    pub fn roll_totals(&mut self, dir: &str) -> Result<RollTotals> {
        let quoted = shell_quote(dir);
        let count = self
            .channel
            .run(&format!("find {} -type f | wc -l", quoted))?;
        let bytes = self
            .channel
            .run(&format!("du -sb {} | cut -f1", quoted))?;
        Ok(RollTotals {
            files: parse_decimal(count.stdout.trim()),
            bytes: parse_decimal(bytes.stdout.trim()),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RollTotals {
    pub files: Option<u64>,
    pub bytes: Option<u64>,
}

/// Digits only: no sign, no whitespace.
pub(crate) fn parse_decimal(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Estimated upload time at a fixed assumed throughput. An estimate only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EtaEstimate {
    pub total: Duration,
}

impl EtaEstimate {
    pub fn minutes(&self) -> u64 {
        self.total.as_secs() / 60
    }

    pub fn seconds(&self) -> u64 {
        self.total.as_secs() % 60
    }
}

impl fmt::Display for EtaEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "~{}m {}s", self.minutes(), self.seconds())
    }
}

pub fn estimate_eta(total_bytes: u64, throughput_bytes_per_sec: NonZeroU64) -> EtaEstimate {
    let secs = total_bytes as f64 / throughput_bytes_per_sec.get() as f64;
    EtaEstimate {
        total: Duration::from_secs_f64(secs),
    }
}

/// `"12.34 MB / 0.01 GB"`, binary units.
pub fn format_size(bytes: u64) -> String {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    let gb = bytes as f64 / (1024.0 * 1024.0 * 1024.0);
    format!("{:.2} MB / {:.2} GB", mb, gb)
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes == 0 {
        return "0 B".to_owned();
    }
    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}
