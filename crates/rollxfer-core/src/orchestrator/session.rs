use std::time::{Duration, Instant};

use serde::Serialize;

/// Counters for one transfer run. Owned by the orchestrator for the length
/// of the run and dropped afterwards.
#[derive(Debug, Clone)]
pub struct TransferSession {
    total_files: u64,
    total_known: bool,
    uploaded_files: u64,
    confirmed_files: u64,
    uploaded_bytes: u64,
    total_bytes: u64,
    progress: f64,
    start_time: Instant,
}

impl TransferSession {
    pub fn new(total_files: u64, total_bytes: u64) -> Self {
        Self {
            total_files,
            total_known: true,
            uploaded_files: 0,
            confirmed_files: 0,
            uploaded_bytes: 0,
            total_bytes,
            progress: 0.0,
            start_time: Instant::now(),
        }
    }

    /// Session for a single-invocation directory upload. Without an expected
    /// count the file total stays at 0 until the script declares one.
    pub fn batch(expected_files: Option<u64>, total_bytes: u64) -> Self {
        Self {
            total_known: expected_files.is_some(),
            ..Self::new(expected_files.unwrap_or(0), total_bytes)
        }
    }

    /// One file was handed to the transfer script. `bytes` is its known size.
    pub(crate) fn record_attempt(&mut self, bytes: Option<u64>, confirmed: bool) {
        if self.uploaded_files == self.total_files {
            self.total_files += 1;
        }
        self.uploaded_files += 1;
        if confirmed {
            self.confirmed_files += 1;
        }
        if let Some(bytes) = bytes {
            self.uploaded_bytes = self
                .uploaded_bytes
                .saturating_add(bytes)
                .min(self.total_bytes);
        }
    }

    /// The batch script reported one uploaded file. Per-file sizes are not
    /// known here, so bytes advance by the file's share of the total.
    pub(crate) fn record_batch_file(&mut self) {
        self.uploaded_files += 1;
        self.confirmed_files += 1;
        if self.total_known && self.uploaded_files > self.total_files {
            self.total_files = self.uploaded_files;
        }
        self.pro_rate_bytes();
    }

    /// The script announced how many files a batch holds.
    pub(crate) fn declare_total(&mut self, count: u64) {
        self.total_known = true;
        self.total_files = count.max(self.uploaded_files);
        self.pro_rate_bytes();
    }

    /// The batch script exited cleanly: every byte counts as sent.
    pub(crate) fn finish_batch(&mut self) {
        if !self.total_known {
            self.total_files = self.uploaded_files;
            self.total_known = true;
        }
        self.uploaded_bytes = self.total_bytes;
    }

    fn pro_rate_bytes(&mut self) {
        if !self.total_known || self.total_files == 0 {
            return;
        }
        let done = self.uploaded_files.min(self.total_files);
        let share =
            u128::from(self.total_bytes) * u128::from(done) / u128::from(self.total_files);
        let share = u64::try_from(share).unwrap_or(self.total_bytes);
        self.uploaded_bytes = self.uploaded_bytes.max(share).min(self.total_bytes);
    }

    pub fn total_files(&self) -> u64 {
        self.total_files
    }

    pub fn uploaded_files(&self) -> u64 {
        self.uploaded_files
    }

    pub fn confirmed_files(&self) -> u64 {
        self.confirmed_files
    }

    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Current counters. The reported fraction is held at its highest value
    /// so far, so a total that grows mid-run never moves progress backwards.
    pub fn snapshot(&mut self) -> ProgressSnapshot {
        let mut snapshot = ProgressSnapshot {
            uploaded_files: self.uploaded_files,
            total_files: self.total_files,
            uploaded_bytes: self.uploaded_bytes,
            total_bytes: self.total_bytes,
            elapsed: self.elapsed(),
            progress: 0.0,
        };
        self.progress = self.progress.max(snapshot.measured_fraction());
        snapshot.progress = self.progress;
        snapshot
    }
}

/// Point-in-time view handed to progress listeners after every file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub uploaded_files: u64,
    pub total_files: u64,
    pub uploaded_bytes: u64,
    pub total_bytes: u64,
    pub elapsed: Duration,
    pub progress: f64,
}

impl ProgressSnapshot {
    pub fn file_fraction(&self) -> f64 {
        ratio(self.uploaded_files, self.total_files)
    }

    pub fn byte_fraction(&self) -> f64 {
        ratio(self.uploaded_bytes, self.total_bytes)
    }

    /// Byte-weighted when sizes are known, file-count based otherwise.
    pub fn measured_fraction(&self) -> f64 {
        if self.total_bytes > 0 {
            self.byte_fraction()
        } else {
            self.file_fraction()
        }
    }

    /// Fraction shown to the user. Never lower than in an earlier snapshot
    /// of the same run.
    pub fn fraction(&self) -> f64 {
        self.progress
    }
}

fn ratio(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (done as f64 / total as f64).min(1.0)
}
