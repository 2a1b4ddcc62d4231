use std::time::Duration;

use serde::Serialize;

use super::session::TransferSession;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedTransfer {
    pub path: String,
    pub reason: String,
}

/// Outcome of a transfer run.
///
/// `attempted` counts every file handed to the transfer script; `confirmed`
/// counts the ones the script reported as successful.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TransferSummary {
    pub total_files: u64,
    pub attempted: u64,
    pub confirmed: u64,
    pub uploaded_bytes: u64,
    pub total_bytes: u64,
    pub unknown_size_files: usize,
    pub failed: Vec<FailedTransfer>,
    pub cancelled: bool,
    pub duration: Duration,
}

impl TransferSummary {
    pub(crate) fn from_session(
        session: &TransferSession,
        unknown_size_files: usize,
        failed: Vec<FailedTransfer>,
        cancelled: bool,
    ) -> Self {
        Self {
            total_files: session.total_files(),
            attempted: session.uploaded_files(),
            confirmed: session.confirmed_files(),
            uploaded_bytes: session.uploaded_bytes(),
            total_bytes: session.total_bytes(),
            unknown_size_files,
            failed,
            cancelled,
            duration: session.elapsed(),
        }
    }

    /// Every file was attempted and confirmed.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failed.is_empty() && self.confirmed == self.total_files
    }

    pub fn not_attempted(&self) -> u64 {
        self.total_files.saturating_sub(self.attempted)
    }
}
