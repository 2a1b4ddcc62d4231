//! Sequential, single-pass transfer of a selected file list.
//!
//! Files go to the transfer script one at a time in the order given. A
//! failed file is recorded and the run moves on; only a stop request ends
//! the run early. There is no retry and no resume.

use eyre::Result;

use crate::channel::CommandChannel;
use crate::decoder::ProgressEvent;
use crate::errors::{remote_error, RemoteError};
use crate::selection::RemoteFile;
use crate::transfer_script::TransferScript;

pub mod options;
mod session;
mod summary;

pub use options::{PollOptions, StopSignal, TransferOptions};
pub use session::{ProgressSnapshot, TransferSession};
pub use summary::{FailedTransfer, TransferSummary};

pub struct TransferOrchestrator {
    options: TransferOptions,
}

impl TransferOrchestrator {
    pub fn new(options: TransferOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Hand each file to `transfer` in order.
    ///
    /// `transfer` returns `Ok(true)` when the file was confirmed, `Ok(false)`
    /// when it was attempted but not confirmed, and `Err` when the attempt
    /// itself failed. Every call counts as an attempt in `uploaded_files`;
    /// only `Ok(true)` counts as confirmed. `on_progress` sees a snapshot
    /// after every file.
    pub fn run<T, P>(
        &self,
        files: &[RemoteFile],
        mut transfer: T,
        mut on_progress: P,
    ) -> TransferSummary
    where
        T: FnMut(&RemoteFile) -> Result<bool>,
        P: FnMut(&ProgressSnapshot),
    {
        let total_bytes = files
            .iter()
            .filter_map(RemoteFile::size_bytes)
            .fold(0u64, u64::saturating_add);
        let unknown = files.iter().filter(|f| f.size_bytes().is_none()).count();
        let mut session = TransferSession::new(files.len() as u64, total_bytes);
        let mut failed = Vec::new();
        let mut cancelled = false;

        log::info!(
            "starting transfer of {} file(s), {} byte(s) known",
            files.len(),
            total_bytes
        );

        for file in files {
            if self.options.stop.is_stopped() {
                cancelled = true;
                break;
            }
            let confirmed = match transfer(file) {
                Ok(true) => true,
                Ok(false) => {
                    failed.push(FailedTransfer {
                        path: file.path().to_owned(),
                        reason: "transfer not confirmed".to_owned(),
                    });
                    false
                }
                Err(err) => {
                    if let Some(RemoteError::Cancelled { .. }) = remote_error(&err) {
                        cancelled = true;
                        break;
                    }
                    log::warn!("{}: {:#}", file.path(), err);
                    failed.push(FailedTransfer {
                        path: file.path().to_owned(),
                        reason: format!("{:#}", err),
                    });
                    false
                }
            };
            session.record_attempt(file.size_bytes(), confirmed);
            on_progress(&session.snapshot());
        }

        let summary = TransferSummary::from_session(&session, unknown, failed, cancelled);
        log::info!(
            "transfer finished: {} attempted, {} confirmed, {} failed{}",
            summary.attempted,
            summary.confirmed,
            summary.failed.len(),
            if summary.cancelled { " (stopped)" } else { "" }
        );
        summary
    }

    /// `run` with each file uploaded by one invocation of `script`.
    pub fn run_with_script<C, P>(
        &self,
        channel: &mut C,
        script: &TransferScript,
        files: &[RemoteFile],
        on_progress: P,
    ) -> TransferSummary
    where
        C: CommandChannel + ?Sized,
        P: FnMut(&ProgressSnapshot),
    {
        let poll = self.options.poll;
        let stop = self.options.stop.clone();
        self.run(
            files,
            |file| {
                let outcome = script.invoke(&mut *channel, file.path(), &poll, &stop, |_| {})?;
                match outcome.failure(file.path()) {
                    Some(err) => Err(err.into()),
                    None => Ok(true),
                }
            },
            on_progress,
        )
    }

    /// Upload a whole directory with a single script invocation. Progress
    /// comes from the script's own output: `TOTAL_FILES=` sets the file
    /// total and every `Uploading` line counts one confirmed file. Known
    /// bytes advance by each file's share of `total_bytes`.
    pub fn run_batch<C, P>(
        &self,
        channel: &mut C,
        script: &TransferScript,
        dir: &str,
        expected_files: Option<u64>,
        total_bytes: Option<u64>,
        mut on_progress: P,
    ) -> Result<TransferSummary>
    where
        C: CommandChannel + ?Sized,
        P: FnMut(&ProgressSnapshot),
    {
        let mut session = TransferSession::batch(expected_files, total_bytes.unwrap_or(0));
        log::info!("starting batch upload of {}", dir);

        let result = script.invoke(
            channel,
            dir,
            &self.options.poll,
            &self.options.stop,
            |event| {
                match event {
                    ProgressEvent::TotalDeclared { count } => session.declare_total(*count),
                    ProgressEvent::FileUploaded { .. } => session.record_batch_file(),
                }
                on_progress(&session.snapshot());
            },
        );

        let unknown = usize::from(total_bytes.is_none());
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                return match remote_error(&err) {
                    Some(RemoteError::Cancelled { .. }) => Ok(TransferSummary::from_session(
                        &session,
                        unknown,
                        Vec::new(),
                        true,
                    )),
                    _ => Err(err),
                };
            }
        };

        let mut failed = Vec::new();
        match outcome.failure(dir) {
            Some(err) => failed.push(FailedTransfer {
                path: dir.to_owned(),
                reason: err.to_string(),
            }),
            None => {
                session.finish_batch();
                on_progress(&session.snapshot());
            }
        }
        Ok(TransferSummary::from_session(&session, unknown, failed, false))
    }
}
