//! Invocation of the external upload script.
//!
//! `bash <script> <mill> <machine> <path>` uploads a file or directory from
//! the inspection machine to cloud storage under `/Backup/<mill>/<machine>`.
//! Exit status 0 means the script considers the upload done.

use std::thread;
use std::time::Instant;

use eyre::{bail, Result};

use crate::channel::{shell_quote, CommandChannel, RunningCommand};
use crate::decoder::{ProgressEvent, ProgressStreamDecoder};
use crate::errors::RemoteError;
use crate::orchestrator::options::{PollOptions, StopSignal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferScript {
    script: String,
    mill: String,
    machine: String,
}

impl TransferScript {
    /// Both identifiers are required; the script files uploads under them.
    pub fn new(
        script: impl Into<String>,
        mill: impl Into<String>,
        machine: impl Into<String>,
    ) -> Result<Self> {
        let script = script.into();
        let mill = mill.into();
        let machine = machine.into();
        if script.trim().is_empty() {
            bail!("transfer script path is empty");
        }
        if mill.trim().is_empty() || machine.trim().is_empty() {
            bail!("mill name and machine name are both required");
        }
        Ok(Self {
            script,
            mill,
            machine,
        })
    }

    pub fn destination(&self) -> String {
        format!("/Backup/{}/{}", self.mill, self.machine)
    }

    pub fn command_for(&self, path: &str) -> String {
        format!(
            "bash {} {} {} {}",
            shell_quote(&self.script),
            shell_quote(&self.mill),
            shell_quote(&self.machine),
            shell_quote(path)
        )
    }

    /// Run the script for `path`, decoding progress while it runs. Every
    /// decoded event is handed to `on_event` as soon as its line completes.
    pub fn invoke<C, F>(
        &self,
        channel: &mut C,
        path: &str,
        poll: &PollOptions,
        stop: &StopSignal,
        mut on_event: F,
    ) -> Result<ScriptOutcome>
    where
        C: CommandChannel + ?Sized,
        F: FnMut(&ProgressEvent),
    {
        if path.is_empty() {
            bail!("no remote path given to transfer");
        }
        let command = self.command_for(path);
        let mut running = channel.spawn(&command)?;
        let mut decoder = ProgressStreamDecoder::new();
        let mut outcome = ScriptOutcome::default();
        let started = Instant::now();

        loop {
            if stop.is_stopped() {
                running.abort();
                return Err(RemoteError::Cancelled { command }.into());
            }
            if let Some(limit) = poll.timeout {
                let waited = started.elapsed();
                if waited >= limit {
                    running.abort();
                    return Err(RemoteError::PollTimeout { command, waited }.into());
                }
            }
            if let Some(chunk) = running.try_read() {
                for event in decoder.feed(&chunk) {
                    outcome.record(&event, &mut on_event);
                }
                continue;
            }
            if running.exit_status_ready() {
                drain_ready(&mut *running, &mut decoder, &mut outcome, &mut on_event);
                break;
            }
            thread::sleep(poll.interval);
        }

        let output = running.finish()?;
        for event in decoder.feed(output.stdout.as_bytes()) {
            outcome.record(&event, &mut on_event);
        }
        for event in decoder.finish() {
            outcome.record(&event, &mut on_event);
        }
        outcome.status = output.status;
        outcome.stderr = output.stderr.trim().to_owned();
        outcome.ignored_lines = decoder.ignored_lines();

        if outcome.success() {
            log::debug!(
                "uploaded {} -> {} ({} file(s) reported)",
                path,
                self.destination(),
                outcome.uploaded
            );
        } else {
            log::warn!(
                "upload script failed for {} (status {}): {}",
                path,
                outcome.status,
                outcome.stderr
            );
        }
        Ok(outcome)
    }
}

fn drain_ready<F: FnMut(&ProgressEvent)>(
    running: &mut dyn RunningCommand,
    decoder: &mut ProgressStreamDecoder,
    outcome: &mut ScriptOutcome,
    on_event: &mut F,
) {
    while let Some(chunk) = running.try_read() {
        for event in decoder.feed(&chunk) {
            outcome.record(&event, on_event);
        }
    }
}

/// What one script invocation reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOutcome {
    pub status: i32,
    pub stderr: String,
    /// Last `TOTAL_FILES=` value seen.
    pub declared_total: Option<u64>,
    /// Number of `Uploading` lines seen.
    pub uploaded: u64,
    pub ignored_lines: u64,
}

impl ScriptOutcome {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// The invocation failure for `path`, if the script exited non-zero.
    pub fn failure(&self, path: &str) -> Option<RemoteError> {
        if self.success() {
            return None;
        }
        Some(RemoteError::TransferInvocation {
            path: path.to_owned(),
            status: self.status,
            stderr: self.stderr.clone(),
        })
    }

    fn record<F: FnMut(&ProgressEvent)>(&mut self, event: &ProgressEvent, on_event: &mut F) {
        match event {
            ProgressEvent::TotalDeclared { count } => self.declared_total = Some(*count),
            ProgressEvent::FileUploaded { .. } => self.uploaded += 1,
        }
        on_event(event);
    }
}
