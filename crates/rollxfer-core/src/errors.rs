//! Error taxonomy for remote selection and transfer.
//!
//! Failures are split by how the workflow reacts to them:
//! - Enumeration: a listing/find command failed; surfaced to the caller
//! - SizeQuery: a size command failed; degrades to "unknown size"
//! - TransferInvocation: the transfer script exited non-zero; recorded, not fatal
//! - InvalidRange / PollTimeout / Cancelled: rejected input or an interrupted poll

use std::fmt;
use std::time::Duration;

/// Coarse severity used by callers deciding whether to keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// The workflow cannot continue (bad input, listing failure).
    Fatal,
    /// A single item degraded; the rest of the run proceeds.
    Degraded,
    /// The operator or a deadline stopped the run.
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    Enumeration {
        command: String,
        stderr: String,
        status: i32,
    },
    SizeQuery {
        path: String,
        detail: String,
    },
    TransferInvocation {
        path: String,
        status: i32,
        stderr: String,
    },
    InvalidRange {
        min: u64,
        max: u64,
    },
    PollTimeout {
        command: String,
        waited: Duration,
    },
    Cancelled {
        command: String,
    },
}

impl RemoteError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RemoteError::Enumeration { .. } | RemoteError::InvalidRange { .. } => {
                ErrorSeverity::Fatal
            }
            RemoteError::SizeQuery { .. } | RemoteError::TransferInvocation { .. } => {
                ErrorSeverity::Degraded
            }
            RemoteError::PollTimeout { .. } | RemoteError::Cancelled { .. } => {
                ErrorSeverity::Interrupted
            }
        }
    }

    /// True when the run should stop rather than move on to the next file.
    pub fn halts_run(&self) -> bool {
        self.severity() != ErrorSeverity::Degraded
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Enumeration {
                command,
                stderr,
                status,
            } => {
                write!(f, "enumeration command `{}` exited with {}", command, status)?;
                if !stderr.trim().is_empty() {
                    write!(f, ": {}", stderr.trim())?;
                }
                Ok(())
            }
            RemoteError::SizeQuery { path, detail } => {
                write!(f, "size query for {} failed: {}", path, detail)
            }
            RemoteError::TransferInvocation {
                path,
                status,
                stderr,
            } => {
                write!(f, "transfer of {} exited with {}", path, status)?;
                if !stderr.trim().is_empty() {
                    write!(f, ": {}", stderr.trim())?;
                }
                Ok(())
            }
            RemoteError::InvalidRange { min, max } => {
                write!(f, "invalid range: minimum {} exceeds maximum {}", min, max)
            }
            RemoteError::PollTimeout { command, waited } => {
                write!(f, "`{}` still running after {:.1?}", command, waited)
            }
            RemoteError::Cancelled { command } => write!(f, "`{}` cancelled", command),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Find a `RemoteError` inside an eyre report, if one is there.
pub fn remote_error(report: &eyre::Report) -> Option<&RemoteError> {
    report.downcast_ref::<RemoteError>()
}
