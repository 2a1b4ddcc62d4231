#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use eyre::{eyre, Result};
use rollxfer_core::channel::{CommandChannel, CommandOutput, RunningCommand};

/// In-memory stand-in for the inspection machine. `run` answers from a table
/// of canned outputs; `spawn` hands out scripted processes in order.
#[derive(Default)]
pub struct ScriptedChannel {
    outputs: HashMap<String, CommandOutput>,
    processes: VecDeque<ScriptedProcess>,
    pub issued: Vec<String>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, command: &str, stdout: &str) -> Self {
        self.outputs.insert(
            command.to_owned(),
            CommandOutput {
                stdout: stdout.to_owned(),
                ..CommandOutput::default()
            },
        );
        self
    }

    pub fn failing(mut self, command: &str, status: i32, stderr: &str) -> Self {
        self.outputs.insert(
            command.to_owned(),
            CommandOutput {
                stdout: String::new(),
                stderr: stderr.to_owned(),
                status,
            },
        );
        self
    }

    pub fn process(mut self, process: ScriptedProcess) -> Self {
        self.processes.push_back(process);
        self
    }
}

impl CommandChannel for ScriptedChannel {
    fn run(&mut self, command: &str) -> Result<CommandOutput> {
        self.issued.push(command.to_owned());
        self.outputs
            .get(command)
            .cloned()
            .ok_or_else(|| eyre!("unexpected command: {}", command))
    }

    fn spawn(&mut self, command: &str) -> Result<Box<dyn RunningCommand>> {
        self.issued.push(command.to_owned());
        let process = self
            .processes
            .pop_front()
            .ok_or_else(|| eyre!("unexpected spawn: {}", command))?;
        Ok(Box::new(process))
    }
}

/// Emits its chunks one poll at a time and exits once they are gone.
#[derive(Default)]
pub struct ScriptedProcess {
    chunks: VecDeque<Vec<u8>>,
    status: i32,
    stderr: String,
    hang: bool,
    aborted: Arc<AtomicBool>,
}

impl ScriptedProcess {
    pub fn printing(chunks: &[&[u8]]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_vec()).collect(),
            ..Self::default()
        }
    }

    pub fn exit(mut self, status: i32, stderr: &str) -> Self {
        self.status = status;
        self.stderr = stderr.to_owned();
        self
    }

    /// Never reports exit; only a stop request or timeout ends polling.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    /// Flag raised when the orchestrator kills this process.
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.aborted)
    }
}

impl RunningCommand for ScriptedProcess {
    fn try_read(&mut self) -> Option<Vec<u8>> {
        self.chunks.pop_front()
    }

    fn exit_status_ready(&mut self) -> bool {
        !self.hang && self.chunks.is_empty()
    }

    fn finish(self: Box<Self>) -> Result<CommandOutput> {
        Ok(CommandOutput {
            stdout: String::new(),
            stderr: self.stderr,
            status: self.status,
        })
    }

    fn abort(self: Box<Self>) {
        self.aborted.store(true, Ordering::SeqCst);
    }
}
