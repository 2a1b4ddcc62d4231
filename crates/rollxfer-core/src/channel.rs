//! Remote command execution.
//!
//! Every filesystem question about the inspection machine is answered by
//! running a shell command and reading its text output. `CommandChannel`
//! is the seam; `ShellChannel` implements it with `sh -c`, optionally
//! behind a launcher prefix such as `ssh kniti@storage`.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, TryRecvError};
use eyre::{eyre, Context, Result};

const READ_CHUNK: usize = 4096;

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Non-empty stdout lines, trailing whitespace removed.
    pub fn lines(&self) -> Vec<String> {
        self.stdout
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

/// A command whose stdout is consumed incrementally while it runs.
pub trait RunningCommand: Send {
    /// Next ready chunk of stdout, without blocking.
    fn try_read(&mut self) -> Option<Vec<u8>>;

    /// Whether the command has exited. Output may still be buffered.
    fn exit_status_ready(&mut self) -> bool;

    /// Wait for exit and collect whatever stdout was not read yet, plus stderr
    /// and the exit status.
    fn finish(self: Box<Self>) -> Result<CommandOutput>;

    /// Stop waiting on the command. Implementations kill it when they can.
    fn abort(self: Box<Self>);
}

pub trait CommandChannel {
    /// Run to completion and capture the output.
    fn run(&mut self, command: &str) -> Result<CommandOutput>;

    /// Start a command whose output is polled by the caller.
    fn spawn(&mut self, command: &str) -> Result<Box<dyn RunningCommand>>;
}

impl<C: CommandChannel + ?Sized> CommandChannel for &mut C {
    fn run(&mut self, command: &str) -> Result<CommandOutput> {
        (**self).run(command)
    }

    fn spawn(&mut self, command: &str) -> Result<Box<dyn RunningCommand>> {
        (**self).spawn(command)
    }
}

/// Quote a value for inclusion in a POSIX shell command line.
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-_./=:@%+,".contains(&b))
    {
        return value.to_owned();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Runs commands through `sh -c`, or hands the command line to a launcher
/// (`ssh host`) that evaluates it in a remote shell.
#[derive(Debug, Clone, Default)]
pub struct ShellChannel {
    launcher: Vec<String>,
}

impl ShellChannel {
    /// Local shell.
    pub fn local() -> Self {
        Self::default()
    }

    /// Commands are appended as the final argument of `launcher`.
    pub fn with_launcher<I, S>(launcher: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            launcher: launcher.into_iter().map(Into::into).collect(),
        }
    }

    pub fn launcher(&self) -> &[String] {
        &self.launcher
    }

    fn command(&self, command_line: &str) -> Command {
        match self.launcher.split_first() {
            Some((program, args)) => {
                let mut cmd = Command::new(program);
                cmd.args(args).arg(command_line);
                cmd
            }
            None => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(command_line);
                cmd
            }
        }
    }
}

impl CommandChannel for ShellChannel {
    fn run(&mut self, command: &str) -> Result<CommandOutput> {
        log::debug!("run: {}", command);
        let output = self
            .command(command)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to launch `{}`", command))?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code().unwrap_or(-1),
        })
    }

    fn spawn(&mut self, command: &str) -> Result<Box<dyn RunningCommand>> {
        log::debug!("spawn: {}", command);
        let mut child = self
            .command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to launch `{}`", command))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| eyre!("stdout not captured for `{}`", command))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| eyre!("stderr not captured for `{}`", command))?;

        let (tx, rx) = crossbeam_channel::unbounded();
        let stdout_pump = thread::spawn(move || {
            let mut buf = [0u8; READ_CHUNK];
            loop {
                match stdout.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        let stderr_pump = thread::spawn(move || {
            let mut collected = Vec::new();
            let _ = stderr.read_to_end(&mut collected);
            collected
        });

        Ok(Box::new(ShellProcess {
            child,
            chunks: rx,
            stdout_pump: Some(stdout_pump),
            stderr_pump: Some(stderr_pump),
            exited: None,
        }))
    }
}

struct ShellProcess {
    child: Child,
    chunks: Receiver<Vec<u8>>,
    stdout_pump: Option<JoinHandle<()>>,
    stderr_pump: Option<JoinHandle<Vec<u8>>>,
    exited: Option<i32>,
}

impl RunningCommand for ShellProcess {
    fn try_read(&mut self) -> Option<Vec<u8>> {
        match self.chunks.try_recv() {
            Ok(chunk) => Some(chunk),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    fn exit_status_ready(&mut self) -> bool {
        if self.exited.is_some() {
            return true;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.exited = Some(status.code().unwrap_or(-1));
                true
            }
            Ok(None) => false,
            // Treat an unobservable child as finished so the poll loop ends.
            Err(_) => true,
        }
    }

    fn finish(mut self: Box<Self>) -> Result<CommandOutput> {
        let status = match self.exited {
            Some(code) => code,
            None => self
                .child
                .wait()
                .wrap_err("failed waiting for command exit")?
                .code()
                .unwrap_or(-1),
        };
        if let Some(pump) = self.stdout_pump.take() {
            let _ = pump.join();
        }
        let mut rest = Vec::new();
        for chunk in self.chunks.try_iter() {
            rest.extend_from_slice(&chunk);
        }
        let stderr = match self.stderr_pump.take() {
            Some(pump) => pump.join().unwrap_or_default(),
            None => Vec::new(),
        };
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&rest).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            status,
        })
    }

    fn abort(mut self: Box<Self>) {
        if let Err(err) = self.child.kill() {
            log::debug!("kill after abort failed: {}", err);
        }
        let _ = self.child.wait();
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted channel for unit tests.

    use super::*;
    use std::collections::{HashMap, VecDeque};

    #[derive(Default)]
    pub struct FakeChannel {
        pub responses: HashMap<String, CommandOutput>,
        pub spawned: VecDeque<FakeRunning>,
        pub issued: Vec<String>,
    }

    impl FakeChannel {
        pub fn respond(&mut self, command: &str, stdout: &str, status: i32) {
            self.responses.insert(
                command.to_owned(),
                CommandOutput {
                    stdout: stdout.to_owned(),
                    stderr: if status == 0 {
                        String::new()
                    } else {
                        "boom".to_owned()
                    },
                    status,
                },
            );
        }
    }

    impl CommandChannel for FakeChannel {
        fn run(&mut self, command: &str) -> Result<CommandOutput> {
            self.issued.push(command.to_owned());
            Ok(self.responses.get(command).cloned().unwrap_or_default())
        }

        fn spawn(&mut self, command: &str) -> Result<Box<dyn RunningCommand>> {
            self.issued.push(command.to_owned());
            let running = self
                .spawned
                .pop_front()
                .ok_or_else(|| eyre!("no scripted process for `{}`", command))?;
            Ok(Box::new(running))
        }
    }

    /// Emits one chunk per poll, then reports exit.
    #[derive(Default)]
    pub struct FakeRunning {
        pub chunks: VecDeque<Vec<u8>>,
        pub status: i32,
        pub stderr: String,
        pub never_exits: bool,
    }

    impl FakeRunning {
        pub fn new(chunks: &[&str], status: i32) -> Self {
            Self {
                chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
                status,
                ..Self::default()
            }
        }
    }

    impl RunningCommand for FakeRunning {
        fn try_read(&mut self) -> Option<Vec<u8>> {
            self.chunks.pop_front()
        }

        fn exit_status_ready(&mut self) -> bool {
            !self.never_exits && self.chunks.is_empty()
        }

        fn finish(self: Box<Self>) -> Result<CommandOutput> {
            Ok(CommandOutput {
                stdout: String::new(),
                stderr: self.stderr,
                status: self.status,
            })
        }

        fn abort(self: Box<Self>) {}
    }
}
