use eyre::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};

use crate::channel::{shell_quote, CommandChannel, CommandOutput};
use crate::errors::RemoteError;

/// Which part of a found path a `find` pattern is tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOn {
    /// `find -name`: the final path component.
    Name,
    /// `find -path`: the whole path.
    Path,
}

/// Validated glob for a recursive find. The pattern is sent to the remote
/// `find` and re-applied to what comes back, so stray output lines (login
/// banners, warnings on stdout) never become candidate files.
#[derive(Debug, Clone)]
pub struct FindPattern {
    raw: String,
    on: MatchOn,
    matcher: GlobMatcher,
}

impl FindPattern {
    pub fn name(pattern: &str) -> Result<Self> {
        Self::build(pattern, MatchOn::Name)
    }

    pub fn path(pattern: &str) -> Result<Self> {
        Self::build(pattern, MatchOn::Path)
    }

    fn build(pattern: &str, on: MatchOn) -> Result<Self> {
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(false)
            .build()
            .with_context(|| format!("invalid find pattern {:?}", pattern))?
            .compile_matcher();
        Ok(Self {
            raw: pattern.to_owned(),
            on,
            matcher,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        match self.on {
            MatchOn::Name => self.matcher.is_match(file_name(path)),
            MatchOn::Path => self.matcher.is_match(path),
        }
    }

    fn find_flag(&self) -> &'static str {
        match self.on {
            MatchOn::Name => "-name",
            MatchOn::Path => "-path",
        }
    }
}

/// Lists and searches remote directories through a command channel. One
/// command per call; empty output is a normal "nothing there" answer.
pub struct RemoteEnumerator<C> {
    channel: C,
}

impl<C: CommandChannel> RemoteEnumerator<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn into_inner(self) -> C {
        self.channel
    }

    /// Entry names directly under `dir`.
    pub fn list(&mut self, dir: &str) -> Result<Vec<String>> {
        let command = format!("ls -1 {}", shell_quote(dir));
        let output = self.exec(&command)?;
        Ok(output.lines())
    }

    /// Full paths of regular files below `dir` whose name or path matches
    /// `pattern`, in the order `find` reports them.
    pub fn find(&mut self, dir: &str, pattern: &FindPattern) -> Result<Vec<String>> {
        let command = format!(
            "find {} -type f {} {}",
            shell_quote(dir),
            pattern.find_flag(),
            shell_quote(pattern.as_str())
        );
        let output = self.exec(&command)?;
        let mut found = Vec::new();
        for line in output.lines() {
            if pattern.matches(&line) {
                found.push(line);
            } else {
                log::trace!("dropping find output line {:?}", line);
            }
        }
        Ok(found)
    }

    /// Every regular file below `dir`.
    pub fn find_all(&mut self, dir: &str) -> Result<Vec<String>> {
        let command = format!("find {} -type f", shell_quote(dir));
        Ok(self.exec(&command)?.lines())
    }

    /// `list`, with a failed command logged and treated as empty.
    pub fn list_or_empty(&mut self, dir: &str) -> Vec<String> {
        self.list(dir).unwrap_or_else(|err| {
            log::warn!("listing {} failed, treating as empty: {:#}", dir, err);
            Vec::new()
        })
    }

    /// `find`, with a failed command logged and treated as empty.
    pub fn find_or_empty(&mut self, dir: &str, pattern: &FindPattern) -> Vec<String> {
        self.find(dir, pattern).unwrap_or_else(|err| {
            log::warn!("find under {} failed, treating as empty: {:#}", dir, err);
            Vec::new()
        })
    }

    fn exec(&mut self, command: &str) -> Result<CommandOutput> {
        let output = self.channel.run(command)?;
        if !output.success() {
            return Err(RemoteError::Enumeration {
                command: command.to_owned(),
                stderr: output.stderr,
                status: output.status,
            }
            .into());
        }
        Ok(output)
    }
}

/// Final component of a slash-separated remote path.
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Join remote path segments with single slashes.
pub fn join_remote(base: &str, child: &str) -> String {
    if base.is_empty() {
        return child.to_owned();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        child.trim_start_matches('/')
    )
}
