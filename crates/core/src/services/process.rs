//! Synchronous external-process invocation with structured results.
//!
//! Every toolchain call (build, extraction, disassembly) goes through an
//! [`Invocation`], which returns an [`ExitReport`] rather than surfacing
//! failure through panics, and records the exact command line in a
//! [`Transcript`] for post-mortem diagnostics.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Ordered record of every command run and decision made during a pipeline
/// run. Rendered to the user in diagnostic mode so a failed resolution can
/// be replayed step by step.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    entries: Vec<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render one entry per line, newline-terminated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(entry);
            out.push('\n');
        }
        out
    }
}

/// Captured outcome of one external tool call.
#[derive(Debug, Clone)]
pub struct ExitReport {
    /// Exit code, or `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExitReport {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// One-line summary of a failed call, suitable for error messages.
    pub fn failure_summary(&self) -> String {
        let status = match self.code {
            Some(code) => format!("exited with status {code}"),
            None => "was terminated by a signal".to_string(),
        };
        let detail = self.stderr.trim();
        if detail.is_empty() {
            status
        } else {
            format!("{status}: {detail}")
        }
    }
}

/// One blocking external tool call.
///
/// Environment variables are scoped to the spawned subprocess via
/// `Command::env`; nothing is ever written to the parent's environment.
#[derive(Debug)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(String, String)>,
    cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new(), envs: Vec::new(), cwd: None }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_os_string());
        }
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Shell-like rendering of the call, including the scoped environment,
    /// for the transcript.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.envs {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push(' ');
        }
        out.push_str(&self.program.to_string_lossy());
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.to_string_lossy());
        }
        out
    }

    /// Run the tool to completion, capturing its output.
    ///
    /// The command line is recorded in the transcript before spawning, so a
    /// spawn failure still leaves a trace of what was attempted.
    pub fn run(&self, transcript: &mut Transcript) -> io::Result<ExitReport> {
        transcript.note(self.describe());

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        for (key, value) in &self.envs {
            command.env(key, value);
        }
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        let output = command.output()?;
        Ok(ExitReport {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}
