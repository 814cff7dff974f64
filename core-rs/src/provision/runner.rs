//! External process execution
//!
//! Package managers, build drivers and gst-inspect are all opaque
//! processes; only the exit status matters. The [`CommandRunner`] seam lets
//! tests record invocations instead of spawning them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::errors::{EnvError, Result};

/// A process invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    /// Discard stdout/stderr
    pub quiet: bool,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Executes external commands
pub trait CommandRunner {
    /// Run to completion and return the exit code
    ///
    /// A process killed by a signal reports -1. Failing to spawn is an error.
    fn status(&self, command: &ExternalCommand) -> Result<i32>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn status(&self, command: &ExternalCommand) -> Result<i32> {
        (**self).status(command)
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for Box<R> {
    fn status(&self, command: &ExternalCommand) -> Result<i32> {
        (**self).status(command)
    }
}

/// Run a required step: non-zero exit is `ExternalTool`
pub fn run_checked<R: CommandRunner + ?Sized>(runner: &R, command: &ExternalCommand) -> Result<()> {
    let code = runner.status(command)?;
    if code != 0 {
        return Err(EnvError::ExternalTool {
            program: command.program.clone(),
            args: command.args.join(" "),
            code,
        });
    }
    Ok(())
}

/// Spawns real processes
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn status(&self, command: &ExternalCommand) -> Result<i32> {
        info!(command = %command, "running");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).envs(&command.env);
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }
        if command.quiet {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let status = cmd.status().map_err(|e| {
            EnvError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to run {}: {}", command.program, e),
            ))
        })?;

        let code = status.code().unwrap_or(-1);
        debug!(program = %command.program, code, "finished");
        Ok(code)
    }
}

/// Logs commands and reports success without running anything
#[derive(Debug, Default)]
pub struct DryRunRunner {
    commands: Mutex<Vec<ExternalCommand>>,
}

impl DryRunRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands seen so far
    pub fn commands(&self) -> Vec<ExternalCommand> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl CommandRunner for DryRunRunner {
    fn status(&self, command: &ExternalCommand) -> Result<i32> {
        info!(command = %command, "dry run");
        if let Ok(mut seen) = self.commands.lock() {
            seen.push(command.clone());
        }
        Ok(0)
    }
}
