use crate::engine::error::EngineError;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info};

/// A shell command line together with where and how to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub script: String,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl ShellCommand {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            working_dir: None,
            env: Vec::new(),
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Executes shell commands on behalf of the installer and the prediction step.
pub trait CommandRunner {
    /// Runs `command` to completion.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CommandSpawn`] if the command cannot be started and
    /// [`EngineError::CommandFailed`] if it exits unsuccessfully.
    fn run(&self, command: &ShellCommand) -> Result<(), EngineError>;
}

/// Runs commands through `<shell> -c`, inheriting stdio and blocking until exit.
#[derive(Debug, Clone)]
pub struct SystemShell {
    program: String,
}

impl SystemShell {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SystemShell {
    fn default() -> Self {
        Self::new("bash")
    }
}

impl CommandRunner for SystemShell {
    fn run(&self, command: &ShellCommand) -> Result<(), EngineError> {
        info!(shell = %self.program, "Running: {}", command.script);

        let mut process = Command::new(&self.program);
        process.arg("-c").arg(&command.script);
        if let Some(dir) = &command.working_dir {
            process.current_dir(dir);
        }
        process.envs(command.env.iter().map(|(k, v)| (k, v)));

        let status = process.status().map_err(|source| EngineError::CommandSpawn {
            command: command.script.clone(),
            source,
        })?;
        debug!(%status, "Command finished.");

        if status.success() {
            Ok(())
        } else {
            Err(EngineError::CommandFailed {
                command: command.script.clone(),
                code: status.code(),
            })
        }
    }
}

/// Quotes `arg` for a POSIX shell, leaving plain words untouched.
pub fn shell_quote(arg: &str) -> String {
    let is_plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | '=' | '@' | ','));
    if is_plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}
