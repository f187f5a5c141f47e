//! External tool invocation
//!
//! Every tool runs with an explicit working directory; the process-wide
//! current directory is never changed. Each tool is started in its own process
//! group, and the whole group is killed when the invocation's future is
//! dropped, so an interrupted build leaves neither the tool nor anything it
//! spawned behind.

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::config::defaults;
use crate::error::PipelineError;

/// One external tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    cwd: PathBuf,
    env: Option<HashMap<String, String>>,
    shell: bool,
}

impl Invocation {
    /// Run `program` in `cwd` with the inherited environment
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: None,
            shell: false,
        }
    }

    /// Append an argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run with exactly this environment instead of the inherited one
    #[must_use]
    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Run through `/bin/sh -c`.
    ///
    /// The program is taken as shell text, so it may hold pipelines and
    /// redirections. Each argument is quoted and reaches the command as a
    /// single word.
    #[must_use]
    pub fn through_shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    /// Program name
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Working directory
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Whether the command line goes through a shell
    pub fn is_shell(&self) -> bool {
        self.shell
    }

    /// Command line for logs and errors; in shell mode, the script handed to
    /// the shell
    pub fn command_line(&self) -> String {
        let args = self.args.iter().map(|arg| {
            if self.shell {
                shell_quote(arg)
            } else {
                arg.clone()
            }
        });
        std::iter::once(self.program.clone())
            .chain(args)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion; a non-zero exit is an error.
    ///
    /// `component` and `stage` only label errors and logs.
    pub async fn run(&self, component: &str, stage: &str) -> Result<(), PipelineError> {
        let command_line = self.command_line();
        let mut command = if self.shell {
            let mut c = Command::new(defaults::SHELL);
            c.arg("-c").arg(&command_line);
            c
        } else {
            let mut c = Command::new(&self.program);
            c.args(&self.args);
            c
        };

        command
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .process_group(0)
            .kill_on_drop(true);
        if let Some(env) = &self.env {
            command.env_clear().envs(env);
        }

        tracing::debug!("Running '{command_line}' in {}", self.cwd.display());

        let spawn_failed = |e: std::io::Error| PipelineError::SpawnFailed {
            component: component.to_string(),
            stage: stage.to_string(),
            command: command_line.clone(),
            error: e.to_string(),
        };

        let mut child = command.spawn().map_err(spawn_failed)?;
        let group = ProcessGroup::of(child.id());
        let status = child.wait().await.map_err(spawn_failed)?;
        group.release();

        if !status.success() {
            return Err(PipelineError::ToolFailed {
                component: component.to_string(),
                stage: stage.to_string(),
                command: command_line,
                status: status.to_string(),
            });
        }

        Ok(())
    }
}

/// Kills a child's process group when dropped before the child exits
#[derive(Debug)]
struct ProcessGroup {
    leader: Option<Pid>,
}

impl ProcessGroup {
    fn of(pid: Option<u32>) -> Self {
        Self {
            leader: pid.and_then(|p| i32::try_from(p).ok()).map(Pid::from_raw),
        }
    }

    /// The child exited on its own
    fn release(mut self) {
        self.leader = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if let Some(leader) = self.leader {
            tracing::debug!("Killing process group {leader}");
            // ESRCH when the group is already gone
            let _ = killpg(leader, Signal::SIGKILL);
        }
    }
}

/// Quote `arg` as one shell word
pub fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Locate a required tool in `PATH`
pub fn require_tool(tool: &str) -> Result<PathBuf, PipelineError> {
    which::which(tool).map_err(|_| PipelineError::ToolNotFound {
        tool: tool.to_string(),
    })
}

/// Whether a tool is available in `PATH`
pub fn is_tool_available(tool: &str) -> bool {
    which::which(tool).is_ok()
}
