//! Local command execution.
//!
//! Tools never spawn processes directly. They build a [`CommandSpec`] and hand
//! it to a [`CommandRunner`], which is either the real [`SystemCommandRunner`]
//! or a [`DryRunRunner`] that only records what would have run.

use std::process::Stdio;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domains::tools::ToolError;

const MAX_OUTPUT_CHARS: usize = 4_000;

/// A program plus its arguments. No shell is involved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Human-readable rendering for logs and messages.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Turn a non-zero exit into an upstream error quoting stderr.
    pub fn check(self, command: &CommandSpec) -> Result<Self, ToolError> {
        if self.success() {
            return Ok(self);
        }
        let detail = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        Err(ToolError::upstream(format!(
            "`{}` exited with code {}: {}",
            command.display(),
            self.exit_code,
            detail
        )))
    }
}

/// Executes commands on behalf of tools.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion.
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, ToolError>;

    /// Open a URL with the platform's default handler.
    async fn open_url(&self, url: &str) -> Result<(), ToolError> {
        let command = opener_command(url);
        self.run(&command).await?.check(&command)?;
        Ok(())
    }
}

/// Desktop platform family, used to pick OS-specific commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Linux,
}

impl Platform {
    /// The platform this binary was built for. Unknown unixes count as Linux.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }
}

/// The command that opens `url` in the default browser of this platform.
pub fn opener_command(url: &str) -> CommandSpec {
    opener_command_for(Platform::current(), url)
}

/// The command that opens `url` in the default browser of `platform`.
pub fn opener_command_for(platform: Platform, url: &str) -> CommandSpec {
    match platform {
        Platform::MacOs => CommandSpec::new("open", [url]),
        // Handed straight to the shell protocol handler; cmd would split on `&`.
        Platform::Windows => CommandSpec::new("rundll32", ["url.dll,FileProtocolHandler", url]),
        Platform::Linux => CommandSpec::new("xdg-open", [url]),
    }
}

/// Runs commands for real, with a timeout.
pub struct SystemCommandRunner {
    timeout: Duration,
}

impl SystemCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, ToolError> {
        debug!("Executing command: {}", command.display());

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::upstream(format!(
                    "command '{}' is not available on this system",
                    command.program
                )));
            }
            Ok(Err(e)) => {
                return Err(ToolError::upstream(format!(
                    "failed to run `{}`: {}",
                    command.display(),
                    e
                )));
            }
            Err(_) => {
                warn!(
                    "Command timed out after {}s: {}",
                    self.timeout.as_secs(),
                    command.display()
                );
                return Err(ToolError::timeout(format!(
                    "`{}` did not finish within {}s",
                    command.display(),
                    self.timeout.as_secs()
                )));
            }
        };

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: truncate_str(&String::from_utf8_lossy(&output.stdout), MAX_OUTPUT_CHARS),
            stderr: truncate_str(&String::from_utf8_lossy(&output.stderr), MAX_OUTPUT_CHARS),
        })
    }
}

/// Records commands instead of running them. Every command "succeeds".
///
/// Selected with `MCP_DRY_RUN=true`; also the runner used by tests.
#[derive(Default)]
pub struct DryRunRunner {
    commands: Mutex<Vec<CommandSpec>>,
}

impl DryRunRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands seen so far, oldest first.
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CommandRunner for DryRunRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, ToolError> {
        info!("[dry-run] {}", command.display());
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.clone());
        Ok(CommandOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}\n[... output truncated at {max_chars} chars]")
    }
}
