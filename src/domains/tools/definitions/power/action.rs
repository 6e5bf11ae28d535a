//! Shutdown, restart, sleep, hibernate, screen lock and display off.
//!
//! A positive delay (seconds, fractions allowed) schedules the action as a
//! `power` task that can be cancelled until it fires; a zero delay runs the
//! command immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::POWER_KIND;
use crate::core::services::scheduler::action;
use crate::core::services::{
    CommandRunner, CommandSpec, MAX_DELAY, Platform, Schedule, TaskScheduler,
};
use crate::domains::tools::{ToolError, ToolHandler, describe, parse_params, structured_result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PowerAction {
    Shutdown,
    Restart,
    Sleep,
    Hibernate,
    LockScreen,
    TurnOffDisplay,
}

impl PowerAction {
    pub fn label(&self) -> &'static str {
        match self {
            PowerAction::Shutdown => "shutdown",
            PowerAction::Restart => "restart",
            PowerAction::Sleep => "sleep",
            PowerAction::Hibernate => "hibernate",
            PowerAction::LockScreen => "lock screen",
            PowerAction::TurnOffDisplay => "turn off display",
        }
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            PowerAction::Shutdown => "shutdown_system",
            PowerAction::Restart => "restart_system",
            PowerAction::Sleep => "sleep_system",
            PowerAction::Hibernate => "hibernate_system",
            PowerAction::LockScreen => "lock_screen",
            PowerAction::TurnOffDisplay => "turn_off_display",
        }
    }

    pub fn supports_force(&self) -> bool {
        matches!(self, PowerAction::Shutdown | PowerAction::Restart)
    }

    /// The command performing this action on `platform`.
    pub fn command(&self, platform: Platform, force: bool) -> CommandSpec {
        let force = force && self.supports_force();
        match (platform, self) {
            (Platform::Windows, PowerAction::Shutdown | PowerAction::Restart) => {
                let mut args = vec![if *self == PowerAction::Shutdown { "/s" } else { "/r" }];
                if force {
                    args.push("/f");
                }
                args.extend(["/t", "0"]);
                CommandSpec::new("shutdown", args)
            }
            (Platform::Windows, PowerAction::Sleep) => {
                CommandSpec::new("rundll32.exe", ["powrprof.dll,SetSuspendState", "0,1,0"])
            }
            (Platform::Windows, PowerAction::Hibernate) => CommandSpec::new("shutdown", ["/h"]),
            (Platform::Windows, PowerAction::LockScreen) => {
                CommandSpec::new("rundll32.exe", ["user32.dll,LockWorkStation"])
            }
            // WM_SYSCOMMAND / SC_MONITORPOWER broadcast, 2 = power off.
            (Platform::Windows, PowerAction::TurnOffDisplay) => CommandSpec::new(
                "powershell",
                [
                    "-NoProfile",
                    "-Command",
                    "Add-Type -TypeDefinition 'using System;using System.Runtime.InteropServices;public class Win32{[DllImport(\"user32.dll\")]public static extern int SendMessage(int hWnd, int hMsg, int wParam, int lParam);}'; [Win32]::SendMessage(-1, 0x0112, 0xF170, 2)",
                ],
            ),
            (Platform::MacOs, PowerAction::Shutdown) => {
                CommandSpec::new("osascript", ["-e", "tell app \"System Events\" to shut down"])
            }
            (Platform::MacOs, PowerAction::Restart) => {
                CommandSpec::new("osascript", ["-e", "tell app \"System Events\" to restart"])
            }
            (Platform::MacOs, PowerAction::Sleep) => CommandSpec::new("pmset", ["sleepnow"]),
            // Honours the configured hibernatemode.
            (Platform::MacOs, PowerAction::Hibernate) => {
                CommandSpec::new("osascript", ["-e", "tell application \"System Events\" to sleep"])
            }
            (Platform::MacOs, PowerAction::TurnOffDisplay) => {
                CommandSpec::new("pmset", ["displaysleepnow"])
            }
            (Platform::MacOs, PowerAction::LockScreen) => CommandSpec::new(
                "osascript",
                [
                    "-e",
                    "tell application \"System Events\" to keystroke \"q\" using {control down, command down}",
                ],
            ),
            (Platform::Linux, PowerAction::Shutdown | PowerAction::Restart) => {
                let verb = if *self == PowerAction::Shutdown {
                    "poweroff"
                } else {
                    "reboot"
                };
                let mut args = vec![verb];
                if force {
                    // Ignore inhibitors such as open sessions.
                    args.push("-i");
                }
                CommandSpec::new("systemctl", args)
            }
            (Platform::Linux, PowerAction::Sleep) => CommandSpec::new("systemctl", ["suspend"]),
            (Platform::Linux, PowerAction::Hibernate) => {
                CommandSpec::new("systemctl", ["hibernate"])
            }
            (Platform::Linux, PowerAction::TurnOffDisplay) => {
                CommandSpec::new("xset", ["dpms", "force", "off"])
            }
            (Platform::Linux, PowerAction::LockScreen) => {
                CommandSpec::new("loginctl", ["lock-session"])
            }
        }
    }
}

/// Parameters of the shutdown and restart tools.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct PowerParams {
    /// Seconds to wait before acting, fractions allowed (default: 0, act now).
    #[serde(default)]
    pub delay: f64,

    /// Skip confirmation and ignore applications blocking the action.
    #[serde(default)]
    pub force: bool,
}

/// Parameters of the tools without a force option.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct DelayOnlyParams {
    /// Seconds to wait before acting, fractions allowed (default: 0, act now).
    #[serde(default)]
    pub delay: f64,
}

/// Validate a delay in seconds.
fn delay_from_secs(secs: f64) -> Result<Duration, ToolError> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(ToolError::invalid_arguments(
            "'delay' must be a non-negative number of seconds",
        ));
    }
    if secs > MAX_DELAY.as_secs_f64() {
        return Err(ToolError::invalid_arguments(format!(
            "'delay' must be at most {} seconds ({} days)",
            MAX_DELAY.as_secs(),
            MAX_DELAY.as_secs() / 86_400
        )));
    }
    Ok(Duration::from_secs_f64(secs))
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PowerActionResult {
    pub action: PowerAction,
    /// `executed` or `scheduled`.
    pub status: String,
    /// Id for cancel_power_action when scheduled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub delay_secs: f64,
    pub command: String,
}

pub struct PowerActionTool {
    action: PowerAction,
    runner: Arc<dyn CommandRunner>,
    scheduler: TaskScheduler,
    platform: Platform,
}

impl PowerActionTool {
    pub fn new(action: PowerAction, runner: Arc<dyn CommandRunner>, scheduler: TaskScheduler) -> Self {
        Self {
            action,
            runner,
            scheduler,
            platform: Platform::current(),
        }
    }

    #[instrument(skip_all, fields(action = self.action.label(), delay = params.delay))]
    pub async fn execute(&self, params: PowerParams) -> Result<PowerActionResult, ToolError> {
        let delay = delay_from_secs(params.delay)?;
        let command = self.action.command(self.platform, params.force);

        if delay.is_zero() {
            info!("Running {} now", self.action.label());
            self.runner.run(&command).await?.check(&command)?;
            return Ok(PowerActionResult {
                action: self.action,
                status: "executed".to_string(),
                task_id: None,
                delay_secs: 0.0,
                command: command.display(),
            });
        }

        let runner = self.runner.clone();
        let scheduled = command.clone();
        let task_id = self.scheduler.schedule(
            POWER_KIND,
            self.action.label(),
            Schedule::Once { delay },
            action(move || {
                let runner = runner.clone();
                let command = scheduled.clone();
                async move {
                    let output = runner.run(&command).await?;
                    if let Err(e) = output.check(&command) {
                        warn!("Scheduled power action failed: {}", e);
                        return Err(e);
                    }
                    Ok(())
                }
            }),
        );

        Ok(PowerActionResult {
            action: self.action,
            status: "scheduled".to_string(),
            task_id: Some(task_id),
            delay_secs: params.delay,
            command: command.display(),
        })
    }
}

#[async_trait]
impl ToolHandler for PowerActionTool {
    fn name(&self) -> &'static str {
        self.action.tool_name()
    }

    fn tool(&self) -> Tool {
        match self.action {
            PowerAction::Shutdown => describe::<PowerParams, PowerActionResult>(
                self.name(),
                "Shut down the computer, immediately or after a delay in seconds. Delayed shutdowns return a task_id that cancel_power_action accepts.",
            ),
            PowerAction::Restart => describe::<PowerParams, PowerActionResult>(
                self.name(),
                "Restart the computer, immediately or after a delay in seconds. Delayed restarts return a task_id that cancel_power_action accepts.",
            ),
            PowerAction::Sleep => describe::<DelayOnlyParams, PowerActionResult>(
                self.name(),
                "Put the computer to sleep, immediately or after a delay in seconds.",
            ),
            PowerAction::Hibernate => describe::<DelayOnlyParams, PowerActionResult>(
                self.name(),
                "Hibernate the computer (save memory to disk and power off), immediately or after a delay in seconds.",
            ),
            PowerAction::LockScreen => describe::<DelayOnlyParams, PowerActionResult>(
                self.name(),
                "Lock the screen, immediately or after a delay in seconds.",
            ),
            PowerAction::TurnOffDisplay => describe::<DelayOnlyParams, PowerActionResult>(
                self.name(),
                "Turn off the display without sleeping, immediately or after a delay in seconds.",
            ),
        }
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let params: PowerParams = parse_params(arguments)?;
        let result = self.execute(params).await?;
        let summary = match &result.task_id {
            Some(id) => format!(
                "{} scheduled in {} s (task {})",
                self.action.label(),
                result.delay_secs,
                id
            ),
            None => format!("{} started", self.action.label()),
        };
        structured_result(summary, &result)
    }
}
