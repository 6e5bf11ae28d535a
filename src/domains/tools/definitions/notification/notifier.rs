//! Platform notification commands and time parsing.

use std::sync::Arc;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::services::{CommandRunner, CommandSpec, MAX_DELAY, Platform};
use crate::domains::tools::ToolError;

/// A desktop notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub subtitle: Option<String>,
    pub sound: bool,
}

/// A duration given either as milliseconds or as text such as `"500"`,
/// `"10s"`, `"1.5m"` or `"1h"`.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TimeSpec {
    Millis(f64),
    Text(String),
}

impl TimeSpec {
    /// Parse into a duration. `field` names the argument in error messages.
    pub fn to_duration(&self, field: &str) -> Result<Duration, ToolError> {
        let millis = match self {
            TimeSpec::Millis(ms) => *ms,
            TimeSpec::Text(text) => parse_time_text(text).ok_or_else(|| {
                ToolError::invalid_arguments(format!(
                    "'{}': invalid time '{}', use milliseconds or strings like \"10s\", \"1m\", \"1h\"",
                    field, text
                ))
            })?,
        };
        if !millis.is_finite() || millis < 0.0 {
            return Err(ToolError::invalid_arguments(format!(
                "'{}' must not be negative",
                field
            )));
        }
        if millis > MAX_DELAY.as_millis() as f64 {
            return Err(ToolError::invalid_arguments(format!(
                "'{}' must be at most {} days",
                field,
                MAX_DELAY.as_secs() / 86_400
            )));
        }
        Ok(Duration::from_millis(millis.round() as u64))
    }
}

fn parse_time_text(text: &str) -> Option<f64> {
    let text = text.trim().to_ascii_lowercase();
    let (number, factor) = match text.chars().last()? {
        's' => (&text[..text.len() - 1], 1_000.0),
        'm' => (&text[..text.len() - 1], 60_000.0),
        'h' => (&text[..text.len() - 1], 3_600_000.0),
        _ => (text.as_str(), 1.0),
    };
    let number = number.trim();
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    number.parse::<f64>().ok().map(|n| n * factor)
}

fn applescript_quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn powershell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Build the command that shows `notification` on `platform`.
pub fn notification_command(platform: Platform, notification: &Notification) -> CommandSpec {
    match platform {
        Platform::MacOs => {
            let mut script = format!(
                "display notification {} with title {}",
                applescript_quote(&notification.message),
                applescript_quote(&notification.title)
            );
            if let Some(subtitle) = &notification.subtitle {
                script.push_str(&format!(" subtitle {}", applescript_quote(subtitle)));
            }
            if notification.sound {
                script.push_str(" sound name \"default\"");
            }
            CommandSpec::new("osascript", ["-e".to_string(), script])
        }
        Platform::Windows => {
            let mut script = format!(
                "Add-Type -AssemblyName System.Windows.Forms; \
                 $n = New-Object System.Windows.Forms.NotifyIcon; \
                 $n.Icon = [System.Drawing.SystemIcons]::Information; \
                 $n.BalloonTipTitle = {}; \
                 $n.BalloonTipText = {}; \
                 $n.Visible = $true; \
                 $n.ShowBalloonTip(5000);",
                powershell_quote(&notification.title),
                powershell_quote(&notification.message)
            );
            if notification.sound {
                script.push_str(" [System.Media.SystemSounds]::Asterisk.Play();");
            }
            script.push_str(" Start-Sleep -Seconds 1; $n.Dispose();");
            CommandSpec::new("powershell", ["-NoProfile".to_string(), "-Command".to_string(), script])
        }
        Platform::Linux => {
            // notify-send has no subtitle; it goes on the first body line.
            let body = match &notification.subtitle {
                Some(subtitle) => format!("{}\n{}", subtitle, notification.message),
                None => notification.message.clone(),
            };
            let mut args = vec![notification.title.clone(), body];
            if notification.sound {
                args.push("--hint=string:sound-name:message-new-instant".to_string());
            }
            CommandSpec::new("notify-send", args)
        }
    }
}

/// Shows notifications through a [`CommandRunner`].
#[derive(Clone)]
pub struct Notifier {
    runner: Arc<dyn CommandRunner>,
    platform: Platform,
}

impl Notifier {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            platform: Platform::current(),
        }
    }

    pub async fn send(&self, notification: &Notification) -> Result<(), ToolError> {
        let command = notification_command(self.platform, notification);
        debug!(title = %notification.title, "Showing notification");
        self.runner.run(&command).await?.check(&command)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Notification {
        Notification {
            title: "Stand up".to_string(),
            message: "Say \"hi\"".to_string(),
            subtitle: Some("Team".to_string()),
            sound: true,
        }
    }

    #[test]
    fn test_time_spec_parsing() {
        let ms = |spec: TimeSpec| spec.to_duration("delay").unwrap().as_millis();
        assert_eq!(ms(TimeSpec::Millis(1500.0)), 1500);
        assert_eq!(ms(TimeSpec::Text("250".into())), 250);
        assert_eq!(ms(TimeSpec::Text("10s".into())), 10_000);
        assert_eq!(ms(TimeSpec::Text(" 1.5M ".into())), 90_000);
        assert_eq!(ms(TimeSpec::Text("1h".into())), 3_600_000);
    }

    #[test]
    fn test_time_spec_rejects_garbage() {
        for text in ["", "soon", "10d", "-5s", "s"] {
            let err = TimeSpec::Text(text.into()).to_duration("repeat").unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments(_)), "{:?}", text);
        }
        assert!(TimeSpec::Millis(-1.0).to_duration("delay").is_err());
    }

    #[test]
    fn test_time_spec_upper_bound() {
        let thirty_days = TimeSpec::Text("720h".into()).to_duration("delay").unwrap();
        assert_eq!(thirty_days, MAX_DELAY);

        for spec in [TimeSpec::Millis(1e16), TimeSpec::Text("721h".into())] {
            let err = spec.to_duration("repeat").unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments(_)));
            assert!(err.to_string().contains("30 days"));
        }
    }

    #[test]
    fn test_time_spec_deserializes_both_shapes() {
        let n: TimeSpec = serde_json::from_value(serde_json::json!(5000)).unwrap();
        assert_eq!(n, TimeSpec::Millis(5000.0));
        let s: TimeSpec = serde_json::from_value(serde_json::json!("5s")).unwrap();
        assert_eq!(s, TimeSpec::Text("5s".into()));
    }

    #[test]
    fn test_linux_command() {
        let command = notification_command(Platform::Linux, &sample());
        assert_eq!(command.program, "notify-send");
        assert_eq!(command.args[0], "Stand up");
        assert_eq!(command.args[1], "Team\nSay \"hi\"");
        assert!(command.args[2].contains("sound-name"));
    }

    #[test]
    fn test_macos_command_escapes_quotes() {
        let command = notification_command(Platform::MacOs, &sample());
        assert_eq!(command.program, "osascript");
        let script = &command.args[1];
        assert!(script.contains("display notification \"Say \\\"hi\\\"\""));
        assert!(script.contains("subtitle \"Team\""));
        assert!(script.ends_with("sound name \"default\""));
    }

    #[test]
    fn test_windows_command_without_sound() {
        let mut notification = sample();
        notification.sound = false;
        let command = notification_command(Platform::Windows, &notification);
        assert_eq!(command.program, "powershell");
        let script = command.args.last().unwrap();
        assert!(script.contains("BalloonTipTitle = 'Stand up'"));
        assert!(!script.contains("SystemSounds"));
    }
}
