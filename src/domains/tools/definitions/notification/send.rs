//! Immediate, delayed and repeating notifications.

use std::time::Duration;

use async_trait::async_trait;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::NOTIFICATION_KIND;
use super::notifier::{Notification, Notifier, TimeSpec};
use crate::core::services::scheduler::action;
use crate::core::services::{Schedule, TaskScheduler};
use crate::domains::tools::{
    ToolError, ToolHandler, describe, parse_params, require_non_empty, structured_result,
};

fn default_sound() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SendNotificationParams {
    /// Notification title.
    pub title: String,

    /// Notification body.
    pub message: String,

    /// Optional subtitle.
    #[serde(default)]
    pub subtitle: Option<String>,

    /// Play the default notification sound (default: true).
    #[serde(default = "default_sound")]
    pub sound: bool,

    /// Wait before the first notification: milliseconds or "10s", "1m", "1h".
    #[serde(default)]
    pub delay: Option<TimeSpec>,

    /// Repeat interval: milliseconds or "10s", "1m", "1h".
    #[serde(default)]
    pub repeat: Option<TimeSpec>,

    /// Number of notifications when repeating; unlimited when omitted.
    #[serde(default, alias = "repeatCount")]
    pub repeat_count: Option<u32>,
}

/// How a notification request was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    Sent,
    Scheduled,
    Repeating,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SendNotificationResult {
    pub delivery: Delivery,
    /// Task id for delayed and repeating notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<String>,
    pub message: String,
}

pub struct SendNotificationTool {
    notifier: Notifier,
    scheduler: TaskScheduler,
}

impl SendNotificationTool {
    pub const NAME: &'static str = "send_notification";

    pub const DESCRIPTION: &'static str = "Send a desktop notification or reminder. With delay it is sent later; with repeat it is sent every interval (repeat_count times, or until stopped). Delayed and repeating notifications return a notification_id.";

    pub fn new(notifier: Notifier, scheduler: TaskScheduler) -> Self {
        Self {
            notifier,
            scheduler,
        }
    }

    #[instrument(skip_all, fields(title = %params.title))]
    pub async fn execute(
        &self,
        params: SendNotificationParams,
    ) -> Result<SendNotificationResult, ToolError> {
        let notification = Notification {
            title: require_non_empty("title", &params.title)?.to_string(),
            message: require_non_empty("message", &params.message)?.to_string(),
            subtitle: params
                .subtitle
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            sound: params.sound,
        };
        let delay = params
            .delay
            .as_ref()
            .map(|d| d.to_duration("delay"))
            .transpose()?;
        let repeat = params
            .repeat
            .as_ref()
            .map(|r| r.to_duration("repeat"))
            .transpose()?;

        if let Some(interval) = repeat {
            if interval.is_zero() {
                return Err(ToolError::invalid_arguments(
                    "'repeat' must be a positive interval",
                ));
            }
            if params.repeat_count == Some(0) {
                return Err(ToolError::invalid_arguments(
                    "'repeat_count' must be at least 1",
                ));
            }
            let id = self.schedule(
                &notification,
                Schedule::Repeating {
                    delay: delay.unwrap_or(Duration::ZERO),
                    interval,
                    max_runs: params.repeat_count,
                },
            );
            return Ok(SendNotificationResult {
                delivery: Delivery::Repeating,
                message: format!("Repeating notification created with id {}", id),
                notification_id: Some(id),
            });
        }

        if let Some(delay) = delay {
            if delay.is_zero() {
                return Err(ToolError::invalid_arguments("'delay' must be positive"));
            }
            let id = self.schedule(&notification, Schedule::Once { delay });
            return Ok(SendNotificationResult {
                delivery: Delivery::Scheduled,
                message: format!(
                    "Notification scheduled in {} ms with id {}",
                    delay.as_millis(),
                    id
                ),
                notification_id: Some(id),
            });
        }

        self.notifier.send(&notification).await?;
        info!("Notification sent");
        Ok(SendNotificationResult {
            delivery: Delivery::Sent,
            notification_id: None,
            message: "Notification sent".to_string(),
        })
    }

    fn schedule(&self, notification: &Notification, schedule: Schedule) -> String {
        let notifier = self.notifier.clone();
        let payload = notification.clone();
        self.scheduler.schedule(
            NOTIFICATION_KIND,
            notification.title.clone(),
            schedule,
            action(move || {
                let notifier = notifier.clone();
                let payload = payload.clone();
                async move { notifier.send(&payload).await }
            }),
        )
    }
}

#[async_trait]
impl ToolHandler for SendNotificationTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<SendNotificationParams, SendNotificationResult>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let params: SendNotificationParams = parse_params(arguments)?;
        let result = self.execute(params).await?;
        structured_result(result.message.clone(), &result)
    }
}
