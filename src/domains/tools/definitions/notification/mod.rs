//! Notification toolset.
//!
//! - `notifier`: platform notification commands, time parsing
//! - `send`: immediate, delayed and repeating notifications
//! - `manage`: stop, list and inspect scheduled notifications, one tool per
//!   operation plus a combined `notification_task_management`
//!
//! Delayed and repeating notifications are scheduler tasks of kind
//! `notification`; their task id is the notification id.

pub mod manage;
pub mod notifier;
pub mod send;

use std::sync::Arc;

pub use manage::{
    GetNotificationInfoTool, ListActiveNotificationsTool, NotificationTaskManagementTool,
    StopAllRepeatNotificationsTool, StopRepeatNotificationTool,
};
pub use notifier::{Notification, Notifier, TimeSpec};
pub use send::SendNotificationTool;

use crate::domains::tools::{ToolContext, ToolHandler};

/// Scheduler task kind for notifications.
pub const NOTIFICATION_KIND: &str = "notification";

pub fn handlers(ctx: &ToolContext) -> Vec<Arc<dyn ToolHandler>> {
    let scheduler = ctx.scheduler.clone();
    vec![
        Arc::new(SendNotificationTool::new(
            Notifier::new(ctx.runner.clone()),
            scheduler.clone(),
        )),
        Arc::new(StopRepeatNotificationTool::new(scheduler.clone())),
        Arc::new(StopAllRepeatNotificationsTool::new(scheduler.clone())),
        Arc::new(ListActiveNotificationsTool::new(scheduler.clone())),
        Arc::new(GetNotificationInfoTool::new(scheduler.clone())),
        Arc::new(NotificationTaskManagementTool::new(scheduler)),
    ]
}
