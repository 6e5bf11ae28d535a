//! Management of scheduled notification tasks.

use async_trait::async_trait;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::NOTIFICATION_KIND;
use crate::core::services::{TaskInfo, TaskScheduler};
use crate::domains::tools::{
    ToolError, ToolHandler, describe, parse_params, require_non_empty, structured_result,
};

// ============================================================================
// Shared types
// ============================================================================

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct NotificationIdParams {
    /// Id returned by send_notification.
    #[serde(alias = "notificationId", alias = "task_id")]
    pub notification_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct NoParams {}

/// A live notification task.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct NotificationTask {
    /// Always `active`; finished and cancelled tasks are not reported.
    pub status: String,
    #[serde(flatten)]
    pub task: TaskInfo,
}

impl From<TaskInfo> for NotificationTask {
    fn from(task: TaskInfo) -> Self {
        Self {
            status: "active".to_string(),
            task,
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct StopResult {
    pub notification_id: String,
    pub stopped: bool,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct StopAllResult {
    pub stopped: usize,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ActiveNotifications {
    pub count: usize,
    pub notifications: Vec<NotificationTask>,
}

impl StopResult {
    fn summary(&self) -> String {
        format!("Stopped notification {}", self.notification_id)
    }
}

impl StopAllResult {
    fn summary(&self) -> String {
        format!("Stopped {} notification(s)", self.stopped)
    }
}

impl ActiveNotifications {
    fn summary(&self) -> String {
        if self.notifications.is_empty() {
            return "No active notifications".to_string();
        }
        self.notifications
            .iter()
            .map(|n| {
                format!(
                    "{} ({}, {} run(s)): {}",
                    n.task.id, n.task.schedule, n.task.runs, n.task.label
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl NotificationTask {
    fn summary(&self) -> String {
        format!(
            "Notification {} is active ({} run(s) so far)",
            self.task.id, self.task.runs
        )
    }
}

/// Look up a live notification task or fail with not-found.
fn find(scheduler: &TaskScheduler, id: &str) -> Result<TaskInfo, ToolError> {
    scheduler
        .status(id)
        .filter(|task| task.kind == NOTIFICATION_KIND)
        .ok_or_else(|| ToolError::not_found(format!("no active notification with id '{}'", id)))
}

fn stop_one(scheduler: &TaskScheduler, id: &str) -> Result<StopResult, ToolError> {
    let id = require_non_empty("notification_id", id)?;
    find(scheduler, id)?;
    if !scheduler.cancel(id) {
        // Finished between lookup and cancel.
        return Err(ToolError::not_found(format!(
            "no active notification with id '{}'",
            id
        )));
    }
    info!(notification_id = %id, "Notification stopped");
    Ok(StopResult {
        notification_id: id.to_string(),
        stopped: true,
    })
}

fn stop_all(scheduler: &TaskScheduler) -> StopAllResult {
    let stopped = scheduler.cancel_all(Some(NOTIFICATION_KIND));
    info!(stopped, "All notifications stopped");
    StopAllResult { stopped }
}

fn active(scheduler: &TaskScheduler) -> ActiveNotifications {
    let notifications: Vec<NotificationTask> = scheduler
        .list(Some(NOTIFICATION_KIND))
        .into_iter()
        .map(NotificationTask::from)
        .collect();
    ActiveNotifications {
        count: notifications.len(),
        notifications,
    }
}

fn task_info(scheduler: &TaskScheduler, id: &str) -> Result<NotificationTask, ToolError> {
    let id = require_non_empty("notification_id", id)?;
    find(scheduler, id).map(NotificationTask::from)
}

// ============================================================================
// stop_repeat_notification
// ============================================================================

pub struct StopRepeatNotificationTool {
    scheduler: TaskScheduler,
}

impl StopRepeatNotificationTool {
    pub const NAME: &'static str = "stop_repeat_notification";

    pub const DESCRIPTION: &'static str =
        "Stop a delayed or repeating notification by its notification_id.";

    pub fn new(scheduler: TaskScheduler) -> Self {
        Self { scheduler }
    }
}

#[async_trait]
impl ToolHandler for StopRepeatNotificationTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<NotificationIdParams, StopResult>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let params: NotificationIdParams = parse_params(arguments)?;
        let result = stop_one(&self.scheduler, &params.notification_id)?;
        structured_result(result.summary(), &result)
    }
}

// ============================================================================
// stop_all_repeat_notifications
// ============================================================================

pub struct StopAllRepeatNotificationsTool {
    scheduler: TaskScheduler,
}

impl StopAllRepeatNotificationsTool {
    pub const NAME: &'static str = "stop_all_repeat_notifications";

    pub const DESCRIPTION: &'static str = "Stop every delayed or repeating notification.";

    pub fn new(scheduler: TaskScheduler) -> Self {
        Self { scheduler }
    }
}

#[async_trait]
impl ToolHandler for StopAllRepeatNotificationsTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<NoParams, StopAllResult>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let _: NoParams = parse_params(arguments)?;
        let result = stop_all(&self.scheduler);
        structured_result(result.summary(), &result)
    }
}

// ============================================================================
// list_active_notifications
// ============================================================================

pub struct ListActiveNotificationsTool {
    scheduler: TaskScheduler,
}

impl ListActiveNotificationsTool {
    pub const NAME: &'static str = "list_active_notifications";

    pub const DESCRIPTION: &'static str =
        "List delayed and repeating notifications that have not finished yet.";

    pub fn new(scheduler: TaskScheduler) -> Self {
        Self { scheduler }
    }
}

#[async_trait]
impl ToolHandler for ListActiveNotificationsTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<NoParams, ActiveNotifications>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let _: NoParams = parse_params(arguments)?;
        let result = active(&self.scheduler);
        structured_result(result.summary(), &result)
    }
}

// ============================================================================
// get_notification_info
// ============================================================================

pub struct GetNotificationInfoTool {
    scheduler: TaskScheduler,
}

impl GetNotificationInfoTool {
    pub const NAME: &'static str = "get_notification_info";

    pub const DESCRIPTION: &'static str =
        "Get the status of a delayed or repeating notification by its notification_id.";

    pub fn new(scheduler: TaskScheduler) -> Self {
        Self { scheduler }
    }
}

#[async_trait]
impl ToolHandler for GetNotificationInfoTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<NotificationIdParams, NotificationTask>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let params: NotificationIdParams = parse_params(arguments)?;
        let task = task_info(&self.scheduler, &params.notification_id)?;
        structured_result(task.summary(), &task)
    }
}

// ============================================================================
// notification_task_management
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ManagementAction {
    StopRepeatTask,
    StopAllRepeatTasks,
    GetActiveRepeatTasks,
    GetRepeatTaskInfo,
}

impl ManagementAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManagementAction::StopRepeatTask => "stop_repeat_task",
            ManagementAction::StopAllRepeatTasks => "stop_all_repeat_tasks",
            ManagementAction::GetActiveRepeatTasks => "get_active_repeat_tasks",
            ManagementAction::GetRepeatTaskInfo => "get_repeat_task_info",
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ManagementParams {
    pub action: ManagementAction,
    /// Notification id; required by stop_repeat_task and get_repeat_task_info.
    #[serde(alias = "taskId", alias = "notification_id", alias = "notificationId")]
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum ManagementOutcome {
    Stopped(StopResult),
    StoppedAll(StopAllResult),
    Active(ActiveNotifications),
    Task(NotificationTask),
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ManagementResult {
    pub action: ManagementAction,
    #[serde(flatten)]
    pub outcome: ManagementOutcome,
}

/// Single entry point for the four management operations above.
pub struct NotificationTaskManagementTool {
    scheduler: TaskScheduler,
}

impl NotificationTaskManagementTool {
    pub const NAME: &'static str = "notification_task_management";

    pub const DESCRIPTION: &'static str = "Manage scheduled notifications with one tool. action is one of stop_repeat_task, stop_all_repeat_tasks, get_active_repeat_tasks or get_repeat_task_info; the first and last need task_id.";

    pub fn new(scheduler: TaskScheduler) -> Self {
        Self { scheduler }
    }

    fn task_id(params: &ManagementParams) -> Result<&str, ToolError> {
        params.task_id.as_deref().ok_or_else(|| {
            ToolError::invalid_arguments(format!(
                "'task_id' is required for action '{}'",
                params.action.as_str()
            ))
        })
    }
}

#[async_trait]
impl ToolHandler for NotificationTaskManagementTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<ManagementParams, ManagementResult>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let params: ManagementParams = parse_params(arguments)?;
        let (summary, outcome) = match params.action {
            ManagementAction::StopRepeatTask => {
                let result = stop_one(&self.scheduler, Self::task_id(&params)?)?;
                (result.summary(), ManagementOutcome::Stopped(result))
            }
            ManagementAction::StopAllRepeatTasks => {
                let result = stop_all(&self.scheduler);
                (result.summary(), ManagementOutcome::StoppedAll(result))
            }
            ManagementAction::GetActiveRepeatTasks => {
                let result = active(&self.scheduler);
                (result.summary(), ManagementOutcome::Active(result))
            }
            ManagementAction::GetRepeatTaskInfo => {
                let result = task_info(&self.scheduler, Self::task_id(&params)?)?;
                (result.summary(), ManagementOutcome::Task(result))
            }
        };
        structured_result(
            summary,
            &ManagementResult {
                action: params.action,
                outcome,
            },
        )
    }
}
