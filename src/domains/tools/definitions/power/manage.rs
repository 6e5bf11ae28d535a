use async_trait::async_trait;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::POWER_KIND;
use crate::core::services::{TaskInfo, TaskScheduler};
use crate::domains::tools::{
    ToolError, ToolHandler, describe, parse_params, require_non_empty, structured_result,
};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CancelPowerActionParams {
    /// Id returned by a delayed power action.
    #[serde(alias = "taskId")]
    pub task_id: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CancelPowerActionResult {
    pub task_id: String,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListPowerActionsParams {}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PendingPowerActions {
    pub count: usize,
    pub actions: Vec<TaskInfo>,
}

pub struct CancelPowerActionTool {
    scheduler: TaskScheduler,
}

impl CancelPowerActionTool {
    pub const NAME: &'static str = "cancel_power_action";

    pub const DESCRIPTION: &'static str =
        "Cancel a delayed power action by its task_id.";

    pub fn new(scheduler: TaskScheduler) -> Self {
        Self { scheduler }
    }
}

#[async_trait]
impl ToolHandler for CancelPowerActionTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<CancelPowerActionParams, CancelPowerActionResult>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let params: CancelPowerActionParams = parse_params(arguments)?;
        let id = require_non_empty("task_id", &params.task_id)?;

        let pending = self
            .scheduler
            .status(id)
            .is_some_and(|task| task.kind == POWER_KIND);
        if !pending || !self.scheduler.cancel(id) {
            return Err(ToolError::not_found(format!(
                "no pending power action with id '{}'",
                id
            )));
        }

        info!(task_id = %id, "Power action cancelled");
        structured_result(
            format!("Cancelled power action {}", id),
            &CancelPowerActionResult {
                task_id: id.to_string(),
                cancelled: true,
            },
        )
    }
}

pub struct ListPowerActionsTool {
    scheduler: TaskScheduler,
}

impl ListPowerActionsTool {
    pub const NAME: &'static str = "list_power_actions";

    pub const DESCRIPTION: &'static str = "List delayed power actions that have not fired yet.";

    pub fn new(scheduler: TaskScheduler) -> Self {
        Self { scheduler }
    }
}

#[async_trait]
impl ToolHandler for ListPowerActionsTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<ListPowerActionsParams, PendingPowerActions>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let _: ListPowerActionsParams = parse_params(arguments)?;
        let actions = self.scheduler.list(Some(POWER_KIND));

        let summary = if actions.is_empty() {
            "No pending power actions".to_string()
        } else {
            actions
                .iter()
                .map(|a| format!("{}: {} at {}", a.id, a.label, a.first_run_at))
                .collect::<Vec<_>>()
                .join("\n")
        };
        structured_result(
            summary,
            &PendingPowerActions {
                count: actions.len(),
                actions,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::services::Schedule;
    use crate::core::services::scheduler::action;
    use serde_json::json;
    use std::time::Duration;

    fn pending(scheduler: &TaskScheduler, kind: &str) -> String {
        scheduler.schedule(
            kind,
            "shutdown",
            Schedule::Once {
                delay: Duration::from_secs(3600),
            },
            action(|| async { Ok(()) }),
        )
    }

    #[tokio::test]
    async fn test_list_then_cancel() {
        let scheduler = TaskScheduler::new();
        let id = pending(&scheduler, POWER_KIND);
        pending(&scheduler, "notification");

        let list = ListPowerActionsTool::new(scheduler.clone())
            .call(JsonObject::new())
            .await
            .unwrap();
        let data = list.structured_content.unwrap();
        assert_eq!(data["count"], 1);
        assert_eq!(data["actions"][0]["id"], id.as_str());

        let cancel = CancelPowerActionTool::new(scheduler.clone());
        let args = json!({"task_id": id}).as_object().cloned().unwrap();
        let result = cancel.call(args.clone()).await.unwrap();
        assert_eq!(result.structured_content.unwrap()["cancelled"], true);
        assert_eq!(scheduler.len(), 1);

        let err = cancel.call(args).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cancel_ignores_other_kinds() {
        let scheduler = TaskScheduler::new();
        let id = pending(&scheduler, "notification");

        let err = CancelPowerActionTool::new(scheduler.clone())
            .call(json!({"taskId": id}).as_object().cloned().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
        assert!(scheduler.status(&id).is_some());
    }
}
