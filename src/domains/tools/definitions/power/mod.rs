//! Power toolset: shutdown, restart, sleep, hibernate, screen lock, display
//! off and management of delayed actions.
//!
//! Delayed actions are scheduler tasks of kind `power`.

pub mod action;
pub mod manage;

use std::sync::Arc;

pub use action::{PowerAction, PowerActionTool};
pub use manage::{CancelPowerActionTool, ListPowerActionsTool};

use crate::domains::tools::{ToolContext, ToolHandler};

/// Scheduler task kind for delayed power actions.
pub const POWER_KIND: &str = "power";

pub fn handlers(ctx: &ToolContext) -> Vec<Arc<dyn ToolHandler>> {
    let action = |a: PowerAction| -> Arc<dyn ToolHandler> {
        Arc::new(PowerActionTool::new(a, ctx.runner.clone(), ctx.scheduler.clone()))
    };
    vec![
        action(PowerAction::Shutdown),
        action(PowerAction::Restart),
        action(PowerAction::Sleep),
        action(PowerAction::Hibernate),
        action(PowerAction::LockScreen),
        action(PowerAction::TurnOffDisplay),
        Arc::new(CancelPowerActionTool::new(ctx.scheduler.clone())),
        Arc::new(ListPowerActionsTool::new(ctx.scheduler.clone())),
    ]
}
