//! Dispatcher - routes a tool call to its handler.
//!
//! The dispatcher is the only place where a [`ToolError`] becomes an error
//! envelope, and it never lets a handler failure (including a panic) escape
//! to the transport.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use tracing::{error, info, instrument};

use super::{ToolError, ToolHandler, ToolRegistry};

/// Routes calls by name against one registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Descriptors of every registered tool.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.registry.list()
    }

    /// Dispatch a call whose arguments were already decoded as an object.
    ///
    /// Absent arguments are treated as an empty object so the handler's own
    /// validation reports which fields are missing.
    #[instrument(skip(self, arguments), fields(tool = %name))]
    pub async fn dispatch(&self, name: &str, arguments: Option<JsonObject>) -> CallToolResult {
        match self.resolve_and_call(name, arguments.unwrap_or_default()).await {
            Ok(result) => result,
            Err(e) => e.into_result(),
        }
    }

    /// Dispatch a call whose arguments are an arbitrary JSON value.
    ///
    /// Used by transports that decode raw JSON-RPC params; a non-object
    /// argument value is an invalid-params error.
    pub async fn dispatch_value(
        &self,
        name: &str,
        arguments: Option<serde_json::Value>,
    ) -> CallToolResult {
        match arguments {
            None | Some(serde_json::Value::Null) => self.dispatch(name, None).await,
            Some(serde_json::Value::Object(map)) => self.dispatch(name, Some(map)).await,
            Some(_) => match self.resolve(name) {
                Ok(_) => {
                    ToolError::invalid_arguments("arguments must be a JSON object").into_result()
                }
                Err(e) => e.into_result(),
            },
        }
    }

    /// Blank names are invalid params, unregistered ones are unknown tools.
    fn resolve(&self, name: &str) -> Result<Arc<dyn ToolHandler>, ToolError> {
        if name.trim().is_empty() {
            return Err(ToolError::invalid_arguments("tool name must not be empty"));
        }
        self.registry
            .get(name)
            .ok_or_else(|| ToolError::unknown_tool(name))
    }

    async fn resolve_and_call(
        &self,
        name: &str,
        arguments: JsonObject,
    ) -> Result<CallToolResult, ToolError> {
        let handler = self.resolve(name)?;

        info!("Calling tool");

        match AssertUnwindSafe(handler.call(arguments)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Tool panicked: {}", message);
                Err(ToolError::internal(format!(
                    "tool '{}' failed unexpectedly: {}",
                    name, message
                )))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
