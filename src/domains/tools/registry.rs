//! Tool Registry - the per-server table of tool handlers.
//!
//! Each server instance owns exactly one registry. Registration order is
//! preserved so that `tools/list` is stable across calls.

use std::sync::{Arc, PoisonError, RwLock};

use rmcp::model::Tool;
use tracing::debug;

use super::{ToolError, ToolHandler};

/// Registry of handlers, keyed by unique tool name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<Vec<Arc<dyn ToolHandler>>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from a list of handlers.
    ///
    /// Fails if two handlers share a name.
    pub fn with_tools(
        tools: impl IntoIterator<Item = Arc<dyn ToolHandler>>,
    ) -> Result<Self, ToolError> {
        let registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Register a handler. Existing entries are never replaced.
    pub fn register(&self, tool: Arc<dyn ToolHandler>) -> Result<(), ToolError> {
        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        if tools.iter().any(|t| t.name() == tool.name()) {
            return Err(ToolError::invalid_arguments(format!(
                "tool '{}' is already registered",
                tool.name()
            )));
        }
        debug!(tool = tool.name(), "Registered tool");
        tools.push(tool);
        Ok(())
    }

    /// Look up a handler by exact name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|t| t.name() == name)
            .cloned()
    }

    /// All descriptors, in registration order.
    pub fn list(&self) -> Vec<Tool> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|t| t.tool())
            .collect()
    }

    /// Get all tool names.
    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|t| t.name())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::handlers::{describe, structured_result};
    use rmcp::model::{CallToolResult, JsonObject};
    use schemars::JsonSchema;
    use serde::Serialize;

    #[derive(Serialize, JsonSchema)]
    struct Empty {}

    struct Named(&'static str);

    #[async_trait::async_trait]
    impl ToolHandler for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn tool(&self) -> Tool {
            describe::<Empty, Empty>(self.0, "test tool")
        }

        async fn call(&self, _arguments: JsonObject) -> Result<CallToolResult, ToolError> {
            structured_result(self.0, &Empty {})
        }
    }

    fn named(names: &[&'static str]) -> Vec<Arc<dyn ToolHandler>> {
        names
            .iter()
            .map(|n| Arc::new(Named(n)) as Arc<dyn ToolHandler>)
            .collect()
    }

    #[test]
    fn test_registry_preserves_order() {
        let registry = ToolRegistry::with_tools(named(&["b", "a"])).unwrap();
        assert_eq!(registry.tool_names(), vec!["b", "a"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(Named("a"))).unwrap();
        assert!(registry.register(Arc::new(Named("a"))).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_get() {
        let registry = ToolRegistry::with_tools(named(&["a"])).unwrap();
        assert!(registry.get("a").is_some());
        assert!(registry.get("A").is_none());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_list_is_idempotent() {
        let registry = ToolRegistry::with_tools(named(&["x", "y"])).unwrap();
        let first: Vec<_> = registry.list().into_iter().map(|t| t.name).collect();
        let second: Vec<_> = registry.list().into_iter().map(|t| t.name).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_registry() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.list().is_empty());
    }
}
