//! Tool handler seam.
//!
//! Every tool is a struct implementing [`ToolHandler`]: it owns the
//! collaborators it needs (HTTP client, command runner, scheduler...), exposes
//! its descriptor and turns a JSON argument object into a result. Handlers
//! never build error envelopes themselves; they return [`ToolError`] and the
//! dispatcher does the conversion.

use rmcp::{
    handler::server::tool::schema_for_type,
    model::{CallToolResult, Content, JsonObject, Tool},
};
use schemars::JsonSchema;
use serde::{Serialize, de::DeserializeOwned};

use super::error::ToolError;

/// A named, schema-described operation.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    /// Unique tool name within a registry.
    fn name(&self) -> &'static str;

    /// Descriptor advertised in `tools/list`.
    fn tool(&self) -> Tool;

    /// Execute the tool. `arguments` is always a JSON object; its shape is
    /// checked by the handler before any I/O happens.
    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError>;
}

/// Build a descriptor from a params type and an output type.
pub fn describe<P, O>(name: &'static str, description: &'static str) -> Tool
where
    P: JsonSchema + 'static,
    O: JsonSchema + 'static,
{
    Tool {
        name: name.into(),
        description: Some(description.into()),
        input_schema: schema_for_type::<P>().into(),
        annotations: None,
        output_schema: Some(schema_for_type::<O>().into()),
        icons: None,
        meta: None,
        title: None,
    }
}

/// Decode the argument object into the tool's parameter struct.
///
/// Missing required fields and wrong types surface as invalid arguments.
pub fn parse_params<P: DeserializeOwned>(arguments: JsonObject) -> Result<P, ToolError> {
    serde_json::from_value(serde_json::Value::Object(arguments))
        .map_err(|e| ToolError::invalid_arguments(e.to_string()))
}

/// Reject empty or whitespace-only values for a required text field.
pub fn require_non_empty<'a>(field: &str, value: &'a str) -> Result<&'a str, ToolError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ToolError::invalid_arguments(format!(
            "'{}' must not be empty",
            field
        )));
    }
    Ok(trimmed)
}

/// Success envelope with a text summary and a structured payload.
pub fn structured_result<T: Serialize>(
    summary: impl Into<String>,
    data: &T,
) -> Result<CallToolResult, ToolError> {
    let value = serde_json::to_value(data)
        .map_err(|e| ToolError::internal(format!("failed to serialize result: {}", e)))?;

    Ok(CallToolResult {
        content: vec![Content::text(summary.into())],
        structured_content: Some(value),
        is_error: Some(false),
        meta: None,
    })
}
