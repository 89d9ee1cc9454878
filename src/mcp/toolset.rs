// src/mcp/toolset.rs

//! Bridges third-party tool providers into native [`ToolDescriptor`]s.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::protocol::ContentItem;
use super::schema::ToolSchema;
use super::tool::{ToolDescriptor, ToolFailure, ToolHandler, ToolOutput, ToolResult};

/// A provider's own description of one of its tools.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// JSON Schema for the arguments, in whatever state the provider keeps it.
    #[serde(default, alias = "inputSchema")]
    pub parameters: Value,
}

#[async_trait]
pub trait Toolset: Send + Sync {
    /// Short name used in logs.
    fn provider(&self) -> &str;

    async fn list_descriptors(&self) -> Result<Vec<ExternalTool>>;

    async fn invoke(&self, name: &str, args: Value) -> Result<Value>;
}

/// Lists a toolset and maps every entry into a native descriptor.
///
/// A tool whose schema cannot be translated is still registered, with an
/// open schema.
pub async fn adapt_toolset(toolset: Arc<dyn Toolset>) -> Result<Vec<ToolDescriptor>> {
    let listed = toolset.list_descriptors().await?;
    info!(
        provider = toolset.provider(),
        count = listed.len(),
        "adapting external toolset"
    );

    Ok(listed
        .into_iter()
        .map(|tool| {
            let schema = ToolSchema::from_json_schema(&tool.parameters).unwrap_or_else(|e| {
                warn!(
                    provider = toolset.provider(),
                    tool = %tool.name,
                    error = %e,
                    "unusable tool schema; accepting any arguments"
                );
                ToolSchema::open()
            });
            let handler = Arc::new(ToolsetHandler {
                toolset: toolset.clone(),
                name: tool.name.clone(),
            });
            ToolDescriptor::new(
                &tool.name,
                tool.description.as_deref().unwrap_or_default(),
                schema,
                handler,
            )
        })
        .collect())
}

/// Delegates one call to the provider and reshapes its answer.
pub async fn invoke(toolset: &dyn Toolset, name: &str, args: Value) -> ToolResult {
    match toolset.invoke(name, args).await {
        Ok(value) => into_output(value),
        Err(e) => Err(ToolFailure::message(format!("{:#}", e)).with("tool", json!(name))),
    }
}

struct ToolsetHandler {
    toolset: Arc<dyn Toolset>,
    name: String,
}

#[async_trait]
impl ToolHandler for ToolsetHandler {
    async fn call(&self, args: Value) -> ToolResult {
        invoke(self.toolset.as_ref(), &self.name, args).await
    }
}

/// Providers that already speak the content envelope are passed through;
/// anything else is treated as a JSON payload.
fn into_output(value: Value) -> ToolResult {
    let items = value
        .get("content")
        .and_then(Value::as_array)
        .and_then(|items| {
            items
                .iter()
                .map(|item| item.get("text").and_then(Value::as_str).map(ContentItem::text))
                .collect::<Option<Vec<_>>>()
        });

    match items {
        Some(items) if value.get("isError").and_then(Value::as_bool) == Some(true) => {
            let text: Vec<String> = items.into_iter().map(|i| i.text).collect();
            Err(ToolFailure::error(text.join("\n")))
        }
        Some(items) => Ok(ToolOutput::Content(items)),
        None => Ok(ToolOutput::Json(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_content_envelopes_through() {
        let out = into_output(json!({
            "content": [{ "type": "markdown", "text": "# Somnia" }]
        }))
        .unwrap();
        assert_eq!(out, ToolOutput::Content(vec![ContentItem::text("# Somnia")]));
    }

    #[test]
    fn remote_error_flag_becomes_a_failure() {
        let err = into_output(json!({
            "content": [{ "type": "text", "text": "boom" }],
            "isError": true
        }))
        .unwrap_err();
        assert_eq!(err.text(), "boom");
    }

    #[test]
    fn plain_payloads_stay_json() {
        let payload = json!({ "balance": "1" });
        assert_eq!(into_output(payload.clone()).unwrap(), ToolOutput::Json(payload));
    }
}
