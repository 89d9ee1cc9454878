// src/mcp/dispatcher.rs

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::protocol::{CallToolResult, ContentItem};
use super::registry::ToolRegistry;
use super::schema::ValidationError;
use super::tool::{ToolFailure, ToolOutput};

/// Protocol-level failures. Business failures never show up here; they are
/// part of the returned envelope.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments for '{tool}': {source}")]
    Validation {
        tool: String,
        #[source]
        source: ValidationError,
    },
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn call(&self, name: &str, raw_args: Value) -> Result<CallToolResult, DispatchError> {
        let descriptor = self
            .registry
            .resolve(name)
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;

        let args = descriptor
            .schema
            .validate(&raw_args)
            .map_err(|source| DispatchError::Validation {
                tool: name.to_string(),
                source,
            })?;

        debug!(tool = %name, "invoking tool handler");
        let outcome = AssertUnwindSafe(descriptor.handler.call(args))
            .catch_unwind()
            .await;

        Ok(match outcome {
            Ok(Ok(output)) => normalize(output),
            Ok(Err(failure)) => {
                warn!(tool = %name, reason = %failure, "tool reported failure");
                failure_result(&failure)
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(tool = %name, %reason, "tool handler panicked");
                failure_result(
                    &ToolFailure::message(format!("Tool '{}' failed unexpectedly: {}", name, reason))
                        .with("error", Value::String("internal_error".into())),
                )
            }
        })
    }
}

/// Shapes a successful [`ToolOutput`] into the content envelope.
pub fn normalize(output: ToolOutput) -> CallToolResult {
    let content = match output {
        ToolOutput::Json(value) => vec![ContentItem::text(
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()),
        )],
        ToolOutput::Text(text) => vec![ContentItem::text(text)],
        ToolOutput::Content(items) => {
            let items: Vec<ContentItem> = items
                .into_iter()
                .map(|item| ContentItem::text(item.text))
                .collect();
            if items.is_empty() {
                vec![ContentItem::text("")]
            } else {
                items
            }
        }
    };
    CallToolResult {
        content,
        is_error: false,
    }
}

pub fn failure_result(failure: &ToolFailure) -> CallToolResult {
    let text = serde_json::to_string_pretty(failure).unwrap_or_else(|_| failure.text().to_string());
    CallToolResult {
        content: vec![ContentItem::text(text)],
        is_error: true,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
