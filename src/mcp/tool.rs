// src/mcp/tool.rs

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use super::protocol::{ContentItem, ToolInfo};
use super::schema::ToolSchema;

/// What a handler hands back on success.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Serialized into a single text item.
    Json(Value),
    Text(String),
    /// Already shaped as content items, passed through.
    Content(Vec<ContentItem>),
}

/// A business-level failure reported to the client as tool output.
///
/// Serializes to its body, e.g. `{"success": false, "message": "..."}` or
/// `{"error": "...", "suggestion": "..."}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolFailure {
    body: Map<String, Value>,
}

impl ToolFailure {
    /// `{success: false, message}`
    pub fn message(message: impl Into<String>) -> Self {
        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(false));
        body.insert("message".into(), Value::String(message.into()));
        Self { body }
    }

    /// `{error}`
    pub fn error(error: impl Into<String>) -> Self {
        let mut body = Map::new();
        body.insert("error".into(), Value::String(error.into()));
        Self { body }
    }

    pub fn suggestion(self, suggestion: impl Into<String>) -> Self {
        self.with("suggestion", Value::String(suggestion.into()))
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.body.insert(key.to_string(), value);
        self
    }

    /// The human-readable part of the failure.
    pub fn text(&self) -> &str {
        self.body
            .get("message")
            .or_else(|| self.body.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("tool call failed")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

impl Serialize for ToolFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}

pub type ToolResult = Result<ToolOutput, ToolFailure>;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Runs with arguments that already passed the tool's schema.
    async fn call(&self, args: Value) -> ToolResult;
}

/// Adapts an async closure into a [`ToolHandler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = ToolResult> + Send,
{
    async fn call(&self, args: Value) -> ToolResult {
        (self.0)(args).await
    }
}

pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// The registry's record for one tool. Immutable once built.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub title: String,
    pub description: String,
    pub schema: ToolSchema,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new(
        name: &str,
        description: &str,
        schema: ToolSchema,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.to_string(),
            title: name.to_string(),
            description: description.to_string(),
            schema,
            handler,
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            input_schema: self.schema.to_input_shape(),
        }
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Shorthand for the common `{success: true, ...}` payload.
pub fn success(mut payload: Value) -> ToolResult {
    if let Value::Object(map) = &mut payload {
        map.insert("success".into(), Value::Bool(true));
    } else {
        payload = json!({ "success": true, "data": payload });
    }
    Ok(ToolOutput::Json(payload))
}
