// src/mcp/docs_client.rs

//! Client for a remote MCP server reached over streamable HTTP, used for the
//! Somnia documentation tools hosted by GitBook.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::protocol::{JSONRPC_VERSION, PROTOCOL_VERSION, SERVER_NAME};
use super::toolset::{ExternalTool, Toolset};

const SESSION_HEADER: &str = "mcp-session-id";

#[derive(Deserialize)]
struct ListedTools {
    #[serde(default)]
    tools: Vec<ExternalTool>,
}

pub struct RemoteMcpToolset {
    http: Client,
    endpoint: String,
    next_id: AtomicU64,
    /// Session id handed out by the remote during `initialize`, if any.
    session: OnceCell<Option<String>>,
}

impl RemoteMcpToolset {
    pub fn new(http: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            next_id: AtomicU64::new(1),
            session: OnceCell::new(),
        }
    }

    /// `<docs_url>/~gitbook/mcp`
    pub fn for_docs(http: Client, docs_url: &str) -> Self {
        Self::new(http, format!("{}/~gitbook/mcp", docs_url.trim_end_matches('/')))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn session(&self) -> Result<Option<&str>> {
        let session = self
            .session
            .get_or_try_init(|| self.handshake())
            .await?;
        Ok(session.as_deref())
    }

    async fn handshake(&self) -> Result<Option<String>> {
        let init = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
        });
        let (session, _) = self.send("initialize", Some(init), None).await?;
        info!(endpoint = %self.endpoint, session = session.is_some(), "remote MCP session initialized");

        let note = json!({ "jsonrpc": JSONRPC_VERSION, "method": "notifications/initialized" });
        self.post(&note, session.as_deref())
            .await
            .context("notifications/initialized")?;
        Ok(session)
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let session = self.session().await?;
        let (_, result) = self.send(method, Some(params), session).await?;
        Ok(result)
    }

    /// One request/response exchange. Returns the session header and the `result`.
    async fn send(
        &self,
        method: &str,
        params: Option<Value>,
        session: Option<&str>,
    ) -> Result<(Option<String>, Value)> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut body = json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "method": method });
        if let Some(params) = params {
            body["params"] = params;
        }

        let response = self.post(&body, session).await?;
        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let is_sse = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let text = response.text().await?;
        let message = if is_sse {
            find_sse_response(&text, id)?
        } else {
            serde_json::from_str(&text).context("remote returned invalid JSON")?
        };
        debug!(method, "remote MCP response received");

        if let Some(err) = message.get("error") {
            let msg = err.get("message").and_then(Value::as_str).unwrap_or("unknown error");
            bail!("remote {} failed: {}", method, msg);
        }
        let result = message
            .get("result")
            .cloned()
            .ok_or_else(|| anyhow!("remote {} response has no result", method))?;
        Ok((session_id, result))
    }

    async fn post(&self, body: &Value, session: Option<&str>) -> Result<reqwest::Response> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);
        if let Some(session) = session {
            request = request.header(SESSION_HEADER, session);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            bail!("remote MCP server returned HTTP {}", response.status().as_u16());
        }
        Ok(response)
    }
}

/// Picks the JSON-RPC response with `id` out of an SSE body.
fn find_sse_response(body: &str, id: u64) -> Result<Value> {
    let mut data = String::new();
    let mut events = Vec::new();
    for line in body.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        } else if line.is_empty() && !data.is_empty() {
            events.push(std::mem::take(&mut data));
        }
    }
    if !data.is_empty() {
        events.push(data);
    }

    events
        .iter()
        .filter_map(|event| serde_json::from_str::<Value>(event).ok())
        .find(|message| message.get("id").and_then(Value::as_u64) == Some(id))
        .ok_or_else(|| anyhow!("no response with id {} in event stream", id))
}

#[async_trait]
impl Toolset for RemoteMcpToolset {
    fn provider(&self) -> &str {
        "somnia-docs"
    }

    async fn list_descriptors(&self) -> Result<Vec<ExternalTool>> {
        let result = self.call("tools/list", json!({})).await?;
        let listed: ListedTools = serde_json::from_value(result)?;
        Ok(listed.tools)
    }

    async fn invoke(&self, name: &str, args: Value) -> Result<Value> {
        self.call("tools/call", json!({ "name": name, "arguments": args }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docs_endpoint_is_derived_from_the_site_url() {
        let docs = RemoteMcpToolset::for_docs(Client::new(), "https://docs.somnia.network/");
        assert_eq!(docs.endpoint(), "https://docs.somnia.network/~gitbook/mcp");
    }

    #[test]
    fn extracts_the_matching_event() {
        let body = "event: message\n\
                    data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}\n\
                    \n\
                    event: message\n\
                    data: {\"jsonrpc\":\"2.0\",\"id\":7,\"result\":{\"tools\":[]}}\n\
                    \n";
        let message = find_sse_response(body, 7).unwrap();
        assert_eq!(message["result"]["tools"], json!([]));
    }

    #[test]
    fn multi_line_data_is_joined() {
        let body = "data: {\"jsonrpc\":\"2.0\",\ndata: \"id\":1,\"result\":{}}\n\n";
        assert!(find_sse_response(body, 1).is_ok());
    }

    #[test]
    fn missing_response_is_an_error() {
        assert!(find_sse_response("data: {}\n\n", 3).is_err());
    }

    #[tokio::test]
    async fn unreachable_remote_fails_discovery() {
        let docs = RemoteMcpToolset::new(Client::new(), "http://127.0.0.1:9/~gitbook/mcp");
        assert!(docs.list_descriptors().await.is_err());
    }
}
