// src/mcp/handler.rs

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::mcp::{
    dispatcher::{failure_result, DispatchError},
    protocol::{
        error_codes, InitializeResult, ListToolsResult, Request, Response, ServerCapabilities,
        ServerInfo, ToolsCapability, JSONRPC_VERSION, PROTOCOL_VERSION, SERVER_NAME,
    },
    tool::ToolFailure,
};
use crate::AppState;

const INSTRUCTIONS: &str = "Somnia blockchain MCP server: agent wallet actions, balance and \
transaction queries, wallet storage, web search and Telegram notifications.";

/// Routes one already-parsed JSON value, rejecting anything that is not a
/// JSON-RPC request object.
pub async fn handle_value(message: Value, state: &AppState) -> Option<Response> {
    let id = message.get("id").cloned();
    match serde_json::from_value::<Request>(message) {
        Ok(req) => handle_mcp_request(req, state).await,
        Err(e) => Some(Response::error(
            id.unwrap_or(Value::Null),
            error_codes::INVALID_REQUEST,
            format!("Invalid Request: {}", e),
        )),
    }
}

/// Routes one JSON-RPC message. Notifications never produce a response.
pub async fn handle_mcp_request(req: Request, state: &AppState) -> Option<Response> {
    if req.is_notification() {
        debug!("Ignoring notification {}", req.method);
        return None;
    }
    info!("Handling MCP request for method: {}", req.method);

    let id = req.response_id();
    if req.jsonrpc != JSONRPC_VERSION {
        return Some(Response::error(
            id,
            error_codes::INVALID_REQUEST,
            format!("Unsupported jsonrpc version '{}'", req.jsonrpc),
        ));
    }
    let response = match req.method.as_str() {
        "initialize" => handle_initialize(id),
        "ping" => Response::success(id, json!({})),
        "tools/list" => handle_tools_list(id, state),
        "tools/call" => handle_tool_call(id, req.params, state).await,
        _ => Response::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    };
    Some(response)
}

fn handle_initialize(id: Value) -> Response {
    let result = InitializeResult {
        protocol_version: PROTOCOL_VERSION.to_string(),
        capabilities: ServerCapabilities {
            tools: ToolsCapability {},
        },
        server_info: ServerInfo {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        instructions: Some(INSTRUCTIONS.to_string()),
    };
    to_response(id, &result)
}

fn handle_tools_list(id: Value, state: &AppState) -> Response {
    let result = ListToolsResult {
        tools: state.dispatcher.registry().tool_infos(),
    };
    to_response(id, &result)
}

async fn handle_tool_call(id: Value, params: Option<Value>, state: &AppState) -> Response {
    let Some(params) = params else {
        return Response::error(
            id,
            error_codes::INVALID_PARAMS,
            "Missing params for tools/call".to_string(),
        );
    };
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return Response::error(
            id,
            error_codes::INVALID_PARAMS,
            "Missing or invalid required argument: 'name'".to_string(),
        );
    };
    let args = params.get("arguments").cloned().unwrap_or(Value::Null);

    match state.dispatcher.call(name, args).await {
        Ok(result) => to_response(id, &result),
        Err(DispatchError::UnknownTool(tool)) => {
            warn!("Call to unknown tool {}", tool);
            Response::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Unknown tool: {}", tool),
            )
        }
        Err(DispatchError::Validation { tool, source }) => {
            warn!(tool = %tool, error = %source, "rejected tool arguments");
            let mut failure = ToolFailure::message(format!("Invalid arguments for {}: {}", tool, source))
                .with("error", json!("validation_error"));
            if let Some(field) = source.field() {
                failure = failure.with("field", json!(field));
            }
            to_response(id, &failure_result(&failure))
        }
    }
}

fn to_response<T: serde::Serialize>(id: Value, result: &T) -> Response {
    match serde_json::to_value(result) {
        Ok(value) => Response::success(id, value),
        Err(e) => Response::error(
            id,
            error_codes::INTERNAL_ERROR,
            format!("Failed to serialize result: {}", e),
        ),
    }
}
