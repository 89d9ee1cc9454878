// src/api/mcp.rs

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response as HttpResponse},
    Json,
};
use futures::future::join_all;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::mcp::handler::handle_value;
use crate::mcp::protocol::{error_codes, Response, JSONRPC_VERSION};
use crate::AppState;

/// `POST /mcp`: one request object or a batch array. Every request is
/// handled independently; notifications contribute nothing to the reply.
pub async fn post_mcp_handler(State(state): State<AppState>, body: Bytes) -> HttpResponse {
    let message: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!("Rejecting malformed JSON body: {}", e);
            let error = Response::error(
                Value::Null,
                error_codes::PARSE_ERROR,
                format!("Parse error: {}", e),
            );
            return (StatusCode::BAD_REQUEST, Json(error)).into_response();
        }
    };

    match message {
        Value::Array(batch) if batch.is_empty() => {
            let error = Response::error(
                Value::Null,
                error_codes::INVALID_REQUEST,
                "Invalid Request: empty batch".to_string(),
            );
            (StatusCode::BAD_REQUEST, Json(error)).into_response()
        }
        Value::Array(batch) => {
            debug!("Handling batch of {} messages", batch.len());
            let responses: Vec<Response> = join_all(batch.into_iter().map(|m| handle_value(m, &state)))
                .await
                .into_iter()
                .flatten()
                .collect();
            if responses.is_empty() {
                StatusCode::ACCEPTED.into_response()
            } else {
                Json(responses).into_response()
            }
        }
        single => match handle_value(single, &state).await {
            Some(response) => Json(response).into_response(),
            None => StatusCode::ACCEPTED.into_response(),
        },
    }
}

/// `GET /mcp` and `DELETE /mcp`: sessions and server push are not offered.
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "jsonrpc": JSONRPC_VERSION,
            "error": { "code": error_codes::SERVER_ERROR, "message": "Method not allowed." },
            "id": null,
        })),
    )
}
