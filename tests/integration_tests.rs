// tests/integration_tests.rs

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use somnia_mcp_server_rs::mcp::{
    build_registry,
    dispatcher::{DispatchError, Dispatcher},
    handler::{handle_mcp_request, handle_value},
    protocol::{error_codes, Request},
    registry::{CollisionPolicy, ToolRegistry},
    schema::ToolSchema,
    tool::{handler_fn, ToolDescriptor},
    toolset::{adapt_toolset, ExternalTool, Toolset},
};
use tempfile::tempdir;

use common::{counting_echo, first_text_json, offline_state, test_config};

fn request(id: i64, method: &str, params: Value) -> Request {
    serde_json::from_value(json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }))
        .expect("Failed to build request")
}

/// Provider whose second tool carries a schema nothing can translate.
struct BrokenSchemaToolset {
    calls: AtomicUsize,
}

#[async_trait]
impl Toolset for BrokenSchemaToolset {
    fn provider(&self) -> &str {
        "broken"
    }

    async fn list_descriptors(&self) -> Result<Vec<ExternalTool>> {
        Ok(serde_json::from_value(json!([
            { "name": "well_formed", "parameters": { "type": "object", "properties": { "q": { "type": "string" } }, "required": ["q"] } },
            { "name": "odd_schema", "description": "Schema is a string", "inputSchema": "not a schema" }
        ]))?)
    }

    async fn invoke(&self, name: &str, args: Value) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "tool": name, "received": args }))
    }
}

#[tokio::test]
async fn test_unknown_tool_never_reaches_a_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ToolRegistry::default();
    registry.register([counting_echo(calls.clone())]).unwrap();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let err = dispatcher.call("ech0", json!({ "message": "hi" })).await.unwrap_err();
    assert!(matches!(err, DispatchError::UnknownTool(name) if name == "ech0"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_required_field_has_no_side_effects() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ToolRegistry::default();
    registry.register([counting_echo(calls.clone())]).unwrap();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let err = dispatcher.call("echo", json!({})).await.unwrap_err();
    match err {
        DispatchError::Validation { tool, source } => {
            assert_eq!(tool, "echo");
            assert_eq!(source.field(), Some("message"));
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let ok = dispatcher.call("echo", json!({ "message": "hi" })).await.unwrap();
    assert!(!ok.is_error);
    assert_eq!(ok.content[0].kind, "text");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_untranslatable_external_schema_still_registers_and_accepts_anything() {
    let toolset = Arc::new(BrokenSchemaToolset {
        calls: AtomicUsize::new(0),
    });
    let mut registry = ToolRegistry::default();
    registry.register(adapt_toolset(toolset.clone()).await.unwrap()).unwrap();

    let infos = registry.tool_infos();
    let names: Vec<&str> = infos.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["well_formed", "odd_schema"]);
    assert_eq!(infos[1].input_schema, json!({ "type": "object", "properties": {} }));
    assert_eq!(registry.resolve("odd_schema").unwrap().schema, ToolSchema::Open);

    let dispatcher = Dispatcher::new(Arc::new(registry));
    let result = dispatcher
        .call("odd_schema", json!({ "anything": [1, 2, 3], "nested": { "ok": true } }))
        .await
        .unwrap();
    assert!(!result.is_error);
    let payload = first_text_json(&serde_json::to_value(&result).unwrap());
    assert_eq!(payload["received"]["nested"]["ok"], true);
    assert_eq!(toolset.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_panicking_handler_becomes_an_error_result() {
    let mut registry = ToolRegistry::default();
    registry
        .register([ToolDescriptor::new(
            "explode",
            "Always panics",
            ToolSchema::open(),
            handler_fn(|_| async { panic!("kaboom") }),
        )])
        .unwrap();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let result = dispatcher.call("explode", json!({})).await.unwrap();
    assert!(result.is_error);
    assert!(result.content[0].text.contains("kaboom"));
}

#[tokio::test]
async fn test_reject_policy_leaves_registry_untouched() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ToolRegistry::new(CollisionPolicy::Reject);
    registry.register([counting_echo(calls.clone())]).unwrap();
    assert!(registry.register([counting_echo(calls)]).is_err());
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_tools_list_is_stable_across_calls() {
    let dir = tempdir().expect("Failed to create temp dir");
    let state = offline_state(dir.path(), Arc::new(AtomicUsize::new(0)));

    let first = handle_mcp_request(request(1, "tools/list", json!({})), &state).await.unwrap();
    let second = handle_mcp_request(request(1, "tools/list", json!({})), &state).await.unwrap();
    assert_eq!(first, second);

    let tools = first.result.unwrap()["tools"].as_array().unwrap().clone();
    let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
    assert_eq!(
        names,
        [
            "brave_search",
            "brave_news_search",
            "save_wallet",
            "list_wallets",
            "get_wallet",
            "send_telegram_message",
            "echo"
        ]
    );
    for tool in &tools {
        assert_eq!(tool["inputSchema"]["type"], "object");
    }
}

#[tokio::test]
async fn test_production_registry_lists_chain_tools_before_native_tools() {
    let dir = tempdir().expect("Failed to create temp dir");
    let config = test_config(dir.path());
    assert!(!config.docs_mcp_enabled);

    let registry = build_registry(&config, reqwest::Client::new())
        .await
        .expect("Failed to build registry");
    let names: Vec<String> = registry.list_all().iter().map(|t| t.name.clone()).collect();
    assert_eq!(
        names,
        [
            "get_address",
            "get_chain_info",
            "get_balance",
            "get_transaction",
            "send_native",
            "sign_message",
            "create_wallet",
            "brave_search",
            "brave_news_search",
            "save_wallet",
            "list_wallets",
            "get_wallet",
            "send_telegram_message",
        ]
    );
}

#[tokio::test]
async fn test_initialize_and_ping() {
    let dir = tempdir().expect("Failed to create temp dir");
    let state = offline_state(dir.path(), Arc::new(AtomicUsize::new(0)));

    let init = handle_mcp_request(request(1, "initialize", json!({})), &state).await.unwrap();
    let result = init.result.unwrap();
    assert_eq!(result["protocolVersion"], "2025-06-18");
    assert_eq!(result["serverInfo"]["name"], "somnia-mcp-server");

    let pong = handle_mcp_request(request(2, "ping", json!({})), &state).await.unwrap();
    assert_eq!(pong.result, Some(json!({})));
}

#[tokio::test]
async fn test_protocol_errors_map_to_json_rpc_codes() {
    let dir = tempdir().expect("Failed to create temp dir");
    let state = offline_state(dir.path(), Arc::new(AtomicUsize::new(0)));

    let unknown_method = handle_mcp_request(request(1, "resources/list", json!({})), &state)
        .await
        .unwrap();
    assert_eq!(unknown_method.error.unwrap().code, error_codes::METHOD_NOT_FOUND);

    let unknown_tool = handle_mcp_request(
        request(2, "tools/call", json!({ "name": "nope", "arguments": {} })),
        &state,
    )
    .await
    .unwrap();
    assert_eq!(unknown_tool.error.unwrap().code, error_codes::METHOD_NOT_FOUND);

    let missing_name = handle_mcp_request(request(3, "tools/call", json!({})), &state)
        .await
        .unwrap();
    assert_eq!(missing_name.error.unwrap().code, error_codes::INVALID_PARAMS);

    let not_a_request = handle_value(json!({ "id": 4, "foo": "bar" }), &state).await.unwrap();
    assert_eq!(not_a_request.id, json!(4));
    assert_eq!(not_a_request.error.unwrap().code, error_codes::INVALID_REQUEST);
}

#[tokio::test]
async fn test_validation_failures_are_tool_results() {
    let dir = tempdir().expect("Failed to create temp dir");
    let calls = Arc::new(AtomicUsize::new(0));
    let state = offline_state(dir.path(), calls.clone());

    let response = handle_mcp_request(
        request(1, "tools/call", json!({ "name": "echo", "arguments": { "message": 42 } })),
        &state,
    )
    .await
    .unwrap();
    let result = response.result.expect("validation failures are results");
    assert_eq!(result["isError"], true);
    let failure = first_text_json(&result);
    assert_eq!(failure["success"], false);
    assert_eq!(failure["error"], "validation_error");
    assert_eq!(failure["field"], "message");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_notifications_get_no_response() {
    let dir = tempdir().expect("Failed to create temp dir");
    let state = offline_state(dir.path(), Arc::new(AtomicUsize::new(0)));
    let note = handle_value(
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
        &state,
    )
    .await;
    assert!(note.is_none());
}

#[tokio::test]
async fn test_null_id_is_a_request_not_a_notification() {
    let dir = tempdir().expect("Failed to create temp dir");
    let state = offline_state(dir.path(), Arc::new(AtomicUsize::new(0)));
    let reply = handle_value(
        json!({ "jsonrpc": "2.0", "id": null, "method": "ping" }),
        &state,
    )
    .await
    .expect("A request with a null id must be answered");
    assert_eq!(reply.id, Value::Null);
    assert_eq!(reply.result, Some(json!({})));
}

#[tokio::test]
async fn test_search_without_key_reports_configuration_error() {
    let dir = tempdir().expect("Failed to create temp dir");
    let state = offline_state(dir.path(), Arc::new(AtomicUsize::new(0)));

    let result = state
        .dispatcher
        .call("brave_search", json!({ "query": "somnia" }))
        .await
        .unwrap();
    assert!(result.is_error);
    let failure = first_text_json(&serde_json::to_value(&result).unwrap());
    assert!(failure["error"].as_str().unwrap().contains("not configured"));
    assert!(failure["suggestion"].as_str().unwrap().contains("api-dashboard.search.brave.com"));
}
