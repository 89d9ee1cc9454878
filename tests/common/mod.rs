// tests/common/mod.rs

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use somnia_mcp_server_rs::{
    config::Config,
    mcp::{
        registry::{CollisionPolicy, ToolRegistry},
        schema::{Field, ToolSchema},
        tool::{handler_fn, success, ToolDescriptor},
        tools::native_tools,
        wallet_storage::WalletStore,
    },
    AppState,
};

pub const AGENT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Config with no external credentials, storing wallets under `wallet_dir`.
pub fn test_config(wallet_dir: &Path) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("AGENT_SECRET_KEY", AGENT_KEY.to_string()),
        ("ENVIRONMENT", "TESTNET".to_string()),
        ("WALLET_DATA_DIR", wallet_dir.display().to_string()),
    ]);
    Config::from_lookup(|k| vars.get(k).cloned()).expect("Failed to build test config")
}

/// `echo {message}` tool that counts how often its handler ran.
pub fn counting_echo(calls: Arc<AtomicUsize>) -> ToolDescriptor {
    ToolDescriptor::new(
        "echo",
        "Echo a message back",
        ToolSchema::object().field(Field::string("message").min_len(1)),
        handler_fn(move |args: Value| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                success(json!({ "echo": args["message"] }))
            }
        }),
    )
}

/// Native tools plus `echo`, without the network-bound toolsets.
pub fn offline_state(wallet_dir: &Path, calls: Arc<AtomicUsize>) -> AppState {
    let config = test_config(wallet_dir);
    let store = Arc::new(WalletStore::new(config.wallet_data_dir.clone()));
    let mut registry = ToolRegistry::new(CollisionPolicy::Override);
    registry
        .register(native_tools(&config, store, reqwest::Client::new()))
        .expect("Failed to register native tools");
    registry
        .register([counting_echo(calls)])
        .expect("Failed to register echo");
    AppState::new(config, registry)
}

/// Parses the JSON text of the first content item.
pub fn first_text_json(result: &Value) -> Value {
    let text = result["content"][0]["text"]
        .as_str()
        .expect("Result has no text content");
    serde_json::from_str(text).expect("Content text is not JSON")
}
