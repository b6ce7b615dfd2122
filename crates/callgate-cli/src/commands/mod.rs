//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and goes through the
//! same `DispatchContext::dispatch_call` entry point a network transport would.

pub mod call;
pub mod discovery;

use callgate_core::{DispatchConfig, DispatchContext, DispatchError};

/// Build a `DispatchContext` with the built-in services enabled by the config
/// file at `config_path`, or all of them when no file is given.
pub fn init_context(config_path: Option<&str>) -> Result<DispatchContext, String> {
    let config = match config_path {
        Some(path) => DispatchConfig::from_file(path).map_err(|e| e.to_string())?,
        None => DispatchConfig::default(),
    };
    DispatchContext::with_builtins(&config)
        .map_err(|e| format!("Failed to register built-in services: {}", e))
}

/// Render a dispatch outcome as `{"result": ..}` or `{"error": {..}}`.
pub fn outcome_json(outcome: &Result<serde_json::Value, DispatchError>) -> serde_json::Value {
    match outcome {
        Ok(value) => serde_json::json!({ "result": value }),
        Err(err) => match err.as_rpc() {
            Some(rpc) => serde_json::json!({ "error": rpc.to_value() }),
            None => serde_json::json!({ "error": { "message": err.to_string() } }),
        },
    }
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

/// Print the outcome and turn a failure into the command's error.
fn report(outcome: Result<serde_json::Value, DispatchError>) -> Result<(), String> {
    print_json(&outcome_json(&outcome));
    outcome.map(|_| ()).map_err(|e| e.to_string())
}
