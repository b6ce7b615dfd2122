//! Integration tests for the callgate-cli commands.
//!
//! These tests exercise the same code paths as the binary against a context
//! built from the default (or a temporary) configuration.

use std::io::Write;

use callgate_cli::commands::{self, call};

#[test]
fn test_services_via_call() {
    let context = commands::init_context(None).expect("Failed to init context");
    let outcome = call::execute(&context, "discovery.get_services", "[]").unwrap();
    let json = commands::outcome_json(&outcome);

    let services = json.get("result").expect("Expected result field");
    assert_eq!(services, &serde_json::json!(["discovery", "server"]));
}

#[test]
fn test_methods_of_server() {
    let context = commands::init_context(None).unwrap();
    let outcome = call::execute(&context, "discovery.get_methods", r#"{"service": "server"}"#).unwrap();
    let json = commands::outcome_json(&outcome);
    assert_eq!(
        json["result"],
        serde_json::json!(["get_connected_clients", "reload_plugins", "restart", "shutdown", "status"])
    );
}

#[test]
fn test_engine_error_is_structured() {
    let context = commands::init_context(None).unwrap();

    let outcome = call::execute(&context, "nosuch.method", "{}").unwrap();
    let json = commands::outcome_json(&outcome);
    assert_eq!(json["error"]["code"], 2);

    let outcome = call::execute(&context, "nodot", "{}").unwrap();
    let json = commands::outcome_json(&outcome);
    assert_eq!(json["error"]["code"], 22);
    assert_eq!(json["error"]["message"], "invalid function path");

    let outcome = call::execute(&context, "server.status", "\"scalar\"").unwrap();
    let json = commands::outcome_json(&outcome);
    assert_eq!(json["error"]["code"], 22);
}

#[test]
fn test_invalid_json_args() {
    let context = commands::init_context(None).unwrap();
    let err = call::execute(&context, "server.status", "{not json").unwrap_err();
    assert!(err.starts_with("Invalid JSON args"));
}

#[test]
fn test_config_file_limits_builtins() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "builtins:\n  server: false").unwrap();
    let path = file.path().to_string_lossy().to_string();

    let context = commands::init_context(Some(&path)).unwrap();
    assert_eq!(context.registry().list_names(), vec!["discovery"]);

    let outcome = call::execute(&context, "server.status", "{}").unwrap();
    assert_eq!(commands::outcome_json(&outcome)["error"]["code"], 2);
}

#[test]
fn test_missing_config_file() {
    let err = commands::init_context(Some("/nonexistent/callgate.yaml")).unwrap_err();
    assert!(err.contains("/nonexistent/callgate.yaml"));
}
