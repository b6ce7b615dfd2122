//! `callgate services` / `callgate methods` — introspection commands.

use callgate_core::DispatchContext;

use super::report;

pub fn services(context: &DispatchContext) -> Result<(), String> {
    report(context.dispatch_call("discovery.get_services", None))
}

pub fn methods(context: &DispatchContext, service: &str) -> Result<(), String> {
    report(context.dispatch_call(
        "discovery.get_methods",
        Some(serde_json::json!({ "service": service })),
    ))
}
