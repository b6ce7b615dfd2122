//! `callgate call` — invoke any registered operation.

use callgate_core::{DispatchContext, DispatchError};

use super::report;

/// Parse `args_str` as JSON and dispatch `method` with it.
pub fn execute(
    context: &DispatchContext,
    method: &str,
    args_str: &str,
) -> Result<Result<serde_json::Value, DispatchError>, String> {
    let args: serde_json::Value =
        serde_json::from_str(args_str).map_err(|e| format!("Invalid JSON args: {}", e))?;
    Ok(context.dispatch_call(method, Some(args)))
}

pub fn call(context: &DispatchContext, method: &str, args_str: &str) -> Result<(), String> {
    report(execute(context, method, args_str)?)
}
