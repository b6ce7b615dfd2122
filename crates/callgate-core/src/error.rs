//! Error model shared across the dispatch boundary.
//!
//! `RpcError` is the structured `{code, message}` failure every caller sees
//! for routing and binding problems. `DispatchError` adds a second channel for
//! failures raised by service code itself, which the engine passes through
//! without reclassifying them.

use serde::{Deserialize, Serialize};

/// Boxed error raised by service code (initializers and operation bodies).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ---------------------------------------------------------------------------
// Platform errno codes used by the engine and the built-in services
// ---------------------------------------------------------------------------

pub const ENOENT: i32 = libc::ENOENT;
pub const EIO: i32 = libc::EIO;
pub const EINVAL: i32 = libc::EINVAL;
pub const ENOTSUP: i32 = libc::ENOTSUP;

/// Symbolic name of an errno code, e.g. `"ENOENT"` or `"EACCES"`.
///
/// Codes the platform does not know are shown as `errno <code>`.
#[cfg(unix)]
pub fn errno_name(code: i32) -> String {
    use nix::errno::Errno;

    // Linux aliases ENOTSUP to EOPNOTSUPP; keep the name callers expect.
    if code == ENOTSUP {
        return "ENOTSUP".to_string();
    }
    match Errno::from_raw(code) {
        Errno::UnknownErrno => format!("errno {}", code),
        errno => format!("{:?}", errno),
    }
}

#[cfg(not(unix))]
pub fn errno_name(code: i32) -> String {
    match code {
        ENOENT => "ENOENT".to_string(),
        EIO => "EIO".to_string(),
        EINVAL => "EINVAL".to_string(),
        ENOTSUP => "ENOTSUP".to_string(),
        _ => format!("errno {}", code),
    }
}

/// Structured failure with a POSIX-style numeric code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", errno_name(self.code), self.message)
    }
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Unknown service or operation (`ENOENT`).
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ENOENT, message)
    }

    /// Malformed path, bad argument container or binding mismatch (`EINVAL`).
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(EINVAL, message)
    }

    /// A collaborator the operation needs is not installed (`ENOTSUP`).
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(ENOTSUP, message)
    }

    /// The engine could not turn a result into a value (`EIO`).
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(EIO, message)
    }

    /// Serialize as `{"code": .., "message": ..}`.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({ "code": self.code, "message": self.message })
    }
}

/// Everything `dispatch_call` and service registration can fail with.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Routing or binding failure classified by the engine.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Failure raised by service code, returned untouched.
    #[error(transparent)]
    Service(BoxError),
}

impl DispatchError {
    /// The structured error carried by this failure, if any.
    ///
    /// Engine failures always have one. A service failure has one only when
    /// the service itself raised an `RpcError`.
    pub fn as_rpc(&self) -> Option<&RpcError> {
        match self {
            DispatchError::Rpc(err) => Some(err),
            DispatchError::Service(err) => err.downcast_ref::<RpcError>(),
        }
    }

    /// Numeric code for machine-readable reporting, if the failure has one.
    pub fn code(&self) -> Option<i32> {
        self.as_rpc().map(|err| err.code)
    }

    /// True when the failure came out of an operation body or initializer.
    pub fn is_service_error(&self) -> bool {
        matches!(self, DispatchError::Service(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_errno_name() {
        let err = RpcError::not_found("Method not found");
        assert_eq!(err.to_string(), "ENOENT: Method not found");
    }

    #[cfg(unix)]
    #[test]
    fn test_display_names_any_platform_errno() {
        assert_eq!(errno_name(libc::EACCES), "EACCES");
        assert_eq!(RpcError::new(libc::EACCES, "denied").to_string(), "EACCES: denied");
        assert_eq!(RpcError::new(libc::EPERM, "nope").to_string(), "EPERM: nope");
        assert_eq!(RpcError::not_supported("no loader").to_string(), "ENOTSUP: no loader");
        assert_eq!(RpcError::new(-7, "odd").to_string(), "errno -7: odd");
    }

    #[test]
    fn test_serializes_as_code_and_message() {
        let err = RpcError::invalid_argument("invalid function path");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value, serde_json::json!({"code": 22, "message": "invalid function path"}));
        assert_eq!(value, err.to_value());
    }

    #[test]
    fn test_as_rpc_recovers_service_raised_error() {
        let boxed: BoxError = Box::new(RpcError::not_found("Service not found"));
        let err = DispatchError::Service(boxed);
        assert!(err.is_service_error());
        assert_eq!(err.code(), Some(ENOENT));

        let opaque: BoxError = "disk on fire".into();
        let err = DispatchError::Service(opaque);
        assert_eq!(err.as_rpc(), None);
        assert_eq!(err.to_string(), "disk on fire");
    }
}
