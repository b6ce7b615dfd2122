//! callgate core — transport-agnostic call routing.
//!
//! A caller hands the engine a method path (`"<service>.<operation>"`) and a
//! bundle of arguments; the engine finds the registered service, binds the
//! arguments against the operation's declared parameters and invokes it. It
//! has no transport or wire-format dependency, making it suitable for use in:
//!
//! - Network servers (one dispatch per request)
//! - CLI tools
//! - Test harnesses
//!
//! # Example
//!
//! ```ignore
//! use callgate_core::{DispatchConfig, DispatchContext};
//!
//! let context = DispatchContext::with_builtins(&DispatchConfig::default())?;
//! let names = context.dispatch_call("discovery.get_services", None)?;
//! ```

pub mod args;
pub mod config;
pub mod context;
pub mod error;
pub mod params;
pub mod path;
pub mod registry;
pub mod service;
pub mod services;

// Convenience re-exports
pub use args::{BindError, CallArguments};
pub use config::{ConfigError, DispatchConfig};
pub use context::{DispatchContext, DispatchContextBuilder, WeakDispatchContext};
pub use error::{BoxError, DispatchError, RpcError, EINVAL, ENOENT};
pub use params::Params;
pub use path::MethodPath;
pub use registry::{ServiceEntry, ServiceRegistry};
pub use service::{NoParams, OperationDescriptor, Operations, Param, Service, Visibility};
