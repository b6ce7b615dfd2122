//! Dispatch context: owns the registry and routes calls.
//!
//! `DispatchContext` is a cheap, cloneable handle (`Arc` inside). It is
//! transport-agnostic so it can be driven from:
//!
//! - A network server session
//! - The `callgate` CLI
//! - Tests
//!
//! # Example
//!
//! ```ignore
//! let context = DispatchContext::new();
//! context.register_service("math", MathService)?;
//!
//! let sum = context.dispatch_call("math.add", Some(json!({"a": 2, "b": 3})))?;
//! assert_eq!(sum, json!(5));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::args::CallArguments;
use crate::error::{DispatchError, RpcError};
use crate::path::MethodPath;
use crate::registry::{ServiceEntry, ServiceRegistry};
use crate::service::{CallFailure, Service};

const INVALID_PARAMETERS: &str = "invalid function parameters";

/// Process-wide collaborators keyed by type, e.g. `Arc<dyn TaskCatalog>`.
#[derive(Default)]
struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    fn insert<T: ?Sized + Send + Sync + 'static>(&mut self, value: Arc<T>) {
        self.map.insert(TypeId::of::<Arc<T>>(), Box::new(value));
    }

    fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.map
            .get(&TypeId::of::<Arc<T>>())
            .and_then(|boxed| boxed.downcast_ref::<Arc<T>>())
            .cloned()
    }
}

struct ContextInner {
    registry: ServiceRegistry,
    extensions: Extensions,
    started_at: DateTime<Utc>,
}

/// Builder for a [`DispatchContext`] carrying collaborators.
#[derive(Default)]
pub struct DispatchContextBuilder {
    extensions: Extensions,
}

impl DispatchContextBuilder {
    /// Make `value` reachable through [`DispatchContext::extension`].
    pub fn with_extension<T: ?Sized + Send + Sync + 'static>(mut self, value: Arc<T>) -> Self {
        self.extensions.insert(value);
        self
    }

    pub fn build(self) -> DispatchContext {
        DispatchContext {
            inner: Arc::new(ContextInner {
                registry: ServiceRegistry::new(),
                extensions: self.extensions,
                started_at: Utc::now(),
            }),
        }
    }
}

/// Registry plus routing entry point.
#[derive(Clone)]
pub struct DispatchContext {
    inner: Arc<ContextInner>,
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchContext")
            .field("services", &self.inner.registry.list_names())
            .field("started_at", &self.inner.started_at)
            .finish()
    }
}

impl DispatchContext {
    /// An empty context with no collaborators.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> DispatchContextBuilder {
        DispatchContextBuilder::default()
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.inner.registry
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// A collaborator installed through the builder.
    pub fn extension<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.inner.extensions.get::<T>()
    }

    /// A handle that does not keep the context alive. Services store this
    /// instead of a clone to avoid a reference cycle through the registry.
    pub fn downgrade(&self) -> WeakDispatchContext {
        WeakDispatchContext(Arc::downgrade(&self.inner))
    }

    /// Register `service` under `name`.
    ///
    /// The operation table is validated, then `initialize` runs once with this
    /// context, then the entry becomes visible. An existing entry of the same
    /// name is replaced.
    pub fn register_service<S: Service>(
        &self,
        name: impl Into<String>,
        service: S,
    ) -> Result<(), DispatchError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RpcError::invalid_argument("service name must not be empty").into());
        }

        let operations = S::operations();
        operations.validate()?;

        let mut service = service;
        service.initialize(self).map_err(DispatchError::Service)?;

        let entry = ServiceEntry::assemble(name.clone(), service, operations);
        if self.inner.registry.insert(entry).is_some() {
            tracing::debug!(service = %name, "Replaced registered service");
        } else {
            tracing::debug!(service = %name, "Registered service");
        }
        Ok(())
    }

    /// Remove a service. Unknown names are ignored.
    pub fn unregister_service(&self, name: &str) {
        if self.inner.registry.remove(name).is_some() {
            tracing::debug!(service = %name, "Unregistered service");
        }
    }

    /// Route `method` to a registered operation and invoke it.
    ///
    /// `args` may be a JSON object (bound by name), a JSON array (bound by
    /// position) or absent/`null` (no arguments). Routing and binding problems
    /// come back as [`DispatchError::Rpc`]; anything the operation body raises
    /// comes back untouched as [`DispatchError::Service`].
    pub fn dispatch_call(&self, method: &str, args: Option<Value>) -> Result<Value, DispatchError> {
        let args = args.unwrap_or(Value::Null);
        let path = MethodPath::parse(method);
        tracing::info!(service = path.service, method = method, "Call");

        let result = self.route(path, args);
        if let Err(DispatchError::Rpc(err)) = &result {
            tracing::warn!(method = method, code = err.code, "Call rejected: {}", err.message);
        }
        result
    }

    /// Like [`dispatch_call`](Self::dispatch_call) with already-shaped arguments.
    pub fn dispatch(&self, method: &str, args: CallArguments) -> Result<Value, DispatchError> {
        let value = match args {
            CallArguments::Keyword(map) => Value::Object(map),
            CallArguments::Positional(values) => Value::Array(values),
        };
        self.dispatch_call(method, Some(value))
    }

    fn route(&self, path: MethodPath<'_>, args: Value) -> Result<Value, DispatchError> {
        if path.service.is_empty() {
            return Err(RpcError::invalid_argument("invalid function path").into());
        }

        let entry = self.inner.registry.lookup(path.service)?;
        let operation = entry
            .resolve(path.operation)
            .ok_or_else(|| RpcError::not_found("method not found"))?;

        let args = CallArguments::try_from(args)?;
        let bound = args.bind(&operation.descriptor.params).map_err(|e| {
            tracing::debug!(operation = path.operation, "Binding failed: {}", e);
            RpcError::invalid_argument(INVALID_PARAMETERS)
        })?;

        match operation.invoke(bound) {
            Ok(value) => Ok(value),
            Err(CallFailure::Binding(e)) => {
                tracing::debug!(operation = path.operation, "Argument type mismatch: {}", e);
                Err(RpcError::invalid_argument(INVALID_PARAMETERS).into())
            }
            Err(CallFailure::Output(e)) => {
                Err(RpcError::io(format!("failed to serialize result: {}", e)).into())
            }
            Err(CallFailure::Service(e)) => Err(DispatchError::Service(e)),
        }
    }
}

/// Non-owning handle to a [`DispatchContext`].
#[derive(Clone)]
pub struct WeakDispatchContext(Weak<ContextInner>);

impl WeakDispatchContext {
    /// The context, if it is still alive.
    pub fn upgrade(&self) -> Option<DispatchContext> {
        self.0.upgrade().map(|inner| DispatchContext { inner })
    }
}

impl std::fmt::Debug for WeakDispatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WeakDispatchContext")
    }
}
