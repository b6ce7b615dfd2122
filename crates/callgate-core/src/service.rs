//! Capability contract every dispatchable service implements.
//!
//! A service declares its operations once, per type, through [`Operations`]:
//! each entry carries a name, a visibility and a handler that receives a typed
//! params struct whose [`Params::SCHEMA`] gives the ordered parameter list. The
//! engine never inspects method names at call time; visibility, reserved names
//! and each schema against its params type are validated when the service is
//! registered.
//!
//! ```ignore
//! struct MathService;
//!
//! #[derive(Deserialize)]
//! struct AddParams { a: i64, b: i64 }
//!
//! impl Params for AddParams {
//!     const SCHEMA: &'static [Param] = &[Param::required("a"), Param::required("b")];
//! }
//!
//! impl MathService {
//!     fn add(&self, p: AddParams) -> Result<i64, RpcError> {
//!         Ok(p.a + p.b)
//!     }
//! }
//!
//! impl Service for MathService {
//!     fn operations() -> Operations<Self> {
//!         Operations::new().public("add", Self::add)
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::DispatchContext;
use crate::error::{BoxError, RpcError};
use crate::params::{check_schema, Params};

/// Names that belong to the contract itself and can never be operations.
pub const RESERVED_NAMES: &[&str] = &["initialize", "enumerate_methods"];

/// Prefix conventionally used for private members.
const PRIVATE_PREFIX: char = '_';

/// A service that can be registered in a [`DispatchContext`].
pub trait Service: Send + Sync + 'static {
    /// Lifecycle hook, run exactly once at registration before the service is
    /// reachable by any call. Services that need the registry or a
    /// process-wide collaborator grab it here.
    fn initialize(&mut self, context: &DispatchContext) -> Result<(), BoxError> {
        let _ = context;
        Ok(())
    }

    /// Declares every operation of this service type.
    fn operations() -> Operations<Self>
    where
        Self: Sized;
}

/// Whether an operation can be reached through dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Internal,
}

/// One declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: &'static str,
    pub required: bool,
}

impl Param {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
        }
    }
}

/// Name, parameter schema and visibility of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationDescriptor {
    pub name: &'static str,
    pub params: Vec<Param>,
    pub visibility: Visibility,
}

impl OperationDescriptor {
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    /// Number of leading parameters a positional call must supply.
    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|p| p.required).count()
    }

    /// Registration-time checks on a single descriptor.
    pub(crate) fn validate(&self) -> Result<(), RpcError> {
        if self.name.is_empty() {
            return Err(RpcError::invalid_argument("operation name must not be empty"));
        }
        if self.is_public() {
            if RESERVED_NAMES.contains(&self.name) {
                return Err(RpcError::invalid_argument(format!(
                    "operation name {} is reserved",
                    self.name
                )));
            }
            if self.name.starts_with(PRIVATE_PREFIX) {
                return Err(RpcError::invalid_argument(format!(
                    "public operation {} uses the private prefix",
                    self.name
                )));
            }
        }

        // Positional binding fills parameters in order, so optional ones must
        // come last and names must be distinct.
        let mut seen_optional = false;
        for (i, param) in self.params.iter().enumerate() {
            if param.required && seen_optional {
                return Err(RpcError::invalid_argument(format!(
                    "operation {}: required parameter {} follows an optional one",
                    self.name, param.name
                )));
            }
            seen_optional |= !param.required;
            if self.params[..i].iter().any(|p| p.name == param.name) {
                return Err(RpcError::invalid_argument(format!(
                    "operation {}: duplicate parameter {}",
                    self.name, param.name
                )));
            }
        }
        Ok(())
    }
}

/// Params type for operations that take no arguments.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct NoParams {}

impl Params for NoParams {
    const SCHEMA: &'static [Param] = &[];
}

/// Why a handler did not produce a value.
#[derive(Debug)]
pub(crate) enum CallFailure {
    /// Bound arguments did not deserialize into the params type.
    Binding(serde_json::Error),
    /// The returned value could not be turned into a `Value`.
    Output(serde_json::Error),
    /// Raised by the operation body.
    Service(BoxError),
}

pub(crate) type ErasedHandler<S> =
    Box<dyn Fn(&S, Map<String, Value>) -> Result<Value, CallFailure> + Send + Sync>;

type SchemaCheck = fn(&'static str) -> Result<(), RpcError>;

struct Declared<S> {
    descriptor: OperationDescriptor,
    handler: ErasedHandler<S>,
    check: SchemaCheck,
}

/// Declared operation table of a service type.
pub struct Operations<S> {
    entries: Vec<Declared<S>>,
}

impl<S: 'static> Default for Operations<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: 'static> Operations<S> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Declare an operation reachable through dispatch. Its parameter schema
    /// is `P::SCHEMA`.
    pub fn public<P, R, E, F>(self, name: &'static str, handler: F) -> Self
    where
        P: Params + 'static,
        R: Serialize + 'static,
        E: Into<BoxError> + 'static,
        F: Fn(&S, P) -> Result<R, E> + Send + Sync + 'static,
    {
        self.declare(name, Visibility::Public, handler)
    }

    /// Declare an operation that is never listed nor dispatched.
    pub fn internal<P, R, E, F>(self, name: &'static str, handler: F) -> Self
    where
        P: Params + 'static,
        R: Serialize + 'static,
        E: Into<BoxError> + 'static,
        F: Fn(&S, P) -> Result<R, E> + Send + Sync + 'static,
    {
        self.declare(name, Visibility::Internal, handler)
    }

    fn declare<P, R, E, F>(mut self, name: &'static str, visibility: Visibility, handler: F) -> Self
    where
        P: Params + 'static,
        R: Serialize + 'static,
        E: Into<BoxError> + 'static,
        F: Fn(&S, P) -> Result<R, E> + Send + Sync + 'static,
    {
        let descriptor = OperationDescriptor {
            name,
            params: P::SCHEMA.to_vec(),
            visibility,
        };
        let erased: ErasedHandler<S> = Box::new(move |service: &S, args: Map<String, Value>| {
            let params: P =
                serde_json::from_value(Value::Object(args)).map_err(CallFailure::Binding)?;
            let result = handler(service, params).map_err(|e| CallFailure::Service(e.into()))?;
            serde_json::to_value(result).map_err(CallFailure::Output)
        });
        self.entries.push(Declared {
            descriptor,
            handler: erased,
            check: check_schema::<P>,
        });
        self
    }

    /// Descriptors in declaration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Sorted names of the public operations.
    pub fn public_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .descriptors()
            .filter(|d| d.is_public())
            .map(|d| d.name)
            .collect();
        names.sort_unstable();
        names
    }

    /// Validate every descriptor against its params type and reject
    /// duplicate names.
    pub(crate) fn validate(&self) -> Result<(), RpcError> {
        for (i, entry) in self.entries.iter().enumerate() {
            let descriptor = &entry.descriptor;
            descriptor.validate()?;
            (entry.check)(descriptor.name)?;
            if self.entries[..i]
                .iter()
                .any(|e| e.descriptor.name == descriptor.name)
            {
                return Err(RpcError::invalid_argument(format!(
                    "duplicate operation {}",
                    descriptor.name
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn into_entries(self) -> Vec<(OperationDescriptor, ErasedHandler<S>)> {
        self.entries
            .into_iter()
            .map(|e| (e.descriptor, e.handler))
            .collect()
    }
}
