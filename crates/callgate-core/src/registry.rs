//! Service registry.
//!
//! Maps service names to fully assembled [`ServiceEntry`] values. Entries are
//! built (and their services initialized) before the write lock is taken, so
//! a lookup sees either the old entry or the new one, never a partial one.
//! Lookups hand out an `Arc`, so no lock is held while an operation runs.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{Map, Value};

use crate::error::RpcError;
use crate::service::{CallFailure, OperationDescriptor, Operations, Service};

type Handler = Box<dyn Fn(Map<String, Value>) -> Result<Value, CallFailure> + Send + Sync>;

/// One operation bound to its service instance.
pub(crate) struct BoundOperation {
    pub(crate) descriptor: OperationDescriptor,
    handler: Handler,
}

impl BoundOperation {
    pub(crate) fn invoke(&self, args: Map<String, Value>) -> Result<Value, CallFailure> {
        (self.handler)(args)
    }
}

/// A registered service: the instance plus its operation table.
pub struct ServiceEntry {
    name: String,
    instance: Arc<dyn Any + Send + Sync>,
    operations: HashMap<&'static str, BoundOperation>,
}

impl std::fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("name", &self.name)
            .field("operations", &self.enumerate_methods())
            .finish()
    }
}

impl ServiceEntry {
    /// Bind every declared operation to `instance`.
    ///
    /// `operations` must already have passed validation.
    pub(crate) fn assemble<S: Service>(name: String, instance: S, operations: Operations<S>) -> Self {
        let instance = Arc::new(instance);
        let operations = operations
            .into_entries()
            .into_iter()
            .map(|(descriptor, erased)| {
                let target = Arc::clone(&instance);
                let handler: Handler = Box::new(move |args| erased(target.as_ref(), args));
                (descriptor.name, BoundOperation { descriptor, handler })
            })
            .collect();
        Self {
            name,
            instance,
            operations,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The concrete service instance, if it is an `S`.
    pub fn instance<S: Service>(&self) -> Option<Arc<S>> {
        Arc::clone(&self.instance).downcast::<S>().ok()
    }

    /// Sorted names of the operations callable through dispatch.
    pub fn enumerate_methods(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .operations
            .values()
            .filter(|op| op.descriptor.is_public())
            .map(|op| op.descriptor.name)
            .collect();
        names.sort_unstable();
        names
    }

    /// Descriptors of the public operations, sorted by name.
    pub fn describe(&self) -> Vec<OperationDescriptor> {
        let mut descriptors: Vec<_> = self
            .operations
            .values()
            .filter(|op| op.descriptor.is_public())
            .map(|op| op.descriptor.clone())
            .collect();
        descriptors.sort_unstable_by_key(|d| d.name);
        descriptors
    }

    /// Resolve a public operation by name.
    pub(crate) fn resolve(&self, operation: &str) -> Option<&BoundOperation> {
        self.operations
            .get(operation)
            .filter(|op| op.descriptor.is_public())
    }
}

/// Name → service mapping shared by every dispatch call.
#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, Arc<ServiceEntry>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `entry`, replacing any entry of the same name.
    ///
    /// Returns the replaced entry.
    pub(crate) fn insert(&self, entry: ServiceEntry) -> Option<Arc<ServiceEntry>> {
        let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
        services.insert(entry.name.clone(), Arc::new(entry))
    }

    /// Remove a service. Absent names are ignored.
    pub fn remove(&self, name: &str) -> Option<Arc<ServiceEntry>> {
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Look up a service by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<ServiceEntry>, RpcError> {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| RpcError::not_found(format!("service {} not found", name)))
    }

    /// Snapshot of the registered names, sorted.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ENOENT;
    use crate::service::{NoParams, Operations};

    struct Clock(u64);

    impl Clock {
        fn now(&self, _: NoParams) -> Result<u64, RpcError> {
            Ok(self.0)
        }

        fn tick(&self, _: NoParams) -> Result<(), RpcError> {
            Ok(())
        }
    }

    impl Service for Clock {
        fn operations() -> Operations<Self> {
            Operations::new()
                .public("now", Self::now)
                .internal("_tick", Self::tick)
        }
    }

    fn entry(name: &str, value: u64) -> ServiceEntry {
        ServiceEntry::assemble(name.to_string(), Clock(value), Clock::operations())
    }

    #[test]
    fn test_lookup_and_list() {
        let registry = ServiceRegistry::new();
        assert!(registry.list_names().is_empty());
        registry.insert(entry("clock", 1));
        registry.insert(entry("alarm", 2));

        assert_eq!(registry.list_names(), vec!["alarm", "clock"]);
        assert_eq!(registry.lookup("clock").unwrap().name(), "clock");

        let err = registry.lookup("missing").unwrap_err();
        assert_eq!(err.code, ENOENT);
        assert_eq!(err.message, "service missing not found");
    }

    #[test]
    fn test_insert_replaces_existing_entry() {
        let registry = ServiceRegistry::new();
        assert!(registry.insert(entry("clock", 1)).is_none());
        let replaced = registry.insert(entry("clock", 7)).unwrap();
        assert_eq!(replaced.instance::<Clock>().unwrap().0, 1);
        assert_eq!(registry.list_names(), vec!["clock"]);
        assert_eq!(registry.lookup("clock").unwrap().instance::<Clock>().unwrap().0, 7);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let registry = ServiceRegistry::new();
        registry.insert(entry("clock", 1));
        assert!(registry.remove("nope").is_none());
        assert!(registry.remove("clock").is_some());
        assert!(registry.list_names().is_empty());
    }

    #[test]
    fn test_internal_operations_hidden() {
        let clock = entry("clock", 3);
        assert_eq!(clock.enumerate_methods(), vec!["now"]);
        assert_eq!(clock.describe().len(), 1);
        assert!(clock.resolve("now").is_some());
        assert!(clock.resolve("_tick").is_none());

        let value = clock.resolve("now").unwrap().invoke(Map::new()).unwrap();
        assert_eq!(value, Value::from(3));
    }
}
