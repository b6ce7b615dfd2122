//! Introspection service.
//!
//! Methods:
//! - `discovery.get_services` — names of every registered service
//! - `discovery.get_methods`  — public operations of one service
//! - `discovery.get_tasks`    — task names from the installed `TaskCatalog`

use std::sync::Arc;

use serde::Deserialize;

use crate::context::{DispatchContext, WeakDispatchContext};
use crate::error::{BoxError, RpcError};
use crate::params::Params;
use crate::service::{NoParams, Operations, Param, Service};

use super::TaskCatalog;

pub const SERVICE_NAME: &str = "discovery";

#[derive(Default)]
pub struct DiscoveryService {
    context: Option<WeakDispatchContext>,
    tasks: Option<Arc<dyn TaskCatalog>>,
}

impl Service for DiscoveryService {
    fn initialize(&mut self, context: &DispatchContext) -> Result<(), BoxError> {
        self.context = Some(context.downgrade());
        self.tasks = context.extension::<dyn TaskCatalog>();
        Ok(())
    }

    fn operations() -> Operations<Self> {
        Operations::new()
            .public("get_services", Self::get_services)
            .public("get_methods", Self::get_methods)
            .public("get_tasks", Self::get_tasks)
    }
}

impl DiscoveryService {
    fn context(&self) -> Result<DispatchContext, RpcError> {
        self.context
            .as_ref()
            .and_then(WeakDispatchContext::upgrade)
            .ok_or_else(|| RpcError::io("dispatch context is gone"))
    }

    // -----------------------------------------------------------------------
    // discovery.get_services
    // -----------------------------------------------------------------------

    fn get_services(&self, _: NoParams) -> Result<Vec<String>, RpcError> {
        Ok(self.context()?.registry().list_names())
    }

    // -----------------------------------------------------------------------
    // discovery.get_methods
    // -----------------------------------------------------------------------

    fn get_methods(&self, params: GetMethodsParams) -> Result<Vec<&'static str>, RpcError> {
        let context = self.context()?;
        let entry = context
            .registry()
            .lookup(&params.service)
            .map_err(|_| RpcError::not_found("Service not found"))?;
        Ok(entry.enumerate_methods())
    }

    // -----------------------------------------------------------------------
    // discovery.get_tasks
    // -----------------------------------------------------------------------

    fn get_tasks(&self, _: NoParams) -> Result<Vec<String>, RpcError> {
        let mut names = self
            .tasks
            .as_ref()
            .map(|catalog| catalog.task_names())
            .unwrap_or_default();
        names.sort();
        Ok(names)
    }
}

#[derive(Debug, Deserialize)]
pub struct GetMethodsParams {
    pub service: String,
}

impl Params for GetMethodsParams {
    const SCHEMA: &'static [Param] = &[Param::required("service")];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ENOENT;
    use serde_json::json;

    struct FixedTasks;

    impl TaskCatalog for FixedTasks {
        fn task_names(&self) -> Vec<String> {
            vec!["zfs.scrub".into(), "disk.wipe".into()]
        }
    }

    #[test]
    fn test_lists_itself() {
        let context = DispatchContext::new();
        context
            .register_service(SERVICE_NAME, DiscoveryService::default())
            .unwrap();

        let services = context.dispatch_call("discovery.get_services", None).unwrap();
        assert_eq!(services, json!(["discovery"]));

        let methods = context
            .dispatch_call("discovery.get_methods", Some(json!(["discovery"])))
            .unwrap();
        assert_eq!(methods, json!(["get_methods", "get_services", "get_tasks"]));
    }

    #[test]
    fn test_get_methods_unknown_service_is_service_error() {
        let context = DispatchContext::new();
        context
            .register_service(SERVICE_NAME, DiscoveryService::default())
            .unwrap();
        let err = context
            .dispatch_call("discovery.get_methods", Some(json!({"service": "nope"})))
            .unwrap_err();
        // Raised by the operation body, so it is passed through as-is.
        assert!(err.is_service_error());
        assert_eq!(err.code(), Some(ENOENT));
        assert_eq!(err.as_rpc().unwrap().message, "Service not found");
    }

    #[test]
    fn test_get_tasks() {
        let context = DispatchContext::new();
        context
            .register_service(SERVICE_NAME, DiscoveryService::default())
            .unwrap();
        assert_eq!(
            context.dispatch_call("discovery.get_tasks", None).unwrap(),
            json!([])
        );

        let context = DispatchContext::builder()
            .with_extension::<dyn TaskCatalog>(Arc::new(FixedTasks))
            .build();
        context
            .register_service(SERVICE_NAME, DiscoveryService::default())
            .unwrap();
        assert_eq!(
            context.dispatch_call("discovery.get_tasks", None).unwrap(),
            json!(["disk.wipe", "zfs.scrub"])
        );
    }
}
