//! Process status and control service.
//!
//! Methods:
//! - `server.status`                — start time, uptime and registered services
//! - `server.reload_plugins`        — re-run the installed `PluginLoader`
//! - `server.get_connected_clients` — ids from the installed `SessionDirectory`
//! - `server.restart`               — trigger the installed `RestartHandle`
//! - `server.shutdown`              — trigger the installed `ShutdownHandle`
//!
//! Operations whose collaborator is not installed fail with `ENOTSUP`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::context::{DispatchContext, WeakDispatchContext};
use crate::error::{BoxError, RpcError};
use crate::service::{NoParams, Operations, Service};

use super::{PluginLoader, RestartHandle, SessionDirectory, ShutdownHandle};

pub const SERVICE_NAME: &str = "server";

#[derive(Default)]
pub struct ManagementService {
    context: Option<WeakDispatchContext>,
    plugins: Option<Arc<dyn PluginLoader>>,
    sessions: Option<Arc<dyn SessionDirectory>>,
    shutdown: Option<Arc<dyn ShutdownHandle>>,
    restart: Option<Arc<dyn RestartHandle>>,
}

impl Service for ManagementService {
    fn initialize(&mut self, context: &DispatchContext) -> Result<(), BoxError> {
        self.context = Some(context.downgrade());
        self.plugins = context.extension::<dyn PluginLoader>();
        self.sessions = context.extension::<dyn SessionDirectory>();
        self.shutdown = context.extension::<dyn ShutdownHandle>();
        self.restart = context.extension::<dyn RestartHandle>();
        Ok(())
    }

    fn operations() -> Operations<Self> {
        Operations::new()
            .public("status", Self::status)
            .public("reload_plugins", Self::reload_plugins)
            .public("get_connected_clients", Self::get_connected_clients)
            .public("restart", Self::restart)
            .public("shutdown", Self::shutdown)
    }
}

fn missing(collaborator: &str) -> RpcError {
    RpcError::not_supported(format!("no {} installed", collaborator))
}

impl ManagementService {
    fn context(&self) -> Result<DispatchContext, RpcError> {
        self.context
            .as_ref()
            .and_then(WeakDispatchContext::upgrade)
            .ok_or_else(|| RpcError::io("dispatch context is gone"))
    }

    // -----------------------------------------------------------------------
    // server.status
    // -----------------------------------------------------------------------

    fn status(&self, _: NoParams) -> Result<StatusResult, RpcError> {
        let context = self.context()?;
        let started_at = context.started_at();
        let uptime_secs = (Utc::now() - started_at).num_seconds().max(0);
        Ok(StatusResult {
            started_at,
            uptime_secs,
            services: context.registry().list_names(),
        })
    }

    // -----------------------------------------------------------------------
    // server.reload_plugins
    // -----------------------------------------------------------------------

    fn reload_plugins(&self, _: NoParams) -> Result<ReloadResult, BoxError> {
        let loader = self.plugins.as_ref().ok_or_else(|| missing("plugin loader"))?;
        let context = self.context()?;
        let loaded = loader.reload(&context)?;
        tracing::info!(loaded, "Reloaded plugins");
        Ok(ReloadResult { loaded })
    }

    // -----------------------------------------------------------------------
    // server.get_connected_clients
    // -----------------------------------------------------------------------

    fn get_connected_clients(&self, _: NoParams) -> Result<Vec<String>, RpcError> {
        let sessions = self
            .sessions
            .as_ref()
            .ok_or_else(|| missing("session directory"))?;
        Ok(sessions.client_ids())
    }

    // -----------------------------------------------------------------------
    // server.restart
    // -----------------------------------------------------------------------

    fn restart(&self, _: NoParams) -> Result<(), RpcError> {
        let handle = self
            .restart
            .as_ref()
            .ok_or_else(|| missing("restart handle"))?;
        tracing::warn!("Restart requested");
        handle.restart();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // server.shutdown
    // -----------------------------------------------------------------------

    fn shutdown(&self, _: NoParams) -> Result<(), RpcError> {
        let handle = self
            .shutdown
            .as_ref()
            .ok_or_else(|| missing("shutdown handle"))?;
        tracing::warn!("Shutdown requested");
        handle.shutdown();
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResult {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
    pub services: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResult {
    pub loaded: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ENOTSUP;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Flag(AtomicBool);

    impl ShutdownHandle for Flag {
        fn shutdown(&self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    impl RestartHandle for Flag {
        fn restart(&self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    struct BrokenLoader;

    impl PluginLoader for BrokenLoader {
        fn reload(&self, _: &DispatchContext) -> Result<usize, BoxError> {
            Err("plugin directory unreadable".into())
        }
    }

    #[test]
    fn test_status_reports_services() {
        let context = DispatchContext::new();
        context
            .register_service(SERVICE_NAME, ManagementService::default())
            .unwrap();
        let status = context.dispatch_call("server.status", None).unwrap();
        assert_eq!(status["services"], serde_json::json!(["server"]));
        assert!(status["uptimeSecs"].as_i64().unwrap() >= 0);
        assert!(status["startedAt"].is_string());
    }

    #[test]
    fn test_missing_collaborators_are_not_supported() {
        let context = DispatchContext::new();
        context
            .register_service(SERVICE_NAME, ManagementService::default())
            .unwrap();
        for method in [
            "server.reload_plugins",
            "server.get_connected_clients",
            "server.restart",
            "server.shutdown",
        ] {
            let err = context.dispatch_call(method, None).unwrap_err();
            assert_eq!(err.code(), Some(ENOTSUP), "{}", method);
        }
    }

    #[test]
    fn test_shutdown_triggers_handle() {
        let flag = Arc::new(Flag(AtomicBool::new(false)));
        let context = DispatchContext::builder()
            .with_extension::<dyn ShutdownHandle>(flag.clone())
            .build();
        context
            .register_service(SERVICE_NAME, ManagementService::default())
            .unwrap();
        let value = context.dispatch_call("server.shutdown", None).unwrap();
        assert!(value.is_null());
        assert!(flag.0.load(Ordering::SeqCst));
    }

    #[test]
    fn test_restart_triggers_handle_and_leaves_shutdown_alone() {
        let restart = Arc::new(Flag(AtomicBool::new(false)));
        let shutdown = Arc::new(Flag(AtomicBool::new(false)));
        let context = DispatchContext::builder()
            .with_extension::<dyn RestartHandle>(restart.clone())
            .with_extension::<dyn ShutdownHandle>(shutdown.clone())
            .build();
        context
            .register_service(SERVICE_NAME, ManagementService::default())
            .unwrap();
        let value = context.dispatch_call("server.restart", None).unwrap();
        assert!(value.is_null());
        assert!(restart.0.load(Ordering::SeqCst));
        assert!(!shutdown.0.load(Ordering::SeqCst));
    }

    #[test]
    fn test_loader_failure_propagates_unchanged() {
        let context = DispatchContext::builder()
            .with_extension::<dyn PluginLoader>(Arc::new(BrokenLoader))
            .build();
        context
            .register_service(SERVICE_NAME, ManagementService::default())
            .unwrap();
        let err = context
            .dispatch_call("server.reload_plugins", None)
            .unwrap_err();
        assert!(err.is_service_error());
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "plugin directory unreadable");
    }
}
