//! Built-in services and the collaborator interfaces they consume.
//!
//! - `discovery` — introspection over the registry
//! - `server`    — process status and control
//!
//! Collaborators are opaque to the engine. A host installs them on the
//! context with [`DispatchContextBuilder::with_extension`] and the services
//! pick them up in `initialize`.
//!
//! [`DispatchContextBuilder::with_extension`]: crate::context::DispatchContextBuilder::with_extension

pub mod discovery;
pub mod management;

use crate::config::DispatchConfig;
use crate::context::{DispatchContext, DispatchContextBuilder};
use crate::error::{BoxError, DispatchError};

pub use discovery::DiscoveryService;
pub use management::ManagementService;

/// Names of the long-running tasks a scheduler knows about.
pub trait TaskCatalog: Send + Sync {
    fn task_names(&self) -> Vec<String>;
}

/// Re-scans plugin directories and registers what it finds.
pub trait PluginLoader: Send + Sync {
    /// Returns the number of plugins loaded.
    fn reload(&self, context: &DispatchContext) -> Result<usize, BoxError>;
}

/// Currently connected transport clients.
pub trait SessionDirectory: Send + Sync {
    fn client_ids(&self) -> Vec<String>;
}

/// Asks the hosting process to stop.
pub trait ShutdownHandle: Send + Sync {
    fn shutdown(&self);
}

/// Asks the hosting process to stop and start again.
pub trait RestartHandle: Send + Sync {
    fn restart(&self);
}

/// Register the built-in services enabled in `config`.
pub fn register_builtins(
    context: &DispatchContext,
    config: &DispatchConfig,
) -> Result<(), DispatchError> {
    if config.builtins.discovery {
        context.register_service(discovery::SERVICE_NAME, DiscoveryService::default())?;
    }
    if config.builtins.server {
        context.register_service(management::SERVICE_NAME, ManagementService::default())?;
    }
    Ok(())
}

impl DispatchContext {
    /// A fresh context with the built-in services enabled in `config`.
    pub fn with_builtins(config: &DispatchConfig) -> Result<Self, DispatchError> {
        Self::with_builtins_from(Self::builder(), config)
    }

    /// Like [`with_builtins`](Self::with_builtins), keeping the collaborators
    /// already installed on `builder`.
    pub fn with_builtins_from(
        builder: DispatchContextBuilder,
        config: &DispatchConfig,
    ) -> Result<Self, DispatchError> {
        let context = builder.build();
        register_builtins(&context, config)?;
        Ok(context)
    }
}
