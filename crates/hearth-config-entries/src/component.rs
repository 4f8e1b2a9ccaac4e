//! Integration component contracts
//!
//! Defines the callbacks an integration exposes to the entry lifecycle and
//! the loader collaborator that imports integration code on demand. The
//! implementations live outside this crate (see `hearth-components` for the
//! compiled-in directory).

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::entry::ConfigEntry;
use crate::hub::Hub;

/// Errors from loading or running integration code
#[derive(Debug, Error)]
pub enum ComponentError {
    /// No component code is available for the domain.
    #[error("component {0} is not available")]
    NotFound(String),

    /// The domain's requirements or dependencies could not be resolved.
    #[error("requirements for {domain} not satisfied: {reason}")]
    Requirements { domain: String, reason: String },

    /// The component itself reported a failure.
    #[error("{0}")]
    Failed(String),
}

/// The callbacks an integration exposes to the entry lifecycle.
///
/// `setup_entry` is mandatory. Unload support is optional and advertised
/// through [`Component::supports_unload`]; the orchestrator checks the
/// capability before ever calling [`Component::unload_entry`].
#[async_trait]
pub trait Component: Send + Sync {
    /// One-time setup of the component itself, run before any of its
    /// entries. `Ok(false)` marks the bootstrap as failed.
    async fn setup(&self, _hub: &Hub) -> Result<bool, ComponentError> {
        Ok(true)
    }

    /// Set up one config entry. `Ok(true)` marks the entry loaded; anything
    /// else leaves it in a setup error.
    async fn setup_entry(&self, hub: &Hub, entry: &ConfigEntry) -> Result<bool, ComponentError>;

    /// Whether this component implements [`Component::unload_entry`].
    fn supports_unload(&self) -> bool {
        false
    }

    /// Tear down one config entry. Only called when `supports_unload`
    /// returns true.
    async fn unload_entry(&self, _hub: &Hub, _entry: &ConfigEntry) -> Result<bool, ComponentError> {
        Ok(false)
    }
}

/// Loads integration code and tracks which components are set up.
///
/// Loading a domain is expected to register its config flow handler factory
/// into the hub's [`crate::HandlerRegistry`] as a side effect; the flow
/// manager re-checks the registry after a load.
#[async_trait]
pub trait ComponentLoader: Send + Sync {
    /// Import the domain's code and return its component.
    async fn load(&self, hub: &Hub, domain: &str) -> Result<Arc<dyn Component>, ComponentError>;

    /// Component for a domain whose code is already loaded.
    fn get(&self, domain: &str) -> Option<Arc<dyn Component>>;

    /// Whether the component finished its own setup.
    fn is_set_up(&self, domain: &str) -> bool;

    /// Bootstrap the component, which is expected to finish by setting up
    /// all of its stored entries.
    async fn setup_component(&self, hub: Arc<Hub>, domain: &str) -> Result<(), ComponentError>;

    /// Resolve the domain's requirements and dependencies. Runs before the
    /// first flow on a freshly loaded domain; failures abort the flow start.
    async fn resolve_requirements(&self, hub: &Hub, domain: &str) -> Result<(), ComponentError>;
}
