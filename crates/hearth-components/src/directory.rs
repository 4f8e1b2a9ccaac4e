//! Component directory
//!
//! A [`ComponentLoader`] for deployments where every integration is
//! compiled in. "Loading" a domain hands out its registration and puts its
//! config flow factory into the hub's handler registry; component bootstrap
//! finishes by setting up the domain's stored entries.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tracing::info;

use hearth_config_entries::{
    Component, ComponentError, ComponentLoader, FlowHandlerFactory, Hub,
};

/// One registered integration.
#[derive(Clone)]
pub struct Registration {
    pub component: Arc<dyn Component>,
    pub flow: Option<Arc<dyn FlowHandlerFactory>>,
}

/// Compiled-in component loader.
#[derive(Default)]
pub struct ComponentDirectory {
    registrations: DashMap<String, Registration>,
    set_up: DashSet<String>,
}

impl ComponentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an integration available for loading, optionally with a config
    /// flow.
    pub fn register(
        &self,
        domain: impl Into<String>,
        component: Arc<dyn Component>,
        flow: Option<Arc<dyn FlowHandlerFactory>>,
    ) {
        self.registrations
            .insert(domain.into(), Registration { component, flow });
    }
}

#[async_trait]
impl ComponentLoader for ComponentDirectory {
    async fn load(&self, hub: &Hub, domain: &str) -> Result<Arc<dyn Component>, ComponentError> {
        let registration = self
            .registrations
            .get(domain)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ComponentError::NotFound(domain.to_string()))?;

        // Loading a domain registers its config flow as a side effect.
        if let Some(flow) = registration.flow.clone() {
            hub.handlers().register(domain, flow);
        }

        Ok(registration.component)
    }

    fn get(&self, domain: &str) -> Option<Arc<dyn Component>> {
        self.registrations
            .get(domain)
            .map(|entry| entry.component.clone())
    }

    fn is_set_up(&self, domain: &str) -> bool {
        self.set_up.contains(domain)
    }

    async fn setup_component(&self, hub: Arc<Hub>, domain: &str) -> Result<(), ComponentError> {
        // Idempotent: a concurrent or repeated bootstrap is a no-op.
        if !self.set_up.insert(domain.to_string()) {
            return Ok(());
        }

        let component = self.load(&hub, domain).await?;
        match component.setup(&hub).await {
            Ok(true) => {}
            Ok(false) => {
                self.set_up.remove(domain);
                return Err(ComponentError::Failed(format!(
                    "component {} refused to set up",
                    domain
                )));
            }
            Err(err) => {
                self.set_up.remove(domain);
                return Err(err);
            }
        }
        info!("Component {} set up", domain);

        // The component's startup finishes by bringing up its stored entries.
        if let Some(store) = hub.config_entries() {
            store.setup_domain(domain).await;
        }

        Ok(())
    }

    async fn resolve_requirements(&self, _hub: &Hub, domain: &str) -> Result<(), ComponentError> {
        // Compiled-in integrations carry their dependencies with them; the
        // domain just has to exist.
        if self.registrations.contains_key(domain) {
            Ok(())
        } else {
            Err(ComponentError::NotFound(domain.to_string()))
        }
    }
}
