//! Registry of config flow handler factories
//!
//! Maps an integration domain to the factory that creates its config flows.
//! Owned by the [`crate::Hub`] and populated as a side effect of loading
//! integration code; there is no ambient global registry.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::flow::FlowHandlerFactory;

/// Process-scoped domain → flow handler factory mapping.
#[derive(Default)]
pub struct HandlerRegistry {
    factories: DashMap<String, Arc<dyn FlowHandlerFactory>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the flow handler factory for a domain, replacing any
    /// previous registration.
    pub fn register(&self, domain: impl Into<String>, factory: Arc<dyn FlowHandlerFactory>) {
        let domain = domain.into();
        debug!("Registered config flow handler for {}", domain);
        self.factories.insert(domain, factory);
    }

    /// Look up the factory for a domain. No side effects.
    pub fn lookup(&self, domain: &str) -> Option<Arc<dyn FlowHandlerFactory>> {
        self.factories.get(domain).map(|entry| entry.value().clone())
    }
}
