//! Composition root handle
//!
//! The [`Hub`] bundles the pieces plugin-facing calls need: the config
//! directory, the handler registry and the component loader. The config
//! entry store attaches itself at construction so collaborators (component
//! bootstrap in particular) can reach back into it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, Weak};

use crate::component::ComponentLoader;
use crate::manager::ConfigEntries;
use crate::registry::HandlerRegistry;

/// Runtime handle threaded through every plugin-facing call.
pub struct Hub {
    config_dir: PathBuf,
    loader: Arc<dyn ComponentLoader>,
    handlers: HandlerRegistry,
    config_entries: OnceLock<Weak<ConfigEntries>>,
}

impl Hub {
    /// Create a hub rooted at `config_dir` with the given loader.
    pub fn new(config_dir: impl Into<PathBuf>, loader: Arc<dyn ComponentLoader>) -> Arc<Self> {
        Arc::new(Self {
            config_dir: config_dir.into(),
            loader,
            handlers: HandlerRegistry::new(),
            config_entries: OnceLock::new(),
        })
    }

    /// The hub's configuration directory.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// The component loader collaborator.
    pub fn loader(&self) -> &Arc<dyn ComponentLoader> {
        &self.loader
    }

    /// The config flow handler registry.
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// The attached config entry store.
    ///
    /// `None` before a store is constructed for this hub, or after it was
    /// dropped.
    pub fn config_entries(&self) -> Option<Arc<ConfigEntries>> {
        self.config_entries.get().and_then(Weak::upgrade)
    }

    pub(crate) fn attach_config_entries(&self, store: &Arc<ConfigEntries>) {
        let _ = self.config_entries.set(Arc::downgrade(store));
    }
}
