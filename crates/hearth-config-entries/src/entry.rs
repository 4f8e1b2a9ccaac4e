//! Config Entry types
//!
//! A [`ConfigEntry`] represents a single configured instance of an
//! integration, together with its runtime load state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use crate::component::Component;
use crate::hub::Hub;

/// Config entry lifecycle state
///
/// Persisted with the entry and trusted verbatim on reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// Initial state, not yet set up
    #[default]
    NotLoaded,
    /// Successfully set up
    Loaded,
    /// Setup failed
    SetupError,
}

/// How an entry (or the flow that produced it) was initiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Configured by the user
    #[default]
    User,
    /// Found by a discovery mechanism
    Discovery,
    /// Imported from an existing configuration
    Import,
    /// Created by the hub itself
    System,
}

impl Source {
    /// The serialized tag, also used as the initial step id for
    /// non-user flows.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::User => "user",
            Source::Discovery => "discovery",
            Source::Import => "import",
            Source::System => "system",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configuration entry for an integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Unique identifier (ULID), generated at creation and immutable
    pub entry_id: String,

    /// Schema version of `data`, owned by the integration
    pub version: u32,

    /// Integration domain this entry belongs to
    pub domain: String,

    /// Human-readable display name
    pub title: String,

    /// Integration-specific configuration values, opaque after add-time
    /// validation
    #[serde(default)]
    pub data: HashMap<String, Value>,

    /// Origin of the entry
    #[serde(default)]
    pub source: Source,

    /// Current lifecycle state
    #[serde(default)]
    pub state: EntryState,
}

impl ConfigEntry {
    /// Create a new entry in the `NotLoaded` state with a fresh id.
    pub fn new(
        version: u32,
        domain: impl Into<String>,
        title: impl Into<String>,
        data: HashMap<String, Value>,
        source: Source,
    ) -> Self {
        Self {
            entry_id: ulid::Ulid::new().to_string(),
            version,
            domain: domain.into(),
            title: title.into(),
            data,
            source,
            state: EntryState::NotLoaded,
        }
    }

    /// Invoke the component's entry setup callback and record the outcome.
    ///
    /// When `component` is not supplied, it is resolved through the hub's
    /// loader. Failures are logged and absorbed: the entry ends in
    /// `SetupError` and the orchestrator keeps running no matter what the
    /// component did.
    pub async fn setup(&mut self, hub: &Hub, component: Option<Arc<dyn Component>>) {
        let component = match component.or_else(|| hub.loader().get(&self.domain)) {
            Some(component) => component,
            None => {
                error!(
                    "Component {} is not available, cannot set up entry {}",
                    self.domain, self.title
                );
                self.state = EntryState::SetupError;
                return;
            }
        };

        let loaded = match component.setup_entry(hub, self).await {
            Ok(true) => true,
            Ok(false) => {
                warn!("{} refused to set up entry {}", self.domain, self.title);
                false
            }
            Err(err) => {
                error!(
                    "Error setting up entry {} for {}: {}",
                    self.title, self.domain, err
                );
                false
            }
        };

        self.state = if loaded {
            EntryState::Loaded
        } else {
            EntryState::SetupError
        };
    }

    /// Invoke the component's unload callback, if it declares one.
    ///
    /// Returns whether the running component was cleanly stopped. The entry
    /// itself always ends `NotLoaded`; a `false` return tells the caller the
    /// runtime side could not be freed.
    pub async fn unload(&mut self, hub: &Hub) -> bool {
        let unloaded = self.run_unload(hub).await;
        self.state = EntryState::NotLoaded;
        unloaded
    }

    async fn run_unload(&self, hub: &Hub) -> bool {
        let Some(component) = hub.loader().get(&self.domain) else {
            warn!(
                "Component {} is not available, entry {} cannot be unloaded",
                self.domain, self.title
            );
            return false;
        };

        // Capability check, not a call: most integrations only support setup.
        if !component.supports_unload() {
            return false;
        }

        match component.unload_entry(hub, self).await {
            Ok(result) => result,
            Err(err) => {
                error!(
                    "Error unloading entry {} for {}: {}",
                    self.title, self.domain, err
                );
                false
            }
        }
    }
}
