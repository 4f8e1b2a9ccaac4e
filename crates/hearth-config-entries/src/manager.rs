//! Config Entries store
//!
//! Owns the collection of [`ConfigEntry`] records, persists it with
//! debounced writes and coordinates entry setup/unload with the component
//! loader.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use hearth_storage::{DelayedSave, Storable, Storage, StorageResult};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::component::Component;
use crate::entry::{ConfigEntry, EntryState};
use crate::error::ConfigError;
use crate::flow::validate_data;
use crate::flow_manager::FlowManager;
use crate::hub::Hub;

/// Storage key for config entries
pub const STORAGE_KEY: &str = "hearth.config_entries";
/// Current storage version
pub const STORAGE_VERSION: u32 = 1;
/// Current minor version
pub const STORAGE_MINOR_VERSION: u32 = 1;

/// Delay before a scheduled save hits disk. Changes within this window
/// coalesce into a single write.
pub const SAVE_DELAY: Duration = Duration::from_secs(1);

/// Config entries data for storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigEntriesData {
    /// All config entries, in insertion order
    pub entries: Vec<ConfigEntry>,
}

impl Storable for ConfigEntriesData {
    const KEY: &'static str = STORAGE_KEY;
    const VERSION: u32 = STORAGE_VERSION;
    const MINOR_VERSION: u32 = STORAGE_MINOR_VERSION;
}

/// Outcome of removing an entry.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RemoveResult {
    /// True when the running component could not be cleanly stopped; the
    /// persisted record is gone either way, but freeing the runtime side
    /// then needs a restart.
    pub require_restart: bool,
}

/// Manage the configuration entries.
///
/// Constructed as `Arc<Self>`; attaches itself to the [`Hub`] so the flow
/// manager and component bootstrap can reach it.
pub struct ConfigEntries {
    hub: Arc<Hub>,

    /// In-progress config flows that produce new entries
    pub flow: FlowManager,

    storage: Arc<Storage>,

    /// Insertion-ordered collection; the lock is never held across a
    /// component callback
    entries: Arc<RwLock<Vec<ConfigEntry>>>,

    save: DelayedSave,
}

impl ConfigEntries {
    /// Create the store for a hub, with storage rooted at the hub's config
    /// directory.
    pub fn new(hub: Arc<Hub>) -> Arc<Self> {
        let storage = Arc::new(Storage::new(hub.config_dir()));
        let store = Arc::new(Self {
            flow: FlowManager::new(hub.clone()),
            storage,
            entries: Arc::new(RwLock::new(Vec::new())),
            save: DelayedSave::new(SAVE_DELAY),
            hub,
        });
        store.hub.attach_config_entries(&store);
        store
    }

    /// Domains that have at least one entry, in first-seen order.
    pub async fn domains(&self) -> Vec<String> {
        let entries = self.entries.read().await;

        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for entry in entries.iter() {
            if seen.insert(entry.domain.clone()) {
                result.push(entry.domain.clone());
            }
        }

        result
    }

    /// Snapshot of all entries, or only those matching a domain.
    pub async fn entries(&self, domain: Option<&str>) -> Vec<ConfigEntry> {
        let entries = self.entries.read().await;
        match domain {
            None => entries.clone(),
            Some(domain) => entries
                .iter()
                .filter(|entry| entry.domain == domain)
                .cloned()
                .collect(),
        }
    }

    /// Snapshot of one entry by id.
    pub async fn get(&self, entry_id: &str) -> Option<ConfigEntry> {
        self.entries
            .read()
            .await
            .iter()
            .find(|entry| entry.entry_id == entry_id)
            .cloned()
    }

    /// Validate, store, persist and set up a new entry.
    ///
    /// The entry's data is checked against the handler's declared schema; a
    /// rejected entry is not added at all. Setup then takes one of two
    /// paths: a domain whose component is already running only needs the
    /// entry-level hook, while a first entry bootstraps the component
    /// asynchronously, which sets up its entries as part of its own startup.
    pub async fn add(&self, entry: ConfigEntry) -> Result<ConfigEntry, ConfigError> {
        let factory = self.flow.get_handler(&entry.domain, false).await?;

        if let Some(schema) = factory.entry_schema() {
            let data = serde_json::to_value(&entry.data)
                .map_err(|err| ConfigError::InvalidData(err.to_string()))?;
            validate_data(schema, &data).map_err(ConfigError::InvalidData)?;
        }

        let entry_id = entry.entry_id.clone();
        let domain = entry.domain.clone();

        self.entries.write().await.push(entry.clone());
        info!(
            "Added config entry {} ({}) [{}]",
            entry.title, domain, entry_id
        );
        self.schedule_save().await;

        if self.hub.loader().is_set_up(&domain) {
            // Component already set up, just run the entry-level hook.
            let component = self.hub.loader().get(&domain);
            self.setup_stored_entry(&entry_id, component).await;
        } else {
            // Setting up the component will also load its entries.
            let hub = self.hub.clone();
            tokio::spawn(async move {
                if let Err(err) = hub.loader().setup_component(hub.clone(), &domain).await {
                    warn!("Setting up component {} failed: {}", domain, err);
                }
            });
        }

        Ok(self.get(&entry_id).await.unwrap_or(entry))
    }

    /// Remove an entry by id and unload its runtime component.
    ///
    /// The persisted record always goes away synchronously; the result
    /// reports whether a restart is needed to actually free the runtime.
    pub async fn remove(&self, entry_id: &str) -> Result<RemoveResult, ConfigError> {
        let mut removed = {
            let mut entries = self.entries.write().await;
            let index = entries
                .iter()
                .position(|entry| entry.entry_id == entry_id)
                .ok_or_else(|| ConfigError::UnknownEntry(entry_id.to_string()))?;
            entries.remove(index)
        };
        self.schedule_save().await;

        let unloaded = removed.unload(&self.hub).await;
        info!(
            "Removed config entry {} ({}) [{}]",
            removed.title, removed.domain, entry_id
        );

        Ok(RemoveResult {
            require_restart: !unloaded,
        })
    }

    /// Load the persisted collection. A missing file is an empty
    /// collection, not an error; persisted entry state is trusted verbatim.
    pub async fn load(&self) -> StorageResult<()> {
        let entries = match self.storage.load::<ConfigEntriesData>(STORAGE_KEY).await? {
            Some(storage_file) => storage_file.data.entries,
            None => Vec::new(),
        };

        info!("Loaded {} config entries", entries.len());
        *self.entries.write().await = entries;
        Ok(())
    }

    /// Set up every stored entry of a domain.
    ///
    /// Component bootstrap calls this as the tail of its own startup, after
    /// the component itself is running.
    pub async fn setup_domain(&self, domain: &str) {
        let component = self.hub.loader().get(domain);
        let entry_ids: Vec<String> = self
            .entries(Some(domain))
            .await
            .into_iter()
            .map(|entry| entry.entry_id)
            .collect();

        for entry_id in entry_ids {
            self.setup_stored_entry(&entry_id, component.clone()).await;
        }
    }

    /// Run the entry-level setup hook for one stored entry and record the
    /// resulting state.
    ///
    /// Works on a snapshot so the collection lock is not held across the
    /// component callback; the state is written back afterwards unless the
    /// entry was removed in the meantime.
    async fn setup_stored_entry(&self, entry_id: &str, component: Option<Arc<dyn Component>>) {
        let Some(mut entry) = self.get(entry_id).await else {
            return;
        };

        entry.setup(&self.hub, component).await;
        self.record_state(entry_id, entry.state).await;
    }

    async fn record_state(&self, entry_id: &str, state: EntryState) {
        let mut entries = self.entries.write().await;
        if let Some(stored) = entries.iter_mut().find(|entry| entry.entry_id == entry_id) {
            stored.state = state;
        }
    }

    /// Schedule a debounced write of the whole collection. The snapshot is
    /// taken when the timer fires, so the last schedule in a burst wins.
    async fn schedule_save(&self) {
        let entries = self.entries.clone();
        let storage = self.storage.clone();

        self.save
            .schedule(async move {
                let data = ConfigEntriesData {
                    entries: entries.read().await.clone(),
                };
                if let Err(err) = storage.save(&data.to_storage_file()).await {
                    warn!("Saving config entries failed: {}", err);
                }
            })
            .await;
    }
}
