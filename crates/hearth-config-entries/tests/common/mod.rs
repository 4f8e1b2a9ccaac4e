//! Shared fixtures for config entry tests
//!
//! Provides a mock component, a mock component loader and a scriptable flow
//! handler so tests can drive the store and the flow manager without real
//! integrations.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde_json::Value;
use tempfile::TempDir;

use hearth_config_entries::{
    Component, ComponentError, ComponentLoader, ConfigEntries, ConfigEntry, EntryState,
    FlowContext, FlowHandler, FlowHandlerFactory, Hub, StepError, StepResult,
};

/// Component with scriptable setup/unload behavior and call counters.
pub struct MockComponent {
    unload_supported: bool,
    pub fail_setup: AtomicBool,
    pub refuse_setup: AtomicBool,
    pub fail_unload: AtomicBool,
    pub setup_calls: AtomicUsize,
    pub unload_calls: AtomicUsize,
}

impl MockComponent {
    pub fn new(unload_supported: bool) -> Arc<Self> {
        Arc::new(Self {
            unload_supported,
            fail_setup: AtomicBool::new(false),
            refuse_setup: AtomicBool::new(false),
            fail_unload: AtomicBool::new(false),
            setup_calls: AtomicUsize::new(0),
            unload_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Component for MockComponent {
    async fn setup_entry(&self, _hub: &Hub, _entry: &ConfigEntry) -> Result<bool, ComponentError> {
        self.setup_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_setup.load(Ordering::SeqCst) {
            return Err(ComponentError::Failed("mock setup failure".to_string()));
        }
        if self.refuse_setup.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(true)
    }

    fn supports_unload(&self) -> bool {
        self.unload_supported
    }

    async fn unload_entry(&self, _hub: &Hub, _entry: &ConfigEntry) -> Result<bool, ComponentError> {
        self.unload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_unload.load(Ordering::SeqCst) {
            return Err(ComponentError::Failed("mock unload failure".to_string()));
        }
        Ok(true)
    }
}

/// In-memory component loader with registration maps and call counters.
#[derive(Default)]
pub struct MockLoader {
    components: DashMap<String, Arc<dyn Component>>,
    flows: DashMap<String, Arc<dyn FlowHandlerFactory>>,
    set_up: DashSet<String>,
    pub fail_requirements: AtomicBool,
    pub load_calls: AtomicUsize,
    pub resolve_calls: AtomicUsize,
}

impl MockLoader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register_component(&self, domain: &str, component: Arc<dyn Component>) {
        self.components.insert(domain.to_string(), component);
    }

    pub fn register_flow(&self, domain: &str, factory: Arc<dyn FlowHandlerFactory>) {
        self.flows.insert(domain.to_string(), factory);
    }

    pub fn mark_set_up(&self, domain: &str) {
        self.set_up.insert(domain.to_string());
    }
}

#[async_trait]
impl ComponentLoader for MockLoader {
    async fn load(&self, hub: &Hub, domain: &str) -> Result<Arc<dyn Component>, ComponentError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);

        let component = self
            .components
            .get(domain)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ComponentError::NotFound(domain.to_string()))?;

        // Loading a domain registers its flow handler as a side effect.
        if let Some(factory) = self.flows.get(domain).map(|entry| entry.value().clone()) {
            hub.handlers().register(domain, factory);
        }

        Ok(component)
    }

    fn get(&self, domain: &str) -> Option<Arc<dyn Component>> {
        self.components.get(domain).map(|entry| entry.value().clone())
    }

    fn is_set_up(&self, domain: &str) -> bool {
        self.set_up.contains(domain)
    }

    async fn setup_component(&self, hub: Arc<Hub>, domain: &str) -> Result<(), ComponentError> {
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

        if let Some(store) = hub.config_entries() {
            store.setup_domain(domain).await;
        }

        Ok(())
    }

    async fn resolve_requirements(&self, _hub: &Hub, domain: &str) -> Result<(), ComponentError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_requirements.load(Ordering::SeqCst) {
            return Err(ComponentError::Requirements {
                domain: domain.to_string(),
                reason: "mock requirement failure".to_string(),
            });
        }
        Ok(())
    }
}

/// Flow handler driven by a pre-loaded script of step results.
///
/// Every dispatched step pops the front of the script; an empty script
/// behaves like an unsupported step. Dispatched step ids are recorded.
pub struct ScriptedFlowFactory {
    version: u32,
    entry_schema: Option<Value>,
    script: Arc<Mutex<VecDeque<Result<StepResult, StepError>>>>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFlowFactory {
    pub fn new(version: u32, entry_schema: Option<Value>) -> Arc<Self> {
        Arc::new(Self {
            version,
            entry_schema,
            script: Arc::new(Mutex::new(VecDeque::new())),
            seen: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn push_step(&self, result: Result<StepResult, StepError>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn seen_steps(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl FlowHandlerFactory for ScriptedFlowFactory {
    fn version(&self) -> u32 {
        self.version
    }

    fn entry_schema(&self) -> Option<&Value> {
        self.entry_schema.as_ref()
    }

    fn create_flow(&self) -> Box<dyn FlowHandler> {
        Box::new(ScriptedFlow {
            script: self.script.clone(),
            seen: self.seen.clone(),
        })
    }
}

struct ScriptedFlow {
    script: Arc<Mutex<VecDeque<Result<StepResult, StepError>>>>,
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl FlowHandler for ScriptedFlow {
    async fn step(
        &mut self,
        _ctx: &FlowContext,
        step_id: &str,
        _input: Option<Value>,
    ) -> Result<StepResult, StepError> {
        self.seen.lock().unwrap().push(step_id.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(StepError::Unsupported))
    }
}

/// A hub with a mock loader and a fresh store over a temp directory.
pub struct TestHub {
    pub hub: Arc<Hub>,
    pub loader: Arc<MockLoader>,
    pub store: Arc<ConfigEntries>,
    pub dir: TempDir,
}

pub fn test_hub() -> TestHub {
    let dir = TempDir::new().unwrap();
    let loader = MockLoader::new();
    let hub = Hub::new(dir.path(), loader.clone() as Arc<dyn ComponentLoader>);
    let store = ConfigEntries::new(hub.clone());
    TestHub {
        hub,
        loader,
        store,
        dir,
    }
}

/// Poll until the entry reaches the wanted state, yielding to let spawned
/// setup work run.
pub async fn wait_for_state(store: &ConfigEntries, entry_id: &str, state: EntryState) {
    for _ in 0..100 {
        if store.get(entry_id).await.map(|entry| entry.state) == Some(state) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("entry {} never reached {:?}", entry_id, state);
}
