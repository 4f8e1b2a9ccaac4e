//! Demo integration
//!
//! A minimal integration with a config flow, used to exercise the config
//! entry machinery end to end. A user flow asks for the device host; a
//! discovery flow creates the entry straight from the discovered data.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use serde_json::{json, Value};
use tracing::info;

use hearth_config_entries::{
    Component, ComponentError, ConfigEntry, FlowContext, FlowHandler, FlowHandlerFactory, Hub,
    StepError, StepResult,
};

use crate::directory::ComponentDirectory;

pub const DOMAIN: &str = "demo";

fn host_schema() -> Value {
    json!({
        "type": "object",
        "required": ["host"],
        "properties": {
            "host": { "type": "string" },
            "name": { "type": "string" }
        }
    })
}

/// Demo component; tracks which entries are live.
#[derive(Default)]
pub struct DemoComponent {
    active: DashSet<String>,
}

impl DemoComponent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the entry's device is currently running.
    pub fn is_active(&self, entry_id: &str) -> bool {
        self.active.contains(entry_id)
    }
}

#[async_trait]
impl Component for DemoComponent {
    async fn setup_entry(&self, _hub: &Hub, entry: &ConfigEntry) -> Result<bool, ComponentError> {
        let Some(host) = entry.data.get("host").and_then(Value::as_str) else {
            return Ok(false);
        };

        info!("Demo device {} up at {}", entry.title, host);
        self.active.insert(entry.entry_id.clone());
        Ok(true)
    }

    fn supports_unload(&self) -> bool {
        true
    }

    async fn unload_entry(&self, _hub: &Hub, entry: &ConfigEntry) -> Result<bool, ComponentError> {
        Ok(self.active.remove(&entry.entry_id).is_some())
    }
}

/// Factory for demo config flows.
pub struct DemoFlowFactory {
    entry_schema: Value,
}

impl DemoFlowFactory {
    pub fn new() -> Self {
        Self {
            entry_schema: host_schema(),
        }
    }
}

impl Default for DemoFlowFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowHandlerFactory for DemoFlowFactory {
    fn version(&self) -> u32 {
        1
    }

    fn entry_schema(&self) -> Option<&Value> {
        Some(&self.entry_schema)
    }

    fn create_flow(&self) -> Box<dyn FlowHandler> {
        Box::new(DemoFlow)
    }
}

/// Config flow for the demo integration.
pub struct DemoFlow;

impl DemoFlow {
    fn host_form(errors: Option<HashMap<String, String>>) -> StepResult {
        StepResult::show_form("Demo device", "init", Some(host_schema()), errors)
            .with_description("Enter the address of the demo device")
    }

    fn entry_for(input: &Value, host: &str) -> StepResult {
        let title = input
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("Demo device");

        let mut data = HashMap::new();
        data.insert("host".to_string(), json!(host));
        StepResult::create_entry(title, data)
    }

    fn step_init(&self, input: Option<Value>) -> Result<StepResult, StepError> {
        let Some(input) = input else {
            return Ok(Self::host_form(None));
        };

        match input.get("host").and_then(Value::as_str) {
            Some(host) if !host.is_empty() => Ok(Self::entry_for(&input, host)),
            _ => {
                let mut errors = HashMap::new();
                errors.insert("host".to_string(), "host_required".to_string());
                Ok(Self::host_form(Some(errors)))
            }
        }
    }

    fn step_discovery(&self, input: Option<Value>) -> Result<StepResult, StepError> {
        let Some(input) = input else {
            return Ok(StepResult::abort("no_device_found"));
        };

        match input.get("host").and_then(Value::as_str) {
            Some(host) if !host.is_empty() => Ok(Self::entry_for(&input, host)),
            _ => Ok(StepResult::abort("no_device_found")),
        }
    }
}

#[async_trait]
impl FlowHandler for DemoFlow {
    async fn step(
        &mut self,
        _ctx: &FlowContext,
        step_id: &str,
        input: Option<Value>,
    ) -> Result<StepResult, StepError> {
        match step_id {
            "init" => self.step_init(input),
            "discovery" => self.step_discovery(input),
            _ => Err(StepError::Unsupported),
        }
    }
}

/// Register the demo integration in a component directory.
pub fn register(directory: &ComponentDirectory) -> Arc<DemoComponent> {
    let component = Arc::new(DemoComponent::new());
    directory.register(
        DOMAIN,
        component.clone(),
        Some(Arc::new(DemoFlowFactory::new())),
    );
    component
}
