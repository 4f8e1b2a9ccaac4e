//! Flow Manager
//!
//! Owns the config flows that are in progress and advances them one step at
//! a time until a step creates an entry or aborts.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::component::ComponentError;
use crate::entry::{ConfigEntry, Source};
use crate::error::ConfigError;
use crate::flow::{
    validate_data, FlowContext, FlowHandler, FlowHandlerFactory, FlowProgress, FlowResult,
    StepError, StepResult,
};
use crate::hub::Hub;

/// Step id a user-initiated flow starts on. Flows from any other source
/// route to the step named after the source tag, so discovery-style flows
/// skip the generic init step.
const STEP_INIT: &str = "init";

/// The step a flow is waiting on, together with the schema its input must
/// satisfy.
struct CurrentStep {
    step_id: String,
    data_schema: Option<Value>,
}

/// Mutable half of an in-progress flow.
struct FlowState {
    handler: Box<dyn FlowHandler>,
    cur_step: Option<CurrentStep>,
}

/// One in-progress flow: immutable identity plus locked state.
struct ActiveFlow {
    context: FlowContext,
    /// Schema version the handler stamps onto created entries
    version: u32,
    state: Mutex<FlowState>,
}

/// Manage all the config flows that are in progress.
pub struct FlowManager {
    hub: Arc<Hub>,
    progress: DashMap<String, Arc<ActiveFlow>>,
}

impl FlowManager {
    pub(crate) fn new(hub: Arc<Hub>) -> Self {
        Self {
            hub,
            progress: DashMap::new(),
        }
    }

    /// Resolve the flow handler factory for a domain.
    ///
    /// A registry hit returns immediately. On a miss the loader imports the
    /// domain's code (which registers the factory as a side effect) and the
    /// registry is checked again; requirement resolution runs only on that
    /// fresh-load path, and only when requested.
    pub(crate) async fn get_handler(
        &self,
        domain: &str,
        resolve_requirements: bool,
    ) -> Result<Arc<dyn FlowHandlerFactory>, ConfigError> {
        if let Some(factory) = self.hub.handlers().lookup(domain) {
            return Ok(factory);
        }

        self.hub.loader().load(&self.hub, domain).await?;

        let factory = self
            .hub
            .handlers()
            .lookup(domain)
            .ok_or_else(|| ConfigError::UnknownHandler(domain.to_string()))?;

        if resolve_requirements {
            self.hub
                .loader()
                .resolve_requirements(&self.hub, domain)
                .await?;
        }

        Ok(factory)
    }

    /// The flows currently awaiting a step.
    pub fn progress(&self) -> Vec<FlowProgress> {
        self.progress
            .iter()
            .map(|flow| FlowProgress {
                flow_id: flow.context.flow_id.clone(),
                domain: flow.context.domain.clone(),
                source: flow.context.source,
            })
            .collect()
    }

    /// Start a configuration flow and run its initial step.
    pub async fn start(
        &self,
        domain: &str,
        source: Source,
        data: Option<Value>,
    ) -> Result<FlowResult, ConfigError> {
        let factory = self.get_handler(domain, true).await?;

        let flow_id = ulid::Ulid::new().to_string();
        let flow = Arc::new(ActiveFlow {
            context: FlowContext {
                flow_id: flow_id.clone(),
                domain: domain.to_string(),
                source,
            },
            version: factory.version(),
            state: Mutex::new(FlowState {
                handler: factory.create_flow(),
                cur_step: None,
            }),
        });
        self.progress.insert(flow_id, flow.clone());

        let step_id = match source {
            Source::User => STEP_INIT,
            other => other.as_str(),
        };
        debug!(
            "Starting {} flow {} at step {}",
            domain, flow.context.flow_id, step_id
        );

        self.handle_step(&flow, step_id, data).await
    }

    /// Continue a flow with the user's input for its current step.
    ///
    /// If the current step declared an input schema and input was supplied,
    /// the input is validated before dispatch; a validation failure leaves
    /// the flow untouched.
    pub async fn configure(
        &self,
        flow_id: &str,
        user_input: Option<Value>,
    ) -> Result<FlowResult, ConfigError> {
        let flow = self
            .progress
            .get(flow_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ConfigError::UnknownFlow(flow_id.to_string()))?;

        let step_id = {
            let state = flow.state.lock().await;

            // The flow may have finished while we waited for its lock.
            if !self.progress.contains_key(flow_id) {
                return Err(ConfigError::UnknownFlow(flow_id.to_string()));
            }

            let Some(cur_step) = state.cur_step.as_ref() else {
                return Err(ConfigError::UnknownFlow(flow_id.to_string()));
            };

            if let (Some(schema), Some(input)) = (cur_step.data_schema.as_ref(), user_input.as_ref())
            {
                validate_data(schema, input).map_err(ConfigError::InvalidData)?;
            }

            cur_step.step_id.clone()
        };

        self.handle_step(&flow, &step_id, user_input).await
    }

    /// Cancel a flow without consulting its handler.
    pub fn abort(&self, flow_id: &str) -> Result<(), ConfigError> {
        self.progress
            .remove(flow_id)
            .map(|_| ())
            .ok_or_else(|| ConfigError::UnknownFlow(flow_id.to_string()))
    }

    /// Run one step of a flow and apply its result.
    async fn handle_step(
        &self,
        flow: &Arc<ActiveFlow>,
        step_id: &str,
        input: Option<Value>,
    ) -> Result<FlowResult, ConfigError> {
        let mut state = flow.state.lock().await;
        let context = &flow.context;

        let FlowState { handler, cur_step } = &mut *state;
        let result = match handler.step(context, step_id, input).await {
            Ok(result) => result,
            Err(StepError::Unsupported) => {
                // An unsupported step is fatal to the flow, not retryable.
                self.progress.remove(&context.flow_id);
                return Err(ConfigError::UnknownStep {
                    domain: context.domain.clone(),
                    step_id: step_id.to_string(),
                });
            }
            Err(StepError::Failed(reason)) => {
                // No usable step remains to resume from; discard the flow.
                self.progress.remove(&context.flow_id);
                return Err(ConfigError::StepFailed {
                    step_id: step_id.to_string(),
                    reason,
                });
            }
        };

        match result {
            StepResult::Form {
                title,
                step_id,
                description,
                data_schema,
                errors,
            } => {
                *cur_step = Some(CurrentStep {
                    step_id: step_id.clone(),
                    data_schema: data_schema.clone(),
                });
                Ok(FlowResult::Form {
                    flow_id: context.flow_id.clone(),
                    title,
                    step_id,
                    description,
                    data_schema,
                    errors,
                })
            }
            StepResult::Abort { reason } => {
                self.progress.remove(&context.flow_id);
                Ok(FlowResult::Abort {
                    flow_id: context.flow_id.clone(),
                    reason,
                })
            }
            StepResult::CreateEntry { title, data } => {
                // The flow leaves the in-progress set before the store runs
                // its validation: a rejected entry still finishes the flow,
                // and the error propagates to the caller.
                self.progress.remove(&context.flow_id);

                let store = self.hub.config_entries().ok_or_else(|| {
                    ComponentError::Failed("no config entry store attached to hub".to_string())
                })?;

                let entry = ConfigEntry::new(
                    flow.version,
                    &context.domain,
                    &title,
                    data,
                    context.source,
                );
                let entry = store.add(entry).await?;

                Ok(FlowResult::CreateEntry {
                    flow_id: context.flow_id.clone(),
                    title,
                    entry_id: entry.entry_id,
                })
            }
        }
    }
}
