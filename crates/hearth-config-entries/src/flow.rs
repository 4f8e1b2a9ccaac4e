//! Config flow step protocol
//!
//! A config flow is a multi-step interaction that ends in a new config
//! entry or an abort. Each step returns one of the closed set of
//! [`StepResult`] kinds; the flow's identity travels in an explicit
//! [`FlowContext`] rather than state mutated onto the handler.

use std::collections::HashMap;

use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::entry::Source;

/// Identity of a flow, fixed at start and passed into every step.
#[derive(Debug, Clone, Serialize)]
pub struct FlowContext {
    /// Unique id of this flow, valid only while the flow is in progress
    pub flow_id: String,
    /// Integration domain the flow configures
    pub domain: String,
    /// How the flow was initiated
    pub source: Source,
}

/// Error returned by a step implementation
#[derive(Debug, Error)]
pub enum StepError {
    /// The handler has no implementation for the requested step. Fatal to
    /// the flow.
    #[error("unsupported step")]
    Unsupported,

    /// The step ran and failed inside integration code.
    #[error("{0}")]
    Failed(String),
}

/// The closed set of outcomes a flow step may produce
#[derive(Debug, Clone)]
pub enum StepResult {
    /// Keep the flow alive and ask for more input.
    Form {
        title: String,
        /// Step to dispatch when the form is submitted
        step_id: String,
        description: Option<String>,
        /// JSON Schema the submitted input must satisfy
        data_schema: Option<Value>,
        /// Field errors from a previous submission
        errors: Option<HashMap<String, String>>,
    },
    /// Finish the flow and create a config entry.
    CreateEntry {
        title: String,
        data: HashMap<String, Value>,
    },
    /// Finish the flow without creating anything.
    Abort { reason: String },
}

impl StepResult {
    /// Describe a form to gather input for the named step.
    pub fn show_form(
        title: impl Into<String>,
        step_id: impl Into<String>,
        data_schema: Option<Value>,
        errors: Option<HashMap<String, String>>,
    ) -> Self {
        StepResult::Form {
            title: title.into(),
            step_id: step_id.into(),
            description: None,
            data_schema,
            errors,
        }
    }

    /// Finish the flow and create an entry with the given title and data.
    pub fn create_entry(title: impl Into<String>, data: HashMap<String, Value>) -> Self {
        StepResult::CreateEntry {
            title: title.into(),
            data,
        }
    }

    /// Abort the flow with a reason code.
    pub fn abort(reason: impl Into<String>) -> Self {
        StepResult::Abort {
            reason: reason.into(),
        }
    }

    /// Attach a description to a form result. No effect on other kinds.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        if let StepResult::Form {
            description: slot, ..
        } = &mut self
        {
            *slot = Some(description.into());
        }
        self
    }
}

/// A single in-progress flow instance.
///
/// Dispatch is an explicit match on the step id; ids the handler does not
/// implement must return [`StepError::Unsupported`].
#[async_trait]
pub trait FlowHandler: Send {
    /// Run one step with the (already validated) user input.
    async fn step(
        &mut self,
        ctx: &FlowContext,
        step_id: &str,
        input: Option<Value>,
    ) -> Result<StepResult, StepError>;
}

/// Per-domain flow entry point, registered in the
/// [`crate::HandlerRegistry`].
pub trait FlowHandlerFactory: Send + Sync {
    /// Schema version stamped onto entries created by this flow.
    fn version(&self) -> u32 {
        1
    }

    /// JSON Schema that entry data must satisfy at add time.
    fn entry_schema(&self) -> Option<&Value> {
        None
    }

    /// Construct a fresh flow instance.
    fn create_flow(&self) -> Box<dyn FlowHandler>;
}

/// What the embedder gets back from `start`/`configure`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowResult {
    /// The flow continues; show this form and `configure` with the input.
    Form {
        flow_id: String,
        title: String,
        step_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        data_schema: Option<Value>,
        errors: Option<HashMap<String, String>>,
    },
    /// The flow finished and created an entry.
    CreateEntry {
        flow_id: String,
        title: String,
        entry_id: String,
    },
    /// The flow finished without creating an entry.
    Abort { flow_id: String, reason: String },
}

/// One row of [`crate::FlowManager::progress`] output.
#[derive(Debug, Clone, Serialize)]
pub struct FlowProgress {
    pub flow_id: String,
    pub domain: String,
    pub source: Source,
}

/// Validate a JSON value against a JSON Schema document.
///
/// Every violation is collected into one message so the caller sees the
/// complete picture in a single error.
pub(crate) fn validate_data(schema: &Value, instance: &Value) -> Result<(), String> {
    let compiled = JSONSchema::compile(schema).map_err(|err| format!("invalid schema: {}", err))?;

    if let Err(errors) = compiled.validate(instance) {
        let message = errors
            .map(|err| err.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(message);
    }

    Ok(())
}
