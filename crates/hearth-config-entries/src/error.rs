//! Error kinds surfaced by the entry and flow APIs.

use thiserror::Error;

use crate::component::ComponentError;

/// Errors while configuring an integration.
///
/// None of these are retried by the orchestrator itself; retry policy, if
/// any, belongs to the caller.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An operation referenced an entry id that does not exist.
    #[error("unknown config entry: {0}")]
    UnknownEntry(String),

    /// The domain has no registered (or loadable) config flow handler.
    #[error("no config flow handler for domain {0}")]
    UnknownHandler(String),

    /// An operation referenced a flow id that is not in progress.
    #[error("unknown flow: {0}")]
    UnknownFlow(String),

    /// The flow's handler does not implement the requested step. Detecting
    /// this discards the flow.
    #[error("handler for {domain} does not support step {step_id}")]
    UnknownStep { domain: String, step_id: String },

    /// User input or entry data failed the declared schema.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A flow step failed inside integration code. The flow is discarded.
    #[error("step {step_id} failed: {reason}")]
    StepFailed { step_id: String, reason: String },

    /// Loading or bootstrapping integration code failed.
    #[error(transparent)]
    Component(#[from] ComponentError),
}
