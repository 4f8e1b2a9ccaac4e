//! Config Entries
//!
//! This crate provides Hearth's configuration entry system. A config entry
//! represents one configured instance of an integration; entries are created
//! through interactive config flows, persisted with debounced writes, and
//! set up / unloaded through the integration's component callbacks.
//!
//! # Key Types
//!
//! - [`ConfigEntry`] - A single integration configuration
//! - [`ConfigEntries`] - Store that owns all entries and their lifecycle
//! - [`FlowManager`] - Drives multi-step config flows
//! - [`FlowHandler`] / [`FlowHandlerFactory`] - The per-integration flow contract
//! - [`Component`] / [`ComponentLoader`] - The integration runtime contract
//! - [`Hub`] - Composition root threaded through plugin-facing calls
//!
//! # Storage
//!
//! Entries are persisted in `.storage/hearth.config_entries` as a versioned
//! JSON file; bursts of changes coalesce into a single debounced write.

pub mod component;
pub mod entry;
pub mod error;
pub mod flow;
pub mod flow_manager;
pub mod hub;
pub mod manager;
pub mod registry;

pub use component::{Component, ComponentError, ComponentLoader};
pub use entry::{ConfigEntry, EntryState, Source};
pub use error::ConfigError;
pub use flow::{
    FlowContext, FlowHandler, FlowHandlerFactory, FlowProgress, FlowResult, StepError, StepResult,
};
pub use flow_manager::FlowManager;
pub use hub::Hub;
pub use manager::{
    ConfigEntries, ConfigEntriesData, RemoveResult, SAVE_DELAY, STORAGE_KEY,
    STORAGE_MINOR_VERSION, STORAGE_VERSION,
};
pub use registry::HandlerRegistry;
