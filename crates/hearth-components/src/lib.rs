//! Hearth Built-in Components
//!
//! This crate contains integrations that are compiled into the hub, plus
//! the [`ComponentDirectory`] loader that hands them to the config entry
//! subsystem.

pub mod demo;
pub mod directory;

pub use directory::{ComponentDirectory, Registration};
