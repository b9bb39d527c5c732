//! # Finna Common Library
//!
//! Shared code for the finna-gen tooling:
//! - Common error type
//! - TOML bootstrap configuration and data folder resolution
//! - Logging initialisation
//! - Progress event types and the EventBus

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
