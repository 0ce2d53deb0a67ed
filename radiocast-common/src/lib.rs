//! # Radiocast Common Library
//!
//! Shared code for the Radiocast relay including:
//! - Configuration loading
//! - Event types (RelayEvent enum)
//! - Station name catalog
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod stations;

pub use error::{Error, Result};
pub use events::{EndReason, RelayEvent};
pub use stations::StationCatalog;
