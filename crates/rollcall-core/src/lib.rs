//! Rollcall Core - Foundation crate for the Rollcall ingestion engine.
//!
//! This crate provides the shared types, error handling and configuration
//! management that all other Rollcall crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared newtypes (`RegionId`, `RecordId`, `PersonId`, `GroupId`)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, DatabaseConfig, ProxyConfig, RegionConfig, ScrapingConfig};
pub use error::{ConfigError, ConfigResult, Result, RollcallError};
pub use types::{GroupId, NameQuery, PersonId, RecordId, RegionId};
