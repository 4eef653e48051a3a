//! Shared types, error model, and configuration for LeadLoom.
//!
//! This crate is the foundation depended on by all other LeadLoom crates.
//! It provides:
//! - [`LeadloomError`] — the unified error type
//! - Domain types ([`Table`], [`Row`], [`ContactField`], [`ExtractedFields`], [`RunId`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], [`Credentials`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, Credentials, DefaultsConfig, OpenRouterConfig, PipelineConfig, SearchConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{LeadloomError, Result};
pub use types::{ContactField, ExtractedFields, Row, RunId, Table};
