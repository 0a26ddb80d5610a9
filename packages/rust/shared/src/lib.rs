//! Shared types, error model, and configuration for the CRM report generator.
//!
//! This crate is the foundation depended on by all other crates.
//! It provides:
//! - [`ReportError`]: the unified error type
//! - CRM records ([`Account`], [`Contact`], [`Opportunity`], [`Project`], [`Engagement`])
//!   and the [`CrmData`] snapshot
//! - Configuration ([`AppConfig`], config loading, secret resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ClaudeConfig, ClaudeSettings, OutputConfig, ReportLabels, SalesforceConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_claude,
    resolve_claude_from,
};
pub use error::{ReportError, Result};
pub use types::{Account, Contact, CrmData, DataSummary, Engagement, Opportunity, Project, ReportId};
