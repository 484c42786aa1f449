//! Configuration Module
//!
//! Loads and validates deployment configuration from TOML files.

pub mod loader;

pub use loader::{
    Config, ConfigError, DeploymentSection, LoggingSection, PoolEntry, RouterSection,
    TokenEntry, load_config,
};
