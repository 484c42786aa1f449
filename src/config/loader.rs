//! Configuration Loader
//!
//! Loads and validates deployment configuration from TOML files matching
//! config.example.toml.

use std::collections::HashSet;
use std::path::Path;

use alloy_primitives::Address;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::adapters::uniswap::{DEFAULT_DEADLINE_SECS, DEFAULT_FEE_BPS};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub deployment: DeploymentSection,
    #[serde(default)]
    pub router: RouterSection,
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
    #[serde(default)]
    pub pools: Vec<PoolEntry>,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Contract wiring
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentSection {
    /// Owner of the swapper's admin functions
    pub owner: Address,
    /// Address the wrapped native token is registered at
    pub wrapped_native: Address,
    #[serde(default = "default_wrapped_native_symbol")]
    pub wrapped_native_symbol: String,
}

fn default_wrapped_native_symbol() -> String {
    "WETH".to_string()
}

impl DeploymentSection {
    /// Get owner with environment variable override
    /// Checks SWAPPER_OWNER env var first, falls back to config value
    pub fn get_owner(&self) -> Result<Address, ConfigError> {
        match std::env::var("SWAPPER_OWNER") {
            Ok(raw) => raw.trim().parse().map_err(|e| {
                ConfigError::ValidationError(format!("SWAPPER_OWNER is not an address: {}", e))
            }),
            Err(_) => Ok(self.owner),
        }
    }
}

/// Venue and market adapter settings
#[derive(Debug, Clone, Deserialize)]
pub struct RouterSection {
    /// Pool fee in basis points (30 = 0.3%)
    #[serde(default = "default_fee_bps")]
    pub fee_bps: u16,
    /// Deadline window applied to every swap
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
}

fn default_fee_bps() -> u16 {
    DEFAULT_FEE_BPS
}

fn default_deadline_secs() -> u64 {
    DEFAULT_DEADLINE_SECS
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            fee_bps: DEFAULT_FEE_BPS,
            deadline_secs: DEFAULT_DEADLINE_SECS,
        }
    }
}

/// An ERC20 token to register
#[derive(Debug, Clone, Deserialize)]
pub struct TokenEntry {
    pub symbol: String,
    pub address: Address,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    18
}

/// A pool seeded at deployment; reserves are whole-token amounts
#[derive(Debug, Clone, Deserialize)]
pub struct PoolEntry {
    pub token_a: String,
    pub token_b: String,
    pub reserve_a: Decimal,
    pub reserve_b: Decimal,
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deployment.owner == Address::ZERO {
            return Err(ConfigError::ValidationError(
                "owner cannot be the zero address".to_string(),
            ));
        }
        if self.deployment.wrapped_native == Address::ZERO {
            return Err(ConfigError::ValidationError(
                "wrapped_native cannot be the zero address".to_string(),
            ));
        }
        if self.deployment.wrapped_native_symbol.is_empty() {
            return Err(ConfigError::ValidationError(
                "wrapped_native_symbol cannot be empty".to_string(),
            ));
        }

        if self.router.fee_bps >= 10_000 {
            return Err(ConfigError::ValidationError(format!(
                "fee_bps must be < 10000, got {}",
                self.router.fee_bps
            )));
        }
        if self.router.deadline_secs == 0 {
            return Err(ConfigError::ValidationError(
                "deadline_secs must be > 0".to_string(),
            ));
        }

        let mut symbols = HashSet::new();
        let mut addresses = HashSet::new();
        symbols.insert(self.deployment.wrapped_native_symbol.as_str());
        addresses.insert(self.deployment.wrapped_native);
        for token in &self.tokens {
            if token.symbol.is_empty() {
                return Err(ConfigError::ValidationError(
                    "token symbol cannot be empty".to_string(),
                ));
            }
            if token.address == Address::ZERO {
                return Err(ConfigError::ValidationError(format!(
                    "token {} cannot live at the zero address",
                    token.symbol
                )));
            }
            if token.decimals > 36 {
                return Err(ConfigError::ValidationError(format!(
                    "token {} decimals must be <= 36, got {}",
                    token.symbol, token.decimals
                )));
            }
            if !symbols.insert(token.symbol.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate token symbol {}",
                    token.symbol
                )));
            }
            if !addresses.insert(token.address) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate token address {}",
                    token.address
                )));
            }
        }

        for pool in &self.pools {
            for symbol in [&pool.token_a, &pool.token_b] {
                if !symbols.contains(symbol.as_str()) {
                    return Err(ConfigError::ValidationError(format!(
                        "pool references unknown token {}",
                        symbol
                    )));
                }
            }
            if pool.token_a == pool.token_b {
                return Err(ConfigError::ValidationError(format!(
                    "pool {}/{} pairs a token with itself",
                    pool.token_a, pool.token_b
                )));
            }
            if pool.reserve_a <= Decimal::ZERO || pool.reserve_b <= Decimal::ZERO {
                return Err(ConfigError::ValidationError(format!(
                    "pool {}/{} reserves must be > 0",
                    pool.token_a, pool.token_b
                )));
            }
        }

        Ok(())
    }

    /// Resolve a symbol to its address and decimals
    pub fn token(&self, symbol: &str) -> Option<(Address, u8)> {
        if symbol.eq_ignore_ascii_case(&self.deployment.wrapped_native_symbol) {
            return Some((self.deployment.wrapped_native, crate::domain::NATIVE_DECIMALS));
        }
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
            .map(|t| (t.address, t.decimals))
    }
}
