//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Uniswap: Universal Router venue and the MarketRouter adapter over it
//! - CLI: Command-line interface definitions

pub mod cli;
pub mod uniswap;

pub use cli::CliApp;
pub use uniswap::{UniswapMarket, UniversalRouter};
