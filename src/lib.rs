//! ether-swapper - native-to-ERC20 swap settlement
//!
//! Accepts native currency, wraps it, sells it through a market router
//! and forwards the purchased tokens to the caller in one atomic call.
//!
//! # Modules
//!
//! - `domain`: Ledger, tokens, events, reentrancy guard, unit conversion
//! - `ports`: The `MarketRouter` abstraction and test doubles
//! - `adapters`: Uniswap Universal Router venue and market adapter, CLI
//! - `config`: Configuration loading and validation
//! - `application`: Erc20Swapper, serialized chain access, deployment

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod config;
pub mod application;
