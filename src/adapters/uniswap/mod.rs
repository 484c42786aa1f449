//! Uniswap Adapter
//!
//! Implementation of the MarketRouter port over Uniswap's Universal Router.
//! Handles command encoding, venue execution and swap settlement.

pub mod commands;
mod market;
mod venue;

pub use commands::{Command, CommandError, RoutePlanner};
pub use market::{UniswapMarket, DEFAULT_DEADLINE_SECS};
pub use venue::{get_amount_out, Pool, UniversalRouter, VenueError, DEFAULT_FEE_BPS};
