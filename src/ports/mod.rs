//! Ports Layer - Trait definitions for external dependencies
//!
//! Following hexagonal architecture, the swapper only sees the
//! `MarketRouter` capability; concrete venues live in `adapters`.

pub mod market_router;
pub mod mocks;

pub use market_router::{MarketRouter, RouterError, SwapRequest};
#[cfg(test)]
pub use market_router::MockMarketRouter;
pub use mocks::{MockBehavior, MockRouter};
