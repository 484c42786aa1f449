//! CLI Adapter
//!
//! Command-line interface for the ether-swapper harness.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{CliApp, Command, DeployCmd, QuoteCmd, SwapCmd, DEFAULT_SLIPPAGE_BPS};
