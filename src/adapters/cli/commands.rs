//! CLI Command Definitions
//!
//! Argument structures for the ether-swapper harness.

use std::path::PathBuf;

use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

/// Default slippage tolerance when no explicit minimum is given
pub const DEFAULT_SLIPPAGE_BPS: u16 = 50;

/// ether-swapper - swap native currency for ERC20 tokens in one call
#[derive(Parser, Debug)]
#[command(
    name = "ether-swapper",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Swap native currency for ERC20 tokens through a pluggable market router",
    long_about = "ether-swapper deploys the ERC20Swapper and a Uniswap Universal Router \
                  venue onto an in-process chain and drives swapEtherToToken against it."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Deploy the router and swapper and print their addresses
    Deploy(DeployCmd),

    /// Quote a native-to-token swap
    Quote(QuoteCmd),

    /// Execute swapEtherToToken
    Swap(SwapCmd),
}

/// Deploy contracts
#[derive(Parser, Debug)]
pub struct DeployCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.example.toml")]
    pub config: PathBuf,

    /// Print the deployment as JSON
    #[arg(long)]
    pub json: bool,
}

/// Get swap quote
#[derive(Parser, Debug)]
pub struct QuoteCmd {
    /// Output token symbol (e.g., DAI)
    #[arg(short, long, value_name = "SYMBOL")]
    pub token: String,

    /// Native amount to sell, in whole units (e.g., 1.5)
    #[arg(short, long, value_name = "AMOUNT")]
    pub amount: Decimal,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.example.toml")]
    pub config: PathBuf,
}

/// Execute swap
#[derive(Parser, Debug)]
pub struct SwapCmd {
    /// Output token symbol (e.g., DAI)
    #[arg(short, long, value_name = "SYMBOL")]
    pub token: String,

    /// Native amount to attach, in whole units (e.g., 1.5)
    #[arg(short, long, value_name = "AMOUNT")]
    pub amount: Decimal,

    /// Minimum output in whole token units (overrides --slippage)
    #[arg(long, value_name = "AMOUNT")]
    pub min_out: Option<Decimal>,

    /// Slippage tolerance against the quote in basis points
    #[arg(long, value_name = "BPS", default_value_t = DEFAULT_SLIPPAGE_BPS)]
    pub slippage: u16,

    /// Sending account (random when omitted)
    #[arg(long, value_name = "ADDRESS")]
    pub from: Option<Address>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.example.toml")]
    pub config: PathBuf,

    /// Print the receipt as JSON
    #[arg(long)]
    pub json: bool,
}
