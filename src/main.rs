//! ether-swapper - native-to-ERC20 swap harness
//!
//! Deploys the swapper against a Uniswap Universal Router venue on an
//! in-process chain and drives it from the command line.

use std::path::Path;

use alloy_primitives::{Address, U256};
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use ether_swapper::adapters::cli::{CliApp, Command, DeployCmd, QuoteCmd, SwapCmd};
use ether_swapper::application::{Chain, Deployment};
use ether_swapper::config::{load_config, Config};
use ether_swapper::domain::{format_units, to_base_units, Ledger, NATIVE_DECIMALS};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (SWAPPER_OWNER and friends)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();

    match app.command {
        Command::Deploy(cmd) => {
            let config = load(&cmd.config)?;
            init_logging(app.verbose, app.debug, &config.logging.level)?;
            deploy_command(cmd, config).await
        }
        Command::Quote(cmd) => {
            let config = load(&cmd.config)?;
            init_logging(app.verbose, app.debug, &config.logging.level)?;
            quote_command(cmd, config).await
        }
        Command::Swap(cmd) => {
            let config = load(&cmd.config)?;
            init_logging(app.verbose, app.debug, &config.logging.level)?;
            swap_command(cmd, config).await
        }
    }
}

fn init_logging(verbose: bool, debug: bool, level: &str) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    fmt().with_env_filter(filter).with_target(false).init();
    Ok(())
}

fn load(path: &Path) -> Result<Config> {
    // Expand config path (handles ~ for home directory)
    let expanded = shellexpand::tilde(&path.to_string_lossy()).to_string();
    load_config(&expanded).with_context(|| format!("Failed to load configuration from {}", expanded))
}

fn deploy_fresh(config: &Config) -> Result<(Ledger, Deployment)> {
    let mut ledger = Ledger::default();
    let deployment = Deployment::deploy(&mut ledger, config).context("Deployment failed")?;
    Ok((ledger, deployment))
}

async fn deploy_command(cmd: DeployCmd, config: Config) -> Result<()> {
    let (_, deployment) = deploy_fresh(&config)?;

    if cmd.json {
        let tokens: Vec<_> = deployment
            .tokens
            .iter()
            .map(|t| serde_json::json!({ "symbol": t.symbol, "address": t.address, "decimals": t.decimals }))
            .collect();
        let out = serde_json::json!({
            "owner": deployment.owner,
            "wrappedNative": deployment.wrapped_native.address,
            "universalRouter": deployment.venue.address(),
            "router": deployment.router_address(),
            "swapper": deployment.swapper.address(),
            "tokens": tokens,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("UniswapMarket deployed to {}", deployment.router_address());
    println!("ERC20Swapper deployed to {}", deployment.swapper.address());
    println!("  Owner:            {}", deployment.owner);
    println!(
        "  Wrapped native:   {} ({})",
        deployment.wrapped_native.address, deployment.wrapped_native.symbol
    );
    println!("  Universal Router: {}", deployment.venue.address());
    for token in deployment.swappable_tokens() {
        println!("  Swappable:        {} at {}", token.symbol, token.address);
    }
    Ok(())
}

async fn quote_command(cmd: QuoteCmd, config: Config) -> Result<()> {
    let (ledger, deployment) = deploy_fresh(&config)?;
    let token = deployment
        .token(&cmd.token)
        .with_context(|| format!("Unknown token {}", cmd.token))?;
    let value = to_base_units(cmd.amount, NATIVE_DECIMALS).context("Invalid amount")?;

    let quoted = deployment
        .quote(&ledger, token.address, value)
        .context("Quote failed")?;

    println!(
        "Quote: {} {} -> {} {}",
        cmd.amount,
        deployment.wrapped_native.symbol,
        format_units(quoted, token.decimals),
        token.symbol
    );
    println!("  Fee: {} bps", deployment.venue.fee_bps());
    Ok(())
}

async fn swap_command(cmd: SwapCmd, config: Config) -> Result<()> {
    if cmd.slippage > 10_000 {
        bail!("Slippage must be <= 10000 bps, got {}", cmd.slippage);
    }

    let (mut ledger, deployment) = deploy_fresh(&config)?;
    let token = deployment
        .token(&cmd.token)
        .with_context(|| format!("Unknown token {}", cmd.token))?
        .clone();
    let value = to_base_units(cmd.amount, NATIVE_DECIMALS).context("Invalid amount")?;

    let from = cmd.from.unwrap_or_else(|| {
        let account = Address::from(rand::random::<[u8; 20]>());
        tracing::info!("Using random account {}", account);
        account
    });
    let funded = ledger.native_balance(from).saturating_add(value);
    ledger.set_native_balance(from, funded);

    let min_out = match cmd.min_out {
        Some(min) => to_base_units(min, token.decimals).context("Invalid minimum output")?,
        None => {
            let quoted = deployment
                .quote(&ledger, token.address, value)
                .context("Quote failed")?;
            quoted * U256::from(10_000 - cmd.slippage) / U256::from(10_000u64)
        }
    };

    let chain = Chain::new(ledger);
    let receipt = chain
        .swap_ether_to_token(&deployment.swapper, from, value, token.address, min_out)
        .await
        .context("swapEtherToToken reverted")?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&receipt)?);
        return Ok(());
    }

    let balance = chain
        .view(|l| l.balance_of(token.address, from))
        .await
        .context("Failed to read balance")?;
    println!(
        "Swapped {} {} for {} {}",
        cmd.amount,
        deployment.wrapped_native.symbol,
        format_units(receipt.output, token.decimals),
        token.symbol
    );
    println!("  Account:   {}", from);
    println!("  Minimum:   {} {}", format_units(min_out, token.decimals), token.symbol);
    println!("  Balance:   {} {}", format_units(balance, token.decimals), token.symbol);
    println!("  Block:     {} (timestamp {})", receipt.block_number, receipt.timestamp);
    println!("  Logs:      {}", receipt.logs.len());
    Ok(())
}
