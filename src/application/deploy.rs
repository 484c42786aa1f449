//! Deployment
//!
//! Stands the system up on a ledger from configuration: tokens, the venue
//! and its pools, the market adapter, and finally the swapper wired to the
//! adapter's address. The router must exist before the swapper can be
//! constructed against it.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use thiserror::Error;

use super::swapper::{Erc20Swapper, SwapperError};
use crate::adapters::uniswap::{UniswapMarket, UniversalRouter, VenueError};
use crate::config::{Config, ConfigError};
use crate::domain::{to_base_units, Ledger, LedgerError, TokenMeta, UnitsError};
use crate::ports::{MarketRouter, RouterError};

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Venue error: {0}")]
    Venue(#[from] VenueError),
    #[error("Invalid amount: {0}")]
    Units(#[from] UnitsError),
    #[error("Swapper deployment failed: {0}")]
    Swapper(#[from] SwapperError),
    #[error("Unknown token symbol: {0}")]
    UnknownToken(String),
}

/// A registered token as deployed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedToken {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

/// Handles to everything a deployment created
#[derive(Debug, Clone)]
pub struct Deployment {
    pub owner: Address,
    pub wrapped_native: DeployedToken,
    pub tokens: Vec<DeployedToken>,
    pub venue: Arc<UniversalRouter>,
    pub market: Arc<UniswapMarket>,
    pub swapper: Arc<Erc20Swapper>,
}

impl Deployment {
    pub fn deploy(ledger: &mut Ledger, config: &Config) -> Result<Self, DeploymentError> {
        config.validate()?;
        let owner = config.deployment.get_owner()?;

        let wrapped_native = DeployedToken {
            symbol: config.deployment.wrapped_native_symbol.clone(),
            address: config.deployment.wrapped_native,
            decimals: crate::domain::NATIVE_DECIMALS,
        };
        ledger.register_token(
            wrapped_native.address,
            TokenMeta::wrapped_native(wrapped_native.symbol.clone()),
        )?;

        let mut tokens = Vec::with_capacity(config.tokens.len());
        for entry in &config.tokens {
            ledger.register_token(entry.address, TokenMeta::standard(entry.symbol.clone(), entry.decimals))?;
            tokens.push(DeployedToken {
                symbol: entry.symbol.clone(),
                address: entry.address,
                decimals: entry.decimals,
            });
        }

        let mut venue = UniversalRouter::deploy(ledger, config.router.fee_bps);
        for pool in &config.pools {
            let (token_a, decimals_a) = resolve(config, &pool.token_a)?;
            let (token_b, decimals_b) = resolve(config, &pool.token_b)?;
            venue.create_pool(ledger, token_a, token_b)?;
            venue.add_liquidity(
                ledger,
                token_a,
                token_b,
                to_base_units(pool.reserve_a, decimals_a)?,
                to_base_units(pool.reserve_b, decimals_b)?,
            )?;
            tracing::info!(
                "Seeded {}/{} pool with {} / {}",
                pool.token_a,
                pool.token_b,
                pool.reserve_a,
                pool.reserve_b
            );
        }
        let venue = Arc::new(venue);

        let market = Arc::new(UniswapMarket::deploy(
            ledger,
            venue.clone(),
            config.router.deadline_secs,
        ));
        let swapper = Erc20Swapper::deploy(ledger, owner, wrapped_native.address, market.clone())?;

        Ok(Self {
            owner,
            wrapped_native,
            tokens,
            venue,
            market,
            swapper: Arc::new(swapper),
        })
    }

    /// Look a token up by symbol, case-insensitively
    pub fn token(&self, symbol: &str) -> Option<&DeployedToken> {
        std::iter::once(&self.wrapped_native)
            .chain(self.tokens.iter())
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Tokens reachable from the wrapped native token in one hop
    pub fn swappable_tokens(&self) -> Vec<&DeployedToken> {
        let weth = self.wrapped_native.address;
        self.tokens
            .iter()
            .filter(|t| {
                self.venue
                    .pools()
                    .any(|p| p.contains(weth) && p.contains(t.address))
            })
            .collect()
    }

    /// Expected output for `value` native currency into `token_out`
    pub fn quote(&self, ledger: &Ledger, token_out: Address, value: U256) -> Result<U256, RouterError> {
        self.market
            .quote(ledger, self.wrapped_native.address, token_out, value)
    }

    pub fn router_address(&self) -> Address {
        self.market.address()
    }
}

fn resolve(config: &Config, symbol: &str) -> Result<(Address, u8), DeploymentError> {
    config
        .token(symbol)
        .ok_or_else(|| DeploymentError::UnknownToken(symbol.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeploymentSection, LoggingSection, PoolEntry, RouterSection, TokenEntry};
    use rust_decimal_macros::dec;

    fn config() -> Config {
        Config {
            deployment: DeploymentSection {
                owner: Address::repeat_byte(0xaa),
                wrapped_native: Address::repeat_byte(0xee),
                wrapped_native_symbol: "WETH".to_string(),
            },
            router: RouterSection::default(),
            tokens: vec![
                TokenEntry {
                    symbol: "DAI".to_string(),
                    address: Address::repeat_byte(0xda),
                    decimals: 18,
                },
                TokenEntry {
                    symbol: "USDC".to_string(),
                    address: Address::repeat_byte(0xc0),
                    decimals: 6,
                },
            ],
            pools: vec![PoolEntry {
                token_a: "WETH".to_string(),
                token_b: "DAI".to_string(),
                reserve_a: dec!(100),
                reserve_b: dec!(250000),
            }],
            logging: LoggingSection::default(),
        }
    }

    #[test]
    fn test_deploy_wires_swapper_to_market() {
        let mut ledger = Ledger::default();
        let deployment = Deployment::deploy(&mut ledger, &config()).unwrap();

        assert_eq!(deployment.swapper.router_address(), deployment.router_address());
        assert_eq!(deployment.swapper.wrapped_native(), Address::repeat_byte(0xee));
        assert_eq!(deployment.swapper.owner(), Address::repeat_byte(0xaa));
        assert_eq!(deployment.token("usdc").map(|t| t.decimals), Some(6));
    }

    #[test]
    fn test_pools_seeded_with_backed_reserves() {
        let mut ledger = Ledger::default();
        let deployment = Deployment::deploy(&mut ledger, &config()).unwrap();
        let weth = deployment.wrapped_native.address;
        let dai = Address::repeat_byte(0xda);

        let (reserve_weth, reserve_dai) = deployment.venue.reserves(&ledger, weth, dai).unwrap();
        assert_eq!(reserve_weth, to_base_units(dec!(100), 18).unwrap());
        assert_eq!(reserve_dai, to_base_units(dec!(250000), 18).unwrap());
        assert_eq!(ledger.native_balance(weth), reserve_weth);

        let swappable: Vec<&str> = deployment
            .swappable_tokens()
            .iter()
            .map(|t| t.symbol.as_str())
            .collect();
        assert_eq!(swappable, vec!["DAI"]);
    }

    #[test]
    fn test_quote_through_market() {
        let mut ledger = Ledger::default();
        let deployment = Deployment::deploy(&mut ledger, &config()).unwrap();
        let one = to_base_units(dec!(1), 18).unwrap();

        let quoted = deployment
            .quote(&ledger, Address::repeat_byte(0xda), one)
            .unwrap();
        assert!(quoted > U256::ZERO);

        let err = deployment
            .quote(&ledger, Address::repeat_byte(0xc0), one)
            .unwrap_err();
        assert!(matches!(err, RouterError::RouteNotFound { .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = config();
        cfg.router.fee_bps = 10_000;
        let mut ledger = Ledger::default();
        assert!(matches!(
            Deployment::deploy(&mut ledger, &cfg),
            Err(DeploymentError::Config(_))
        ));
    }
}
