//! Uniswap Market
//!
//! `MarketRouter` implementation over the Universal Router. Each swap is
//! one atomic frame: pull the input into the router, execute
//! `V2_SWAP_EXACT_IN` followed by `SWEEP` to the recipient, then report
//! what the recipient actually received.

use std::sync::Arc;

use alloy_primitives::{Address, U256};

use super::commands::{Command, RoutePlanner, ADDRESS_THIS};
use super::venue::{UniversalRouter, VenueError};
use crate::domain::{CallContext, Ledger};
use crate::ports::{MarketRouter, RouterError, SwapRequest};

/// Deadline window applied when a request carries none
pub const DEFAULT_DEADLINE_SECS: u64 = 300;

impl From<VenueError> for RouterError {
    fn from(err: VenueError) -> Self {
        match err {
            VenueError::V2TooLittleReceived { min, actual } => {
                RouterError::InsufficientOutputAmount { min, actual }
            }
            VenueError::InsufficientToken { min, available, .. } => {
                RouterError::InsufficientOutputAmount {
                    min,
                    actual: available,
                }
            }
            VenueError::TransactionDeadlinePassed { deadline, now } => {
                RouterError::DeadlineExpired { deadline, now }
            }
            VenueError::PairNotFound { token_a, token_b } => RouterError::RouteNotFound {
                token_in: token_a,
                token_out: token_b,
            },
            other => RouterError::ExternalCallReverted(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UniswapMarket {
    address: Address,
    venue: Arc<UniversalRouter>,
    deadline_secs: u64,
}

impl UniswapMarket {
    pub fn new(address: Address, venue: Arc<UniversalRouter>, deadline_secs: u64) -> Self {
        Self {
            address,
            venue,
            deadline_secs,
        }
    }

    /// Derive an address on the ledger and create the adapter there
    pub fn deploy(ledger: &mut Ledger, venue: Arc<UniversalRouter>, deadline_secs: u64) -> Self {
        let address = ledger.create_address("UniswapMarket");
        tracing::info!("UniswapMarket deployed to {}", address);
        Self::new(address, venue, deadline_secs)
    }

    pub fn venue(&self) -> &Arc<UniversalRouter> {
        &self.venue
    }

    pub fn deadline_secs(&self) -> u64 {
        self.deadline_secs
    }

    /// Expected output for selling `amount_in` of `token_in`
    pub fn quote(
        &self,
        ledger: &Ledger,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<U256, RouterError> {
        self.venue
            .quote_exact_input(ledger, &[token_in, token_out], amount_in)
            .map_err(RouterError::from)
    }

    /// Transfer-in happens outside the plan; the plan swaps the router's
    /// input balance and sweeps the proceeds to the recipient
    fn plan(&self, request: &SwapRequest) -> RoutePlanner {
        RoutePlanner::new()
            .add(Command::V2SwapExactIn {
                recipient: ADDRESS_THIS,
                amount_in: request.amount_in,
                amount_out_min: request.min_amount_out,
                path: vec![request.token_in, request.token_out],
                payer_is_user: false,
            })
            .add(Command::Sweep {
                token: request.token_out,
                recipient: request.recipient,
                amount_min: request.min_amount_out,
            })
    }
}

impl MarketRouter for UniswapMarket {
    fn address(&self) -> Address {
        self.address
    }

    fn name(&self) -> &'static str {
        "uniswap-universal-router"
    }

    fn swap(
        &self,
        ledger: &mut Ledger,
        caller: Address,
        request: &SwapRequest,
    ) -> Result<U256, RouterError> {
        request.validate()?;

        let now = ledger.timestamp();
        let deadline = request
            .deadline
            .unwrap_or_else(|| now.saturating_add(self.deadline_secs));
        if now > deadline {
            return Err(RouterError::DeadlineExpired { deadline, now });
        }
        if self.venue.pool(request.token_in, request.token_out).is_none() {
            return Err(RouterError::RouteNotFound {
                token_in: request.token_in,
                token_out: request.token_out,
            });
        }

        let calldata = self.plan(request).calldata(deadline);

        ledger.transact(|ledger| {
            let before = ledger.balance_of(request.token_out, request.recipient)?;

            ledger.transfer_from(
                request.token_in,
                self.address,
                caller,
                self.venue.address(),
                request.amount_in,
            )?;
            self.venue
                .execute(ledger, CallContext::sender(self.address), &calldata)?;

            let after = ledger.balance_of(request.token_out, request.recipient)?;
            let delivered = after.saturating_sub(before);
            tracing::debug!(
                "{} swap: {} {} -> {} {}",
                self.name(),
                request.amount_in,
                ledger.token_symbol(request.token_in).unwrap_or("?"),
                delivered,
                ledger.token_symbol(request.token_out).unwrap_or("?")
            );
            Ok(delivered)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::uniswap::venue::DEFAULT_FEE_BPS;
    use crate::domain::TokenMeta;

    fn e18(n: u64) -> U256 {
        U256::from(n) * U256::from(1_000_000_000_000_000_000u64)
    }

    struct Fixture {
        ledger: Ledger,
        market: UniswapMarket,
        weth: Address,
        dai: Address,
        caller: Address,
    }

    fn setup() -> Fixture {
        let mut ledger = Ledger::default();
        let weth = ledger.create_address("WETH");
        let dai = ledger.create_address("DAI");
        ledger.register_token(weth, TokenMeta::wrapped_native("WETH")).unwrap();
        ledger.register_token(dai, TokenMeta::standard("DAI", 18)).unwrap();

        let mut venue = UniversalRouter::deploy(&mut ledger, DEFAULT_FEE_BPS);
        venue.create_pool(&mut ledger, weth, dai).unwrap();
        venue
            .add_liquidity(&mut ledger, weth, dai, e18(100), e18(250_000))
            .unwrap();
        let market = UniswapMarket::deploy(&mut ledger, Arc::new(venue), DEFAULT_DEADLINE_SECS);

        let caller = ledger.create_address("caller");
        ledger.set_native_balance(caller, e18(10));
        ledger.deposit(weth, caller, e18(10)).unwrap();
        ledger.approve(weth, caller, market.address(), e18(10)).unwrap();

        Fixture {
            ledger,
            market,
            weth,
            dai,
            caller,
        }
    }

    #[test]
    fn test_swap_delivers_quote_and_holds_nothing() {
        let mut f = setup();
        let quoted = f.market.quote(&f.ledger, f.weth, f.dai, e18(1)).unwrap();
        let req = SwapRequest::new(f.weth, f.dai, e18(1), U256::from(1u64), f.caller);

        let out = f.market.swap(&mut f.ledger, f.caller, &req).unwrap();

        assert_eq!(out, quoted);
        assert_eq!(f.ledger.balance_of(f.dai, f.caller).unwrap(), quoted);
        assert_eq!(f.ledger.balance_of(f.weth, f.caller).unwrap(), e18(9));
        for token in [f.weth, f.dai] {
            assert_eq!(f.ledger.balance_of(token, f.market.address()).unwrap(), U256::ZERO);
            assert_eq!(
                f.ledger.balance_of(token, f.market.venue().address()).unwrap(),
                U256::ZERO
            );
        }
        assert_eq!(
            f.ledger.allowance(f.weth, f.caller, f.market.address()).unwrap(),
            e18(9)
        );
    }

    #[test]
    fn test_slippage_reverts_transfer_in() {
        let mut f = setup();
        let req = SwapRequest::new(f.weth, f.dai, e18(1), U256::MAX, f.caller);

        let err = f.market.swap(&mut f.ledger, f.caller, &req).unwrap_err();

        assert!(matches!(err, RouterError::InsufficientOutputAmount { .. }));
        assert_eq!(f.ledger.balance_of(f.weth, f.caller).unwrap(), e18(10));
        assert_eq!(
            f.ledger.allowance(f.weth, f.caller, f.market.address()).unwrap(),
            e18(10)
        );
    }

    #[test]
    fn test_expired_deadline() {
        let mut f = setup();
        let now = f.ledger.timestamp();
        let req = SwapRequest::new(f.weth, f.dai, e18(1), U256::from(1u64), f.caller)
            .with_deadline(now - 1);

        let err = f.market.swap(&mut f.ledger, f.caller, &req).unwrap_err();
        assert_eq!(err, RouterError::DeadlineExpired { deadline: now - 1, now });
    }

    #[test]
    fn test_deadline_lapses_as_time_passes() {
        let mut f = setup();
        let deadline = f.ledger.timestamp() + 60;
        let req = SwapRequest::new(f.weth, f.dai, e18(1), U256::from(1u64), f.caller)
            .with_deadline(deadline);

        f.ledger.advance_time(61);

        let err = f.market.swap(&mut f.ledger, f.caller, &req).unwrap_err();
        assert_eq!(
            err,
            RouterError::DeadlineExpired {
                deadline,
                now: deadline + 1
            }
        );
        assert_eq!(f.ledger.balance_of(f.weth, f.caller).unwrap(), e18(10));
    }

    #[test]
    fn test_route_not_found() {
        let mut f = setup();
        let usdc = f.ledger.create_address("USDC");
        f.ledger.register_token(usdc, TokenMeta::standard("USDC", 6)).unwrap();
        let req = SwapRequest::new(f.weth, usdc, e18(1), U256::from(1u64), f.caller);

        let err = f.market.swap(&mut f.ledger, f.caller, &req).unwrap_err();
        assert!(matches!(err, RouterError::RouteNotFound { .. }));
    }

    #[test]
    fn test_missing_allowance_is_external_revert() {
        let mut f = setup();
        f.ledger
            .approve(f.weth, f.caller, f.market.address(), U256::ZERO)
            .unwrap();
        let req = SwapRequest::new(f.weth, f.dai, e18(1), U256::from(1u64), f.caller);

        let err = f.market.swap(&mut f.ledger, f.caller, &req).unwrap_err();
        assert!(matches!(err, RouterError::ExternalCallReverted(_)));
    }

    #[test]
    fn test_invalid_request_rejected_before_pull() {
        let mut f = setup();
        let req = SwapRequest::new(f.weth, f.weth, e18(1), U256::ZERO, f.caller);
        let err = f.market.swap(&mut f.ledger, f.caller, &req).unwrap_err();
        assert!(matches!(err, RouterError::InvalidRequest(_)));
    }

    #[test]
    fn test_venue_error_mapping() {
        let err: RouterError = VenueError::V2TooLittleReceived {
            min: U256::from(2u64),
            actual: U256::from(1u64),
        }
        .into();
        assert!(err.is_slippage());

        let err: RouterError = VenueError::InsufficientLiquidity.into();
        assert!(matches!(err, RouterError::ExternalCallReverted(_)));
    }
}
