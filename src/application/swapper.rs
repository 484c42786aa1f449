//! ERC20 Swapper
//!
//! Accepts native currency, wraps it, sells the wrapped balance through a
//! `MarketRouter` and forwards the proceeds to the caller in the same
//! atomic call. Nothing is custodied between calls.

use std::fmt;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::domain::{CallContext, Event, Flag, Ledger, LedgerError, ReentrancyGuard};
use crate::ports::{MarketRouter, RouterError, SwapRequest};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SwapperError {
    #[error("Invalid constructor argument: {0}")]
    InvalidConstructorArgument(String),

    #[error("Swap requires a non-zero value")]
    ZeroValueSwap,

    #[error("Invalid output token: {0}")]
    InvalidTokenOut(Address),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(Address),

    #[error("Slippage exceeded: minimum {min}, received {received}")]
    SlippageExceeded { min: U256, received: U256 },

    #[error("Router call failed: {0}")]
    RouterCallFailed(#[source] RouterError),

    #[error("Failed to wrap native currency: {0}")]
    WrapFailed(#[source] LedgerError),

    #[error("Token transfer failed: {0}")]
    TokenTransferFailed(#[source] LedgerError),

    #[error("Caller {caller} is not the owner")]
    Unauthorized { caller: Address },

    #[error("Function is not payable: {value} attached")]
    NonPayable { value: U256 },

    #[error("Swapper is paused")]
    Paused,

    #[error("Reentrant call rejected")]
    Reentrancy,

    #[error("Ledger error: {0}")]
    Ledger(#[source] LedgerError),
}

impl From<LedgerError> for SwapperError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Reentrancy(_) => SwapperError::Reentrancy,
            other => SwapperError::Ledger(other),
        }
    }
}

impl SwapperError {
    /// The venue could not meet the caller's floor
    pub fn is_slippage(&self) -> bool {
        match self {
            SwapperError::SlippageExceeded { .. } => true,
            SwapperError::RouterCallFailed(e) => e.is_slippage(),
            _ => false,
        }
    }

    /// Rejected on local checks before any external interaction
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SwapperError::InvalidConstructorArgument(_)
                | SwapperError::ZeroValueSwap
                | SwapperError::InvalidTokenOut(_)
                | SwapperError::InvalidRecipient(_)
                | SwapperError::NonPayable { .. }
        )
    }
}

pub struct Erc20Swapper {
    address: Address,
    owner: Address,
    wrapped_native: Address,
    router: Arc<dyn MarketRouter>,
}

impl fmt::Debug for Erc20Swapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Erc20Swapper")
            .field("address", &self.address)
            .field("owner", &self.owner)
            .field("wrapped_native", &self.wrapped_native)
            .field("router", &self.router.address())
            .finish()
    }
}

impl Erc20Swapper {
    /// Deploy a swapper; configuration is fixed for its lifetime
    pub fn deploy(
        ledger: &mut Ledger,
        owner: Address,
        wrapped_native: Address,
        router: Arc<dyn MarketRouter>,
    ) -> Result<Self, SwapperError> {
        if owner == Address::ZERO {
            return Err(SwapperError::InvalidConstructorArgument(
                "owner cannot be the zero address".to_string(),
            ));
        }
        if wrapped_native == Address::ZERO {
            return Err(SwapperError::InvalidConstructorArgument(
                "wrapped native token cannot be the zero address".to_string(),
            ));
        }
        if router.address() == Address::ZERO {
            return Err(SwapperError::InvalidConstructorArgument(
                "router cannot be the zero address".to_string(),
            ));
        }
        match ledger.token(wrapped_native) {
            Ok(token) if token.meta.is_wrapped_native() => {}
            _ => {
                return Err(SwapperError::InvalidConstructorArgument(format!(
                    "{} is not a wrapped native token",
                    wrapped_native
                )))
            }
        }

        let address = ledger.create_address("ERC20Swapper");
        tracing::info!(
            "ERC20Swapper deployed to {} (owner {}, router {} at {})",
            address,
            owner,
            router.name(),
            router.address()
        );
        Ok(Self {
            address,
            owner,
            wrapped_native,
            router,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn wrapped_native(&self) -> Address {
        self.wrapped_native
    }

    pub fn router_address(&self) -> Address {
        self.router.address()
    }

    pub fn is_paused(&self, ledger: &Ledger) -> bool {
        ledger.has_flag(self.address, Flag::Paused)
    }

    /// `swapEtherToToken(tokenOut, minAmountOut)` with `ctx.value` attached.
    ///
    /// The attached value must already sit in this contract's native
    /// balance (see [`Ledger::call`]). Returns the amount delivered.
    pub fn swap_ether_to_token(
        &self,
        ledger: &mut Ledger,
        ctx: CallContext,
        token_out: Address,
        min_amount_out: U256,
    ) -> Result<U256, SwapperError> {
        let mut ledger = ReentrancyGuard::enter(ledger, self.address)?;
        ledger.transact(|ledger| self.settle(ledger, ctx, token_out, min_amount_out))
    }

    fn settle(
        &self,
        ledger: &mut Ledger,
        ctx: CallContext,
        token_out: Address,
        min_amount_out: U256,
    ) -> Result<U256, SwapperError> {
        if self.is_paused(ledger) {
            return Err(SwapperError::Paused);
        }
        let amount_in = ctx.value;
        if amount_in.is_zero() {
            return Err(SwapperError::ZeroValueSwap);
        }
        if token_out == Address::ZERO
            || token_out == self.wrapped_native
            || !ledger.is_token(token_out)
        {
            return Err(SwapperError::InvalidTokenOut(token_out));
        }

        let weth = self.wrapped_native;
        let router = self.router.address();

        ledger
            .deposit(weth, self.address, amount_in)
            .map_err(SwapperError::WrapFailed)?;

        // Some tokens refuse to overwrite a live allowance
        if !ledger.allowance(weth, self.address, router)?.is_zero() {
            ledger.approve(weth, self.address, router, U256::ZERO)?;
        }
        ledger.approve(weth, self.address, router, amount_in)?;

        let balance_before = ledger.balance_of(token_out, self.address)?;
        let request = SwapRequest::new(weth, token_out, amount_in, min_amount_out, self.address);
        let reported = self
            .router
            .swap(ledger, self.address, &request)
            .map_err(SwapperError::RouterCallFailed)?;

        let received = ledger
            .balance_of(token_out, self.address)?
            .saturating_sub(balance_before);
        if reported != received {
            tracing::warn!(
                "Router {} reported {} out but balance moved by {}",
                self.router.name(),
                reported,
                received
            );
        }
        if received < min_amount_out {
            return Err(SwapperError::SlippageExceeded {
                min: min_amount_out,
                received,
            });
        }

        if !ledger.allowance(weth, self.address, router)?.is_zero() {
            ledger.approve(weth, self.address, router, U256::ZERO)?;
        }

        ledger
            .transfer(token_out, self.address, ctx.caller, received)
            .map_err(SwapperError::TokenTransferFailed)?;

        ledger.emit(
            self.address,
            Event::SwapCompleted {
                caller: ctx.caller,
                token_out,
                amount_in,
                amount_out: received,
            },
        );
        tracing::info!(
            "Swapped {} {} for {} {} (caller {})",
            amount_in,
            ledger.token_symbol(weth).unwrap_or("?"),
            received,
            ledger.token_symbol(token_out).unwrap_or("?"),
            ctx.caller
        );
        Ok(received)
    }

    // ------------------------------------------------------------------
    // Owner operations
    // ------------------------------------------------------------------

    /// Admin entry points are non-payable and owner-only
    fn only_owner(&self, ctx: CallContext) -> Result<(), SwapperError> {
        if !ctx.value.is_zero() {
            return Err(SwapperError::NonPayable { value: ctx.value });
        }
        if ctx.caller != self.owner {
            tracing::warn!("Unauthorized admin call from {}", ctx.caller);
            return Err(SwapperError::Unauthorized { caller: ctx.caller });
        }
        Ok(())
    }

    /// Sweep this contract's whole balance of `token` to `to`
    pub fn rescue_token(
        &self,
        ledger: &mut Ledger,
        ctx: CallContext,
        token: Address,
        to: Address,
    ) -> Result<U256, SwapperError> {
        self.only_owner(ctx)?;
        if to == Address::ZERO {
            return Err(SwapperError::InvalidRecipient(to));
        }
        let mut ledger = ReentrancyGuard::enter(ledger, self.address)?;
        ledger.transact(|ledger| {
            let amount = ledger.balance_of(token, self.address)?;
            if !amount.is_zero() {
                ledger
                    .transfer(token, self.address, to, amount)
                    .map_err(SwapperError::TokenTransferFailed)?;
            }
            ledger.emit(
                self.address,
                Event::Rescued {
                    token: Some(token),
                    to,
                    amount,
                },
            );
            tracing::info!("Rescued {} of {} to {}", amount, token, to);
            Ok(amount)
        })
    }

    /// Sweep this contract's whole native balance to `to`
    pub fn rescue_native(
        &self,
        ledger: &mut Ledger,
        ctx: CallContext,
        to: Address,
    ) -> Result<U256, SwapperError> {
        self.only_owner(ctx)?;
        if to == Address::ZERO {
            return Err(SwapperError::InvalidRecipient(to));
        }
        let mut ledger = ReentrancyGuard::enter(ledger, self.address)?;
        ledger.transact(|ledger| {
            let amount = ledger.native_balance(self.address);
            if !amount.is_zero() {
                ledger.transfer_native(self.address, to, amount)?;
            }
            ledger.emit(
                self.address,
                Event::Rescued {
                    token: None,
                    to,
                    amount,
                },
            );
            tracing::info!("Rescued {} native to {}", amount, to);
            Ok(amount)
        })
    }

    pub fn pause(&self, ledger: &mut Ledger, ctx: CallContext) -> Result<(), SwapperError> {
        self.only_owner(ctx)?;
        if ledger.set_flag(self.address, Flag::Paused) {
            ledger.emit(self.address, Event::Paused { by: ctx.caller });
            tracing::warn!("ERC20Swapper {} paused by {}", self.address, ctx.caller);
        }
        Ok(())
    }

    pub fn unpause(&self, ledger: &mut Ledger, ctx: CallContext) -> Result<(), SwapperError> {
        self.only_owner(ctx)?;
        if ledger.has_flag(self.address, Flag::Paused) {
            ledger.clear_flag(self.address, Flag::Paused);
            ledger.emit(self.address, Event::Unpaused { by: ctx.caller });
            tracing::info!("ERC20Swapper {} unpaused by {}", self.address, ctx.caller);
        }
        Ok(())
    }
}
