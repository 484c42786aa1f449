//! Market Router Port
//!
//! The one capability the swapper needs from a liquidity venue: sell an
//! exact amount of `token_in` and deliver at least `min_amount_out` of
//! `token_out` to a recipient, or revert.

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::domain::{Ledger, LedgerError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("Invalid swap request: {0}")]
    InvalidRequest(String),

    #[error("Insufficient output amount: minimum {min}, venue delivers {actual}")]
    InsufficientOutputAmount { min: U256, actual: U256 },

    #[error("Deadline {deadline} expired at {now}")]
    DeadlineExpired { deadline: u64, now: u64 },

    #[error("No route from {token_in} to {token_out}")]
    RouteNotFound { token_in: Address, token_out: Address },

    #[error("External call reverted: {0}")]
    ExternalCallReverted(String),
}

impl RouterError {
    /// Slippage-kind failures the caller may retry with a looser floor
    pub fn is_slippage(&self) -> bool {
        matches!(self, RouterError::InsufficientOutputAmount { .. })
    }
}

impl From<LedgerError> for RouterError {
    fn from(err: LedgerError) -> Self {
        RouterError::ExternalCallReverted(err.to_string())
    }
}

/// Exact-input swap instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub recipient: Address,
    /// Unix timestamp after which the swap must not execute; the router
    /// applies its own window when absent
    pub deadline: Option<u64>,
}

impl SwapRequest {
    pub fn new(
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        min_amount_out: U256,
        recipient: Address,
    ) -> Self {
        Self {
            token_in,
            token_out,
            amount_in,
            min_amount_out,
            recipient,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: u64) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Checks every router must apply before touching funds
    pub fn validate(&self) -> Result<(), RouterError> {
        if self.token_in == self.token_out {
            return Err(RouterError::InvalidRequest(
                "token_in and token_out must differ".to_string(),
            ));
        }
        if self.amount_in.is_zero() {
            return Err(RouterError::InvalidRequest(
                "amount_in must be > 0".to_string(),
            ));
        }
        if self.recipient == Address::ZERO {
            return Err(RouterError::InvalidRequest(
                "recipient cannot be the zero address".to_string(),
            ));
        }
        Ok(())
    }
}

/// Swap execution backend.
///
/// `caller` is the account that granted the allowance; the router pulls
/// `amount_in` from it, delivers the output to `request.recipient` and
/// returns the amount delivered. Implementations hold no funds between
/// calls.
#[cfg_attr(test, mockall::automock)]
pub trait MarketRouter: Send + Sync {
    /// On-ledger address the caller approves
    fn address(&self) -> Address;

    fn name(&self) -> &'static str;

    fn swap(
        &self,
        ledger: &mut Ledger,
        caller: Address,
        request: &SwapRequest,
    ) -> Result<U256, RouterError>;
}
