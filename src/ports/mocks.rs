use std::sync::{Arc, Mutex, PoisonError};

use alloy_primitives::{Address, U256};

use super::market_router::{MarketRouter, RouterError, SwapRequest};
use crate::domain::Ledger;

/// How [`MockRouter`] answers a swap
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Deliver `amount_in * numerator / denominator` and honour the floor
    Rate { numerator: u64, denominator: u64 },
    /// Pull the input, then fail with this error
    Revert(RouterError),
    /// Deliver a fixed amount regardless of the floor while reporting
    /// `min_amount_out` as the delivered amount
    Underdeliver { delivered: U256 },
}

/// Mock market router that records calls and settles against the ledger.
///
/// Input is pulled from the caller into `sink`; output is minted to the
/// recipient, so the output token must be registered on the ledger.
#[derive(Debug, Clone)]
pub struct MockRouter {
    address: Address,
    sink: Address,
    behavior: MockBehavior,
    calls: Arc<Mutex<Vec<SwapRequest>>>,
}

impl MockRouter {
    pub fn new(address: Address, sink: Address) -> Self {
        Self {
            address,
            sink,
            behavior: MockBehavior::Rate {
                numerator: 1,
                denominator: 1,
            },
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Builder method to set the swap behaviour
    pub fn with_behavior(mut self, behavior: MockBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<SwapRequest> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl MarketRouter for MockRouter {
    fn address(&self) -> Address {
        self.address
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn swap(
        &self,
        ledger: &mut Ledger,
        caller: Address,
        request: &SwapRequest,
    ) -> Result<U256, RouterError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        request.validate()?;

        ledger.transfer_from(
            request.token_in,
            self.address,
            caller,
            self.sink,
            request.amount_in,
        )?;

        match &self.behavior {
            MockBehavior::Rate {
                numerator,
                denominator,
            } => {
                let out = request.amount_in * U256::from(*numerator)
                    / U256::from((*denominator).max(1));
                if out < request.min_amount_out {
                    return Err(RouterError::InsufficientOutputAmount {
                        min: request.min_amount_out,
                        actual: out,
                    });
                }
                ledger.mint(request.token_out, request.recipient, out)?;
                Ok(out)
            }
            MockBehavior::Revert(err) => Err(err.clone()),
            MockBehavior::Underdeliver { delivered } => {
                ledger.mint(request.token_out, request.recipient, *delivered)?;
                Ok(request.min_amount_out)
            }
        }
    }
}
