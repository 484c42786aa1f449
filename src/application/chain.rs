//! Chain
//!
//! Async front door to the ledger. Concurrent submissions are serialized
//! through a single lock, so every transaction observes the complete
//! effects of the ones ordered before it.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use serde::Serialize;
use tokio::sync::Mutex;

use super::swapper::{Erc20Swapper, SwapperError};
use crate::domain::{CallContext, Ledger, LedgerError, Log};

/// Outcome of a mined transaction
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt<T> {
    pub block_number: u64,
    pub timestamp: u64,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub logs: Vec<Log>,
    pub output: T,
}

#[derive(Debug, Clone)]
pub struct Chain {
    ledger: Arc<Mutex<Ledger>>,
}

impl Chain {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Mine one transaction from `from` to `to` carrying `value`.
    ///
    /// Each submission opens a new block. A failed transaction leaves no
    /// state behind apart from the block it consumed.
    pub async fn submit<T, E, F>(
        &self,
        from: Address,
        to: Address,
        value: U256,
        f: F,
    ) -> Result<Receipt<T>, E>
    where
        F: FnOnce(&mut Ledger, CallContext) -> Result<T, E>,
        E: From<LedgerError>,
    {
        let mut ledger = self.ledger.lock().await;
        ledger.advance_block();
        let block_number = ledger.block_number();
        let timestamp = ledger.timestamp();
        let start = ledger.log_count();
        let ctx = CallContext::new(from, value);

        let output = ledger.call(ctx, to, |ledger| f(ledger, ctx))?;

        tracing::debug!(
            "Mined block {} ({} -> {}, value {})",
            block_number,
            from,
            to,
            value
        );
        Ok(Receipt {
            block_number,
            timestamp,
            from,
            to,
            value,
            logs: ledger.logs_since(start).to_vec(),
            output,
        })
    }

    /// `swapEtherToToken` sent by `from` with `value` attached
    pub async fn swap_ether_to_token(
        &self,
        swapper: &Erc20Swapper,
        from: Address,
        value: U256,
        token_out: Address,
        min_amount_out: U256,
    ) -> Result<Receipt<U256>, SwapperError> {
        let result = self
            .submit(from, swapper.address(), value, |ledger, ctx| {
                swapper.swap_ether_to_token(ledger, ctx, token_out, min_amount_out)
            })
            .await;
        if let Err(e) = &result {
            tracing::warn!("swapEtherToToken from {} reverted: {}", from, e);
        }
        result
    }

    /// Read-only access at the latest state
    pub async fn view<T>(&self, f: impl FnOnce(&Ledger) -> T) -> T {
        let ledger = self.ledger.lock().await;
        f(&ledger)
    }

    /// Direct state manipulation outside any transaction (harness only)
    pub async fn with_ledger<T>(&self, f: impl FnOnce(&mut Ledger) -> T) -> T {
        let mut ledger = self.ledger.lock().await;
        f(&mut ledger)
    }

    pub async fn block_number(&self) -> u64 {
        self.view(Ledger::block_number).await
    }
}
