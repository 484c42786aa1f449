//! Ledger Events
//!
//! Append-only log entries emitted by tokens, the venue and the swapper.

use alloy_primitives::{Address, U256};
use serde::Serialize;

/// Event payloads recorded on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    /// ERC20 balance movement (mint uses the zero address as `from`)
    Transfer {
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    },
    Approval {
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    },
    /// Native currency wrapped 1:1
    Deposit {
        token: Address,
        account: Address,
        amount: U256,
    },
    Withdrawal {
        token: Address,
        account: Address,
        amount: U256,
    },
    /// Pool-level swap inside the liquidity venue
    #[serde(rename_all = "camelCase")]
    Swap {
        pool: Address,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        amount_out: U256,
    },
    /// A completed `swapEtherToToken` call
    #[serde(rename_all = "camelCase")]
    SwapCompleted {
        caller: Address,
        token_out: Address,
        amount_in: U256,
        amount_out: U256,
    },
    /// Owner swept a stuck balance; `token` is `None` for native currency
    Rescued {
        token: Option<Address>,
        to: Address,
        amount: U256,
    },
    Paused {
        by: Address,
    },
    Unpaused {
        by: Address,
    },
}

/// An event together with the address that emitted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Log {
    pub emitter: Address,
    #[serde(flatten)]
    pub event: Event,
}

impl Log {
    pub fn new(emitter: Address, event: Event) -> Self {
        Self { emitter, event }
    }

    /// True for the swapper's settlement event
    pub fn is_swap_completed(&self) -> bool {
        matches!(self.event, Event::SwapCompleted { .. })
    }
}
