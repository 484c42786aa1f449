//! Token Registry Types
//!
//! ERC20-shaped token state held by the ledger, plus the hook trait that
//! lets non-standard tokens run code on every transfer.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use alloy_primitives::{Address, U256};

use super::ledger::{Ledger, LedgerError};

/// Token flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Plain ERC20 balance/allowance/transfer semantics
    Standard,
    /// Canonical wrapped-native token with 1:1 deposit/withdraw
    WrappedNative,
}

/// Static token metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMeta {
    pub symbol: String,
    pub decimals: u8,
    pub kind: TokenKind,
}

impl TokenMeta {
    pub fn standard(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
            kind: TokenKind::Standard,
        }
    }

    pub fn wrapped_native(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            decimals: 18,
            kind: TokenKind::WrappedNative,
        }
    }

    pub fn is_wrapped_native(&self) -> bool {
        self.kind == TokenKind::WrappedNative
    }
}

/// A single balance movement handed to a [`TransferHook`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferInfo {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
}

/// Code that runs after a token's balances move.
///
/// Hooks get full mutable access to the ledger, so they can re-enter any
/// contract. Returning an error rejects the transfer and unwinds the
/// enclosing call frame.
pub trait TransferHook: fmt::Debug + Send + Sync {
    fn on_transfer(&self, ledger: &mut Ledger, transfer: TransferInfo) -> Result<(), LedgerError>;
}

/// Per-token storage
#[derive(Debug, Clone)]
pub struct TokenState {
    pub meta: TokenMeta,
    pub(crate) balances: HashMap<Address, U256>,
    pub(crate) allowances: HashMap<(Address, Address), U256>,
    pub(crate) total_supply: U256,
    pub(crate) hook: Option<Arc<dyn TransferHook>>,
}

impl TokenState {
    pub fn new(meta: TokenMeta, hook: Option<Arc<dyn TransferHook>>) -> Self {
        Self {
            meta,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            total_supply: U256::ZERO,
            hook,
        }
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }
}
