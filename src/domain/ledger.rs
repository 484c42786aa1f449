//! Ledger
//!
//! In-process world state: native balances, ERC20 token storage, contract
//! flags and the event log. Every external effect a contract has goes
//! through here, and [`Ledger::transact`] gives call frames their
//! all-or-nothing semantics by snapshotting state and restoring it when
//! the frame fails.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use alloy_primitives::{keccak256, Address, U256};
use thiserror::Error;

use super::events::{Event, Log};
use super::token::{TokenMeta, TokenState, TransferHook, TransferInfo};

/// Genesis block timestamp (2024-01-01T00:00:00Z)
pub const GENESIS_TIMESTAMP: u64 = 1_704_067_200;

/// Seconds between blocks when the chain advances
pub const BLOCK_TIME_SECS: u64 = 12;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Unknown token: {0}")]
    UnknownToken(Address),

    #[error("Token already registered at {0}")]
    TokenExists(Address),

    #[error("Token {0} is not a wrapped-native token")]
    NotWrappedNative(Address),

    #[error("Insufficient native balance for {account}: needed {needed}, available {available}")]
    InsufficientNativeBalance {
        account: Address,
        needed: U256,
        available: U256,
    },

    #[error("Insufficient balance of {token} for {account}: needed {needed}, available {available}")]
    InsufficientBalance {
        token: Address,
        account: Address,
        needed: U256,
        available: U256,
    },

    #[error("Insufficient allowance of {token} from {owner} to {spender}: needed {needed}, available {available}")]
    InsufficientAllowance {
        token: Address,
        owner: Address,
        spender: Address,
        needed: U256,
        available: U256,
    },

    #[error("Transfer rejected by token {token}: {reason}")]
    TransferRejected { token: Address, reason: String },

    #[error("Reentrant call into {0}")]
    Reentrancy(Address),

    #[error("Arithmetic overflow")]
    Overflow,
}

/// `msg.sender` and `msg.value` of a call frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub value: U256,
}

impl CallContext {
    pub fn new(caller: Address, value: U256) -> Self {
        Self { caller, value }
    }

    /// Non-payable call
    pub fn sender(caller: Address) -> Self {
        Self::new(caller, U256::ZERO)
    }
}

/// Boolean storage slots contracts keep on the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Reentrancy lock held
    Entered,
    /// Emergency pause engaged
    Paused,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    native: HashMap<Address, U256>,
    tokens: HashMap<Address, TokenState>,
    flags: HashSet<(Address, Flag)>,
    logs: Vec<Log>,
    block_number: u64,
    timestamp: u64,
    nonce: u64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(GENESIS_TIMESTAMP)
    }
}

impl Ledger {
    pub fn new(timestamp: u64) -> Self {
        Self {
            native: HashMap::new(),
            tokens: HashMap::new(),
            flags: HashSet::new(),
            logs: Vec::new(),
            block_number: 0,
            timestamp,
            nonce: 0,
        }
    }

    // ------------------------------------------------------------------
    // Frames
    // ------------------------------------------------------------------

    /// Run `f` atomically: keep its effects on `Ok`, discard them on `Err`.
    pub fn transact<T, E>(
        &mut self,
        f: impl FnOnce(&mut Ledger) -> Result<T, E>,
    ) -> Result<T, E> {
        let snapshot = self.clone();
        match f(self) {
            Ok(out) => Ok(out),
            Err(e) => {
                *self = snapshot;
                Err(e)
            }
        }
    }

    /// Call frame into `target`: attached value moves first, then `f` runs.
    pub fn call<T, E>(
        &mut self,
        ctx: CallContext,
        target: Address,
        f: impl FnOnce(&mut Ledger) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<LedgerError>,
    {
        self.transact(|ledger| {
            if !ctx.value.is_zero() {
                ledger.transfer_native(ctx.caller, target, ctx.value)?;
            }
            f(ledger)
        })
    }

    // ------------------------------------------------------------------
    // Chain metadata
    // ------------------------------------------------------------------

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Seal the current block and open the next one
    pub fn advance_block(&mut self) {
        self.block_number += 1;
        self.timestamp += BLOCK_TIME_SECS;
    }

    pub fn advance_time(&mut self, secs: u64) {
        self.timestamp += secs;
    }

    /// Derive a fresh deterministic address
    pub fn create_address(&mut self, label: &str) -> Address {
        self.nonce += 1;
        let mut preimage = label.as_bytes().to_vec();
        preimage.extend_from_slice(&self.nonce.to_be_bytes());
        Address::from_word(keccak256(&preimage))
    }

    // ------------------------------------------------------------------
    // Native currency
    // ------------------------------------------------------------------

    pub fn native_balance(&self, account: Address) -> U256 {
        self.native.get(&account).copied().unwrap_or_default()
    }

    /// Overwrite an account's native balance (harness helper)
    pub fn set_native_balance(&mut self, account: Address, amount: U256) {
        self.native.insert(account, amount);
    }

    pub fn transfer_native(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let available = self.native_balance(from);
        if available < amount {
            return Err(LedgerError::InsufficientNativeBalance {
                account: from,
                needed: amount,
                available,
            });
        }
        self.native.insert(from, available - amount);
        let credited = self
            .native_balance(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.native.insert(to, credited);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Token registry
    // ------------------------------------------------------------------

    pub fn register_token(&mut self, address: Address, meta: TokenMeta) -> Result<(), LedgerError> {
        self.install_token(address, TokenState::new(meta, None))
    }

    /// Register a token whose transfers run `hook`
    pub fn register_token_with_hook(
        &mut self,
        address: Address,
        meta: TokenMeta,
        hook: Arc<dyn TransferHook>,
    ) -> Result<(), LedgerError> {
        self.install_token(address, TokenState::new(meta, Some(hook)))
    }

    fn install_token(&mut self, address: Address, state: TokenState) -> Result<(), LedgerError> {
        if self.tokens.contains_key(&address) {
            return Err(LedgerError::TokenExists(address));
        }
        tracing::debug!("Registered token {} at {}", state.meta.symbol, address);
        self.tokens.insert(address, state);
        Ok(())
    }

    pub fn token(&self, address: Address) -> Result<&TokenState, LedgerError> {
        self.tokens
            .get(&address)
            .ok_or(LedgerError::UnknownToken(address))
    }

    fn token_mut(&mut self, address: Address) -> Result<&mut TokenState, LedgerError> {
        self.tokens
            .get_mut(&address)
            .ok_or(LedgerError::UnknownToken(address))
    }

    pub fn is_token(&self, address: Address) -> bool {
        self.tokens.contains_key(&address)
    }

    pub fn token_symbol(&self, address: Address) -> Option<&str> {
        self.tokens.get(&address).map(|t| t.meta.symbol.as_str())
    }

    // ------------------------------------------------------------------
    // ERC20 reads
    // ------------------------------------------------------------------

    pub fn balance_of(&self, token: Address, account: Address) -> Result<U256, LedgerError> {
        Ok(self.token(token)?.balance_of(account))
    }

    pub fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, LedgerError> {
        Ok(self.token(token)?.allowance(owner, spender))
    }

    pub fn total_supply(&self, token: Address) -> Result<U256, LedgerError> {
        Ok(self.token(token)?.total_supply())
    }

    // ------------------------------------------------------------------
    // ERC20 writes
    // ------------------------------------------------------------------

    /// `token.transfer(to, amount)` sent by `from`
    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let hook = self.token(token)?.hook.clone();
        match hook {
            Some(hook) => self.transact(|ledger| {
                ledger.move_tokens(token, from, to, amount)?;
                hook.on_transfer(ledger, TransferInfo { token, from, to, amount })
            }),
            None => self.move_tokens(token, from, to, amount),
        }
    }

    /// `token.transferFrom(from, to, amount)` sent by `spender`
    pub fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        self.transact(|ledger| {
            let available = ledger.allowance(token, from, spender)?;
            if available < amount {
                return Err(LedgerError::InsufficientAllowance {
                    token,
                    owner: from,
                    spender,
                    needed: amount,
                    available,
                });
            }
            // Infinite approvals are never decremented
            if available != U256::MAX {
                ledger
                    .token_mut(token)?
                    .allowances
                    .insert((from, spender), available - amount);
            }
            ledger.transfer(token, from, to, amount)
        })
    }

    /// `token.approve(spender, amount)` sent by `owner`
    pub fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let state = self.token_mut(token)?;
        if amount.is_zero() {
            state.allowances.remove(&(owner, spender));
        } else {
            state.allowances.insert((owner, spender), amount);
        }
        self.emit(
            token,
            Event::Approval {
                token,
                owner,
                spender,
                amount,
            },
        );
        Ok(())
    }

    /// Create new supply out of thin air (harness helper)
    pub fn mint(&mut self, token: Address, to: Address, amount: U256) -> Result<(), LedgerError> {
        let state = self.token_mut(token)?;
        state.total_supply = state
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let balance = state.balance_of(to);
        state.balances.insert(to, balance + amount);
        self.emit(
            token,
            Event::Transfer {
                token,
                from: Address::ZERO,
                to,
                amount,
            },
        );
        Ok(())
    }

    fn move_tokens(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let state = self.token_mut(token)?;
        let available = state.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                token,
                account: from,
                needed: amount,
                available,
            });
        }
        state.balances.insert(from, available - amount);
        // Total supply bounds every balance, so this cannot overflow
        let credited = state.balance_of(to) + amount;
        state.balances.insert(to, credited);
        self.emit(token, Event::Transfer { token, from, to, amount });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Wrapped native
    // ------------------------------------------------------------------

    /// `weth.deposit{value: amount}()` sent by `account`
    pub fn deposit(&mut self, weth: Address, account: Address, amount: U256) -> Result<(), LedgerError> {
        self.ensure_wrapped_native(weth)?;
        self.transact(|ledger| {
            ledger.transfer_native(account, weth, amount)?;
            let state = ledger.token_mut(weth)?;
            state.total_supply = state
                .total_supply
                .checked_add(amount)
                .ok_or(LedgerError::Overflow)?;
            let balance = state.balance_of(account);
            state.balances.insert(account, balance + amount);
            ledger.emit(
                weth,
                Event::Deposit {
                    token: weth,
                    account,
                    amount,
                },
            );
            Ok(())
        })
    }

    /// `weth.withdraw(amount)` sent by `account`
    pub fn withdraw(&mut self, weth: Address, account: Address, amount: U256) -> Result<(), LedgerError> {
        self.ensure_wrapped_native(weth)?;
        self.transact(|ledger| {
            let state = ledger.token_mut(weth)?;
            let available = state.balance_of(account);
            if available < amount {
                return Err(LedgerError::InsufficientBalance {
                    token: weth,
                    account,
                    needed: amount,
                    available,
                });
            }
            state.balances.insert(account, available - amount);
            state.total_supply -= amount;
            ledger.transfer_native(weth, account, amount)?;
            ledger.emit(
                weth,
                Event::Withdrawal {
                    token: weth,
                    account,
                    amount,
                },
            );
            Ok(())
        })
    }

    fn ensure_wrapped_native(&self, weth: Address) -> Result<(), LedgerError> {
        if self.token(weth)?.meta.is_wrapped_native() {
            Ok(())
        } else {
            Err(LedgerError::NotWrappedNative(weth))
        }
    }

    // ------------------------------------------------------------------
    // Contract flags
    // ------------------------------------------------------------------

    /// Set a flag; returns false if it was already set
    pub fn set_flag(&mut self, contract: Address, flag: Flag) -> bool {
        self.flags.insert((contract, flag))
    }

    pub fn clear_flag(&mut self, contract: Address, flag: Flag) {
        self.flags.remove(&(contract, flag));
    }

    pub fn has_flag(&self, contract: Address, flag: Flag) -> bool {
        self.flags.contains(&(contract, flag))
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn emit(&mut self, emitter: Address, event: Event) {
        self.logs.push(Log::new(emitter, event));
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Logs appended after position `start`
    pub fn logs_since(&self, start: usize) -> &[Log] {
        self.logs.get(start..).unwrap_or_default()
    }

    pub fn log_count(&self) -> usize {
        self.logs.len()
    }
}
