//! Reentrancy Guard
//!
//! Scoped lock over a contract's `Entered` flag. The guard derefs to the
//! ledger so the guarded body keeps full access, and the flag is cleared
//! on drop whichever way the body exits.

use std::ops::{Deref, DerefMut};

use alloy_primitives::Address;

use super::ledger::{Flag, Ledger, LedgerError};

pub struct ReentrancyGuard<'a> {
    ledger: &'a mut Ledger,
    contract: Address,
}

impl<'a> ReentrancyGuard<'a> {
    /// Take the lock for `contract`, failing if a call into it is already running
    pub fn enter(ledger: &'a mut Ledger, contract: Address) -> Result<Self, LedgerError> {
        if !ledger.set_flag(contract, Flag::Entered) {
            tracing::warn!("Reentrant call into {} blocked", contract);
            return Err(LedgerError::Reentrancy(contract));
        }
        Ok(Self { ledger, contract })
    }
}

impl Deref for ReentrancyGuard<'_> {
    type Target = Ledger;

    fn deref(&self) -> &Ledger {
        self.ledger
    }
}

impl DerefMut for ReentrancyGuard<'_> {
    fn deref_mut(&mut self) -> &mut Ledger {
        self.ledger
    }
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        self.ledger.clear_flag(self.contract, Flag::Entered);
    }
}
