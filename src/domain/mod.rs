//! Domain Layer - Ledger substrate the contracts execute on
//!
//! Pure state and rules with no knowledge of routers or venues:
//! - `ledger`: native balances, ERC20 storage, flags, events, atomic frames
//! - `token`: token metadata and transfer hooks
//! - `events`: event log payloads
//! - `reentrancy`: scoped single-call lock
//! - `units`: decimal <-> base unit conversion

pub mod events;
pub mod ledger;
pub mod reentrancy;
pub mod token;
pub mod units;

pub use events::{Event, Log};
pub use ledger::{CallContext, Flag, Ledger, LedgerError, BLOCK_TIME_SECS, GENESIS_TIMESTAMP};
pub use reentrancy::ReentrancyGuard;
pub use token::{TokenKind, TokenMeta, TokenState, TransferHook, TransferInfo};
pub use units::{format_units, to_base_units, UnitsError, NATIVE_DECIMALS};
