//! Universal Router Venue
//!
//! On-ledger stand-in for Uniswap's Universal Router over constant-product
//! (V2-style) pools. Pools are plain ledger accounts holding both reserves;
//! `execute` decodes command calldata and settles against them.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use thiserror::Error;

use super::commands::{
    Command, CommandError, ExecuteCall, ADDRESS_THIS, COMMAND_TYPE_MASK, CONTRACT_BALANCE,
    FLAG_ALLOW_REVERT, MSG_SENDER,
};
use crate::domain::{CallContext, Event, Ledger, LedgerError};

/// Default pool fee: 0.30%
pub const DEFAULT_FEE_BPS: u16 = 30;

const BPS_DENOMINATOR: u64 = 10_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VenueError {
    #[error("Transaction deadline {deadline} passed at {now}")]
    TransactionDeadlinePassed { deadline: u64, now: u64 },

    #[error("Command/input length mismatch: {commands} commands, {inputs} inputs")]
    LengthMismatch { commands: usize, inputs: usize },

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("No pair for {token_a} / {token_b}")]
    PairNotFound { token_a: Address, token_b: Address },

    #[error("Pair already exists for {token_a} / {token_b}")]
    PairExists { token_a: Address, token_b: Address },

    #[error("Invalid swap path")]
    InvalidPath,

    #[error("Too little received: minimum {min}, got {actual}")]
    V2TooLittleReceived { min: U256, actual: U256 },

    #[error("Insufficient {token} held by router: minimum {min}, available {available}")]
    InsufficientToken {
        token: Address,
        min: U256,
        available: U256,
    },

    #[error("Insufficient input amount")]
    InsufficientInputAmount,

    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    #[error("Pool fee {0} bps exceeds 100%")]
    InvalidFee(u16),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// A constant-product pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pool {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
}

impl Pool {
    pub fn contains(&self, token: Address) -> bool {
        self.token0 == token || self.token1 == token
    }
}

fn pair_key(a: Address, b: Address) -> (Address, Address) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Wrapped native reserves stay backed by native currency
fn seed(ledger: &mut Ledger, token: Address, pool: Address, amount: U256) -> Result<(), LedgerError> {
    if ledger.token(token)?.meta.is_wrapped_native() {
        let funded = ledger
            .native_balance(pool)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        ledger.set_native_balance(pool, funded);
        ledger.deposit(token, pool, amount)
    } else {
        ledger.mint(token, pool, amount)
    }
}

/// Output of an exact-input constant-product swap after fees
pub fn get_amount_out(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
    fee_bps: u16,
) -> Result<U256, VenueError> {
    if amount_in.is_zero() {
        return Err(VenueError::InsufficientInputAmount);
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(VenueError::InsufficientLiquidity);
    }

    let fee_factor = BPS_DENOMINATOR
        .checked_sub(u64::from(fee_bps))
        .map(U256::from)
        .ok_or(VenueError::InvalidFee(fee_bps))?;
    let amount_in_with_fee = amount_in
        .checked_mul(fee_factor)
        .ok_or(VenueError::Overflow)?;
    let numerator = amount_in_with_fee
        .checked_mul(reserve_out)
        .ok_or(VenueError::Overflow)?;
    let denominator = reserve_in
        .checked_mul(U256::from(BPS_DENOMINATOR))
        .and_then(|r| r.checked_add(amount_in_with_fee))
        .ok_or(VenueError::Overflow)?;

    Ok(numerator / denominator)
}

#[derive(Debug, Clone)]
pub struct UniversalRouter {
    address: Address,
    fee_bps: u16,
    pools: HashMap<(Address, Address), Pool>,
}

impl UniversalRouter {
    pub fn new(address: Address, fee_bps: u16) -> Self {
        Self {
            address,
            fee_bps,
            pools: HashMap::new(),
        }
    }

    /// Derive an address on the ledger and create an empty router there
    pub fn deploy(ledger: &mut Ledger, fee_bps: u16) -> Self {
        let address = ledger.create_address("UniversalRouter");
        tracing::info!("UniversalRouter deployed to {} (fee {} bps)", address, fee_bps);
        Self::new(address, fee_bps)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn fee_bps(&self) -> u16 {
        self.fee_bps
    }

    /// Create a pair between two registered tokens
    pub fn create_pool(
        &mut self,
        ledger: &mut Ledger,
        token_a: Address,
        token_b: Address,
    ) -> Result<Pool, VenueError> {
        if token_a == token_b {
            return Err(VenueError::InvalidPath);
        }
        ledger.token(token_a)?;
        ledger.token(token_b)?;

        let key = pair_key(token_a, token_b);
        if self.pools.contains_key(&key) {
            return Err(VenueError::PairExists { token_a, token_b });
        }

        let pool = Pool {
            address: ledger.create_address("UniswapV2Pair"),
            token0: key.0,
            token1: key.1,
        };
        self.pools.insert(key, pool);
        tracing::debug!(
            "Created pool {} for {} / {}",
            pool.address,
            ledger.token_symbol(token_a).unwrap_or("?"),
            ledger.token_symbol(token_b).unwrap_or("?")
        );
        Ok(pool)
    }

    /// Seed a pair with reserves (credited straight to the pool)
    pub fn add_liquidity(
        &self,
        ledger: &mut Ledger,
        token_a: Address,
        token_b: Address,
        amount_a: U256,
        amount_b: U256,
    ) -> Result<(), VenueError> {
        let pool = self.require_pool(token_a, token_b)?;
        seed(ledger, token_a, pool.address, amount_a)?;
        seed(ledger, token_b, pool.address, amount_b)?;
        Ok(())
    }

    pub fn pool(&self, token_a: Address, token_b: Address) -> Option<&Pool> {
        self.pools.get(&pair_key(token_a, token_b))
    }

    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    fn require_pool(&self, token_a: Address, token_b: Address) -> Result<Pool, VenueError> {
        self.pool(token_a, token_b)
            .copied()
            .ok_or(VenueError::PairNotFound { token_a, token_b })
    }

    /// `(reserve_in, reserve_out)` of the pair for a swap selling `token_in`
    pub fn reserves(
        &self,
        ledger: &Ledger,
        token_in: Address,
        token_out: Address,
    ) -> Result<(U256, U256), VenueError> {
        let pool = self.require_pool(token_in, token_out)?;
        Ok((
            ledger.balance_of(token_in, pool.address)?,
            ledger.balance_of(token_out, pool.address)?,
        ))
    }

    /// Per-hop amounts along `path`, starting with `amount_in`
    pub fn amounts_out(
        &self,
        ledger: &Ledger,
        path: &[Address],
        amount_in: U256,
    ) -> Result<Vec<U256>, VenueError> {
        if path.len() < 2 {
            return Err(VenueError::InvalidPath);
        }
        let mut amounts = Vec::with_capacity(path.len());
        amounts.push(amount_in);
        for hop in path.windows(2) {
            let (reserve_in, reserve_out) = self.reserves(ledger, hop[0], hop[1])?;
            let last = amounts[amounts.len() - 1];
            amounts.push(get_amount_out(last, reserve_in, reserve_out, self.fee_bps)?);
        }
        Ok(amounts)
    }

    /// Read-only quote for an exact-input swap
    pub fn quote_exact_input(
        &self,
        ledger: &Ledger,
        path: &[Address],
        amount_in: U256,
    ) -> Result<U256, VenueError> {
        let amounts = self.amounts_out(ledger, path, amount_in)?;
        Ok(amounts[amounts.len() - 1])
    }

    /// `execute(commands, inputs, deadline)` sent by `ctx.caller`
    pub fn execute(
        &self,
        ledger: &mut Ledger,
        ctx: CallContext,
        calldata: &[u8],
    ) -> Result<(), VenueError> {
        let call = ExecuteCall::decode(calldata)?;

        let now = ledger.timestamp();
        if U256::from(now) > call.deadline {
            return Err(VenueError::TransactionDeadlinePassed {
                deadline: u64::try_from(call.deadline).unwrap_or(u64::MAX),
                now,
            });
        }
        if call.commands.len() != call.inputs.len() {
            return Err(VenueError::LengthMismatch {
                commands: call.commands.len(),
                inputs: call.inputs.len(),
            });
        }

        ledger.call(ctx, self.address, |ledger| {
            for (byte, input) in call.commands.iter().zip(call.inputs.iter()) {
                let command_type = byte & COMMAND_TYPE_MASK;
                let result: Result<(), VenueError> = ledger.transact(|ledger| {
                    let command = Command::decode(command_type, input)?;
                    self.dispatch(ledger, ctx, command)
                });
                if let Err(e) = result {
                    if byte & FLAG_ALLOW_REVERT == 0 {
                        return Err(e);
                    }
                    tracing::warn!("Command {:#04x} reverted (allowed): {}", command_type, e);
                }
            }
            Ok(())
        })
    }

    fn map_recipient(&self, ctx: CallContext, recipient: Address) -> Address {
        if recipient == MSG_SENDER {
            ctx.caller
        } else if recipient == ADDRESS_THIS {
            self.address
        } else {
            recipient
        }
    }

    fn dispatch(
        &self,
        ledger: &mut Ledger,
        ctx: CallContext,
        command: Command,
    ) -> Result<(), VenueError> {
        match command {
            Command::V2SwapExactIn {
                recipient,
                amount_in,
                amount_out_min,
                path,
                payer_is_user,
            } => {
                let recipient = self.map_recipient(ctx, recipient);
                self.v2_swap_exact_in(
                    ledger,
                    ctx,
                    recipient,
                    amount_in,
                    amount_out_min,
                    &path,
                    payer_is_user,
                )
            }
            Command::Sweep {
                token,
                recipient,
                amount_min,
            } => {
                let recipient = self.map_recipient(ctx, recipient);
                let available = ledger.balance_of(token, self.address)?;
                if available < amount_min {
                    return Err(VenueError::InsufficientToken {
                        token,
                        min: amount_min,
                        available,
                    });
                }
                if !available.is_zero() {
                    ledger.transfer(token, self.address, recipient, available)?;
                }
                Ok(())
            }
            Command::Transfer {
                token,
                recipient,
                value,
            } => {
                let recipient = self.map_recipient(ctx, recipient);
                ledger.transfer(token, self.address, recipient, value)?;
                Ok(())
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn v2_swap_exact_in(
        &self,
        ledger: &mut Ledger,
        ctx: CallContext,
        recipient: Address,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        payer_is_user: bool,
    ) -> Result<(), VenueError> {
        if path.len() < 2 {
            return Err(VenueError::InvalidPath);
        }
        let token_in = path[0];
        let token_out = path[path.len() - 1];

        let amount_in = if amount_in == CONTRACT_BALANCE {
            ledger.balance_of(token_in, self.address)?
        } else {
            amount_in
        };

        // Amounts are fixed against reserves before any input lands in a pool
        let amounts = self.amounts_out(ledger, path, amount_in)?;
        let first_pool = self.require_pool(path[0], path[1])?;

        if payer_is_user {
            ledger.transfer_from(token_in, self.address, ctx.caller, first_pool.address, amount_in)?;
        } else {
            ledger.transfer(token_in, self.address, first_pool.address, amount_in)?;
        }

        let balance_before = ledger.balance_of(token_out, recipient)?;

        for (i, hop) in path.windows(2).enumerate() {
            let pool = self.require_pool(hop[0], hop[1])?;
            let to = match path.get(i + 2) {
                Some(next) => self.require_pool(hop[1], *next)?.address,
                None => recipient,
            };
            ledger.transfer(hop[1], pool.address, to, amounts[i + 1])?;
            ledger.emit(
                pool.address,
                Event::Swap {
                    pool: pool.address,
                    token_in: hop[0],
                    token_out: hop[1],
                    amount_in: amounts[i],
                    amount_out: amounts[i + 1],
                },
            );
        }

        let received = ledger
            .balance_of(token_out, recipient)?
            .saturating_sub(balance_before);
        if received < amount_out_min {
            return Err(VenueError::V2TooLittleReceived {
                min: amount_out_min,
                actual: received,
            });
        }
        tracing::debug!(
            "V2 exact-in: {} in, {} out to {}",
            amount_in,
            received,
            recipient
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::commands::RoutePlanner;
    use super::*;
    use crate::domain::TokenMeta;

    fn e18(n: u64) -> U256 {
        U256::from(n) * U256::from(1_000_000_000_000_000_000u64)
    }

    struct Fixture {
        ledger: Ledger,
        venue: UniversalRouter,
        weth: Address,
        dai: Address,
        trader: Address,
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

        let trader = ledger.create_address("trader");
        Fixture {
            ledger,
            venue,
            weth,
            dai,
            trader,
        }
    }

    #[test]
    fn test_get_amount_out_matches_v2_formula() {
        // 1 in against 100/250_000 at 0.3%: 997 * 250000 / (100 * 1000 + 997)
        let out = get_amount_out(e18(1), e18(100), e18(250_000), 30).unwrap();
        let expected = e18(1) * U256::from(9970u64) * e18(250_000)
            / (e18(100) * U256::from(10_000u64) + e18(1) * U256::from(9970u64));
        assert_eq!(out, expected);
        assert!(out < e18(2500));
    }

    #[test]
    fn test_get_amount_out_edge_cases() {
        assert_eq!(
            get_amount_out(U256::ZERO, e18(1), e18(1), 30),
            Err(VenueError::InsufficientInputAmount)
        );
        assert_eq!(
            get_amount_out(e18(1), U256::ZERO, e18(1), 30),
            Err(VenueError::InsufficientLiquidity)
        );
    }

    #[test]
    fn test_fee_above_denominator_is_an_error() {
        assert_eq!(
            get_amount_out(e18(1), e18(1), e18(1), 10_001),
            Err(VenueError::InvalidFee(10_001))
        );

        let mut f = setup();
        let mut venue = UniversalRouter::new(Address::repeat_byte(9), 20_000);
        venue.create_pool(&mut f.ledger, f.weth, f.dai).unwrap();
        venue
            .add_liquidity(&mut f.ledger, f.weth, f.dai, e18(1), e18(1))
            .unwrap();
        assert_eq!(
            venue.quote_exact_input(&f.ledger, &[f.weth, f.dai], e18(1)),
            Err(VenueError::InvalidFee(20_000))
        );
    }

    #[test]
    fn test_duplicate_pool_rejected() {
        let mut f = setup();
        let err = f.venue.create_pool(&mut f.ledger, f.dai, f.weth).unwrap_err();
        assert!(matches!(err, VenueError::PairExists { .. }));
    }

    #[test]
    fn test_execute_swap_and_sweep() {
        let mut f = setup();
        let quoted = f
            .venue
            .quote_exact_input(&f.ledger, &[f.weth, f.dai], e18(1))
            .unwrap();
        f.ledger.set_native_balance(f.trader, e18(1));
        f.ledger.deposit(f.weth, f.trader, e18(1)).unwrap();
        f.ledger
            .transfer(f.weth, f.trader, f.venue.address(), e18(1))
            .unwrap();

        let calldata = RoutePlanner::new()
            .add(Command::V2SwapExactIn {
                recipient: ADDRESS_THIS,
                amount_in: CONTRACT_BALANCE,
                amount_out_min: U256::from(1u64),
                path: vec![f.weth, f.dai],
                payer_is_user: false,
            })
            .add(Command::Sweep {
                token: f.dai,
                recipient: MSG_SENDER,
                amount_min: U256::from(1u64),
            })
            .calldata(f.ledger.timestamp() + 60);

        f.venue
            .execute(&mut f.ledger, CallContext::sender(f.trader), &calldata)
            .unwrap();

        assert_eq!(f.ledger.balance_of(f.dai, f.trader).unwrap(), quoted);
        assert_eq!(
            f.ledger.balance_of(f.dai, f.venue.address()).unwrap(),
            U256::ZERO
        );
        assert_eq!(
            f.ledger.balance_of(f.weth, f.venue.address()).unwrap(),
            U256::ZERO
        );
        let (reserve_weth, _) = f.venue.reserves(&f.ledger, f.weth, f.dai).unwrap();
        assert_eq!(reserve_weth, e18(101));
    }

    #[test]
    fn test_too_little_received_reverts_everything() {
        let mut f = setup();
        f.ledger.set_native_balance(f.trader, e18(1));
        f.ledger.deposit(f.weth, f.trader, e18(1)).unwrap();
        f.ledger
            .transfer(f.weth, f.trader, f.venue.address(), e18(1))
            .unwrap();

        let calldata = RoutePlanner::new()
            .add(Command::V2SwapExactIn {
                recipient: MSG_SENDER,
                amount_in: e18(1),
                amount_out_min: U256::MAX,
                path: vec![f.weth, f.dai],
                payer_is_user: false,
            })
            .calldata(f.ledger.timestamp() + 60);

        let err = f
            .venue
            .execute(&mut f.ledger, CallContext::sender(f.trader), &calldata)
            .unwrap_err();

        assert!(matches!(err, VenueError::V2TooLittleReceived { .. }));
        assert_eq!(
            f.ledger.balance_of(f.weth, f.venue.address()).unwrap(),
            e18(1)
        );
        let (reserve_weth, reserve_dai) = f.venue.reserves(&f.ledger, f.weth, f.dai).unwrap();
        assert_eq!(reserve_weth, e18(100));
        assert_eq!(reserve_dai, e18(250_000));
    }

    #[test]
    fn test_deadline_passed() {
        let mut f = setup();
        let calldata = RoutePlanner::new().calldata(f.ledger.timestamp() - 1);
        let err = f
            .venue
            .execute(&mut f.ledger, CallContext::sender(f.trader), &calldata)
            .unwrap_err();
        assert!(matches!(err, VenueError::TransactionDeadlinePassed { .. }));
    }

    #[test]
    fn test_missing_pair() {
        let mut f = setup();
        let usdc = f.ledger.create_address("USDC");
        f.ledger
            .register_token(usdc, TokenMeta::standard("USDC", 6))
            .unwrap();
        let err = f
            .venue
            .quote_exact_input(&f.ledger, &[f.weth, usdc], e18(1))
            .unwrap_err();
        assert!(matches!(err, VenueError::PairNotFound { .. }));
    }

    #[test]
    fn test_allow_revert_command_continues() {
        let mut f = setup();
        f.ledger.mint(f.dai, f.venue.address(), e18(5)).unwrap();

        // First transfer fails (router holds no WETH) but is allowed to revert
        let calldata = RoutePlanner::new()
            .add_allow_revert(Command::Transfer {
                token: f.weth,
                recipient: f.trader,
                value: e18(1),
            })
            .add(Command::Sweep {
                token: f.dai,
                recipient: f.trader,
                amount_min: e18(5),
            })
            .calldata(f.ledger.timestamp() + 60);

        f.venue
            .execute(&mut f.ledger, CallContext::sender(f.trader), &calldata)
            .unwrap();
        assert_eq!(f.ledger.balance_of(f.dai, f.trader).unwrap(), e18(5));
    }

    #[test]
    fn test_sweep_below_minimum() {
        let mut f = setup();
        let calldata = RoutePlanner::new()
            .add(Command::Sweep {
                token: f.dai,
                recipient: f.trader,
                amount_min: U256::from(1u64),
            })
            .calldata(f.ledger.timestamp() + 60);
        let err = f
            .venue
            .execute(&mut f.ledger, CallContext::sender(f.trader), &calldata)
            .unwrap_err();
        assert!(matches!(err, VenueError::InsufficientToken { .. }));
    }
}
