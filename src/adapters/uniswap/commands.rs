//! Universal Router Commands
//!
//! Command bytes, ABI input layouts and a route planner producing
//! `execute(bytes,bytes[],uint256)` calldata.

use alloy_primitives::{address, Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall, SolValue};
use thiserror::Error;

/// Low six bits of a command byte select the command
pub const COMMAND_TYPE_MASK: u8 = 0x3f;
/// High bit lets a command fail without reverting the whole execution
pub const FLAG_ALLOW_REVERT: u8 = 0x80;

pub const V2_SWAP_EXACT_IN: u8 = 0x08;
pub const SWEEP: u8 = 0x04;
pub const TRANSFER: u8 = 0x05;

/// Recipient sentinel for the account that called `execute`
pub const MSG_SENDER: Address = address!("0000000000000000000000000000000000000001");
/// Recipient sentinel for the router itself
pub const ADDRESS_THIS: Address = address!("0000000000000000000000000000000000000002");
/// `amountIn` sentinel meaning "the router's whole balance" (1 << 255)
pub const CONTRACT_BALANCE: U256 = U256::from_limbs([0, 0, 0, 0x8000_0000_0000_0000]);

sol! {
    interface IUniversalRouter {
        function execute(bytes commands, bytes[] inputs, uint256 deadline) external payable;
    }
}

type V2SwapExactInInput = (Address, U256, U256, Vec<Address>, bool);
type SweepInput = (Address, Address, U256);
type TransferInput = (Address, Address, U256);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Invalid command type: {0:#04x}")]
    InvalidCommandType(u8),
    #[error("Malformed input for command {command:#04x}: {reason}")]
    MalformedInput { command: u8, reason: String },
    #[error("Malformed execute calldata: {0}")]
    MalformedCalldata(String),
}

/// A decoded router command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    V2SwapExactIn {
        recipient: Address,
        amount_in: U256,
        amount_out_min: U256,
        path: Vec<Address>,
        payer_is_user: bool,
    },
    Sweep {
        token: Address,
        recipient: Address,
        amount_min: U256,
    },
    Transfer {
        token: Address,
        recipient: Address,
        value: U256,
    },
}

impl Command {
    pub fn command_type(&self) -> u8 {
        match self {
            Command::V2SwapExactIn { .. } => V2_SWAP_EXACT_IN,
            Command::Sweep { .. } => SWEEP,
            Command::Transfer { .. } => TRANSFER,
        }
    }

    pub fn encode_input(&self) -> Bytes {
        let encoded = match self {
            Command::V2SwapExactIn {
                recipient,
                amount_in,
                amount_out_min,
                path,
                payer_is_user,
            } => (
                *recipient,
                *amount_in,
                *amount_out_min,
                path.clone(),
                *payer_is_user,
            )
                .abi_encode_params(),
            Command::Sweep {
                token,
                recipient,
                amount_min,
            } => (*token, *recipient, *amount_min).abi_encode_params(),
            Command::Transfer {
                token,
                recipient,
                value,
            } => (*token, *recipient, *value).abi_encode_params(),
        };
        Bytes::from(encoded)
    }

    /// Decode the input of a command whose type bits are `command_type`
    pub fn decode(command_type: u8, input: &[u8]) -> Result<Self, CommandError> {
        let malformed = |e: alloy_sol_types::Error| CommandError::MalformedInput {
            command: command_type,
            reason: e.to_string(),
        };
        match command_type {
            V2_SWAP_EXACT_IN => {
                let (recipient, amount_in, amount_out_min, path, payer_is_user) =
                    <V2SwapExactInInput as SolValue>::abi_decode_params(input, true).map_err(malformed)?;
                Ok(Command::V2SwapExactIn {
                    recipient,
                    amount_in,
                    amount_out_min,
                    path,
                    payer_is_user,
                })
            }
            SWEEP => {
                let (token, recipient, amount_min) =
                    <SweepInput as SolValue>::abi_decode_params(input, true).map_err(malformed)?;
                Ok(Command::Sweep {
                    token,
                    recipient,
                    amount_min,
                })
            }
            TRANSFER => {
                let (token, recipient, value) =
                    <TransferInput as SolValue>::abi_decode_params(input, true).map_err(malformed)?;
                Ok(Command::Transfer {
                    token,
                    recipient,
                    value,
                })
            }
            other => Err(CommandError::InvalidCommandType(other)),
        }
    }
}

/// Decoded `execute` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteCall {
    pub commands: Bytes,
    pub inputs: Vec<Bytes>,
    pub deadline: U256,
}

impl ExecuteCall {
    pub fn decode(calldata: &[u8]) -> Result<Self, CommandError> {
        let call = IUniversalRouter::executeCall::abi_decode(calldata, true)
            .map_err(|e| CommandError::MalformedCalldata(e.to_string()))?;
        Ok(Self {
            commands: call.commands,
            inputs: call.inputs,
            deadline: call.deadline,
        })
    }
}

/// Builds the command/input lists for one `execute` call
#[derive(Debug, Clone, Default)]
pub struct RoutePlanner {
    commands: Vec<u8>,
    inputs: Vec<Bytes>,
}

impl RoutePlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, command: Command) -> Self {
        self.commands.push(command.command_type());
        self.inputs.push(command.encode_input());
        self
    }

    /// Add a command that may fail without reverting the others
    pub fn add_allow_revert(mut self, command: Command) -> Self {
        self.commands.push(command.command_type() | FLAG_ALLOW_REVERT);
        self.inputs.push(command.encode_input());
        self
    }

    pub fn commands(&self) -> &[u8] {
        &self.commands
    }

    pub fn inputs(&self) -> &[Bytes] {
        &self.inputs
    }

    /// ABI-encoded `execute(commands, inputs, deadline)`
    pub fn calldata(&self, deadline: u64) -> Bytes {
        let call = IUniversalRouter::executeCall {
            commands: Bytes::from(self.commands.clone()),
            inputs: self.inputs.clone(),
            deadline: U256::from(deadline),
        };
        Bytes::from(call.abi_encode())
    }
}
