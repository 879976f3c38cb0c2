//! Well State Types
//!
//! Configuration, mutable pool state, events and errors.

use basin_core::{ErrorKind, TokenId, WellId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::CollaboratorError;
use crate::pump::{Pump, PumpConfig, PumpState, PumpStrategy};
use crate::well_function::{WellFunctionKind, WellFunctionSpec};

/// Parameters for building a well
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildWellParams {
    /// Strictly ascending token identifiers
    pub tokens: Vec<TokenId>,
    /// Display symbol per token, used for the LP name and symbol
    pub symbols: Vec<String>,
    /// Display decimals per token
    pub decimals: Vec<u8>,
    pub well_function: WellFunctionSpec,
    #[serde(default)]
    pub pumps: Vec<PumpConfig>,
}

/// Immutable configuration of a built well
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WellConfig {
    pub tokens: Vec<TokenId>,
    pub symbols: Vec<String>,
    pub decimals: Vec<u8>,
    pub well_function: WellFunctionSpec,
    pub pumps: Vec<PumpConfig>,
}

impl WellConfig {
    pub fn n_tokens(&self) -> usize {
        self.tokens.len()
    }
}

/// Mutable state of a well
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellState {
    /// Reserve per token, in config order
    pub reserves: Vec<u128>,
    /// Outstanding LP shares
    pub lp_supply: u128,
    /// Timestamp of the last oracle advance
    pub last_timestamp: u64,
    pub last_block: u64,
    /// One entry per configured pump
    pub pumps: Vec<PumpState>,
}

impl WellState {
    /// Empty, bootstrap-eligible state
    pub fn new(n_tokens: usize, pumps: &[PumpStrategy]) -> Self {
        Self {
            reserves: vec![0; n_tokens],
            lp_supply: 0,
            last_timestamp: 0,
            last_block: 0,
            pumps: pumps
                .iter()
                .map(|p| PumpState::new(n_tokens, p.tracks_ema()))
                .collect(),
        }
    }

    /// No LP outstanding; the next deposit mints `K'`
    pub fn is_bootstrap(&self) -> bool {
        self.lp_supply == 0
    }
}

/// Record of a committed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WellEvent {
    BuildWell {
        well_id: WellId,
        tokens: Vec<TokenId>,
        well_function: WellFunctionKind,
        pumps: usize,
    },
    Swap {
        well_id: WellId,
        token_in: TokenId,
        token_out: TokenId,
        amount_in: u128,
        amount_out: u128,
    },
    AddLiquidity {
        well_id: WellId,
        amounts: Vec<u128>,
        lp_out: u128,
    },
    /// Proportional or imbalanced removal
    RemoveLiquidity {
        well_id: WellId,
        lp_in: u128,
        amounts: Vec<u128>,
    },
    RemoveLiquidityOneToken {
        well_id: WellId,
        lp_in: u128,
        token: TokenId,
        amount_out: u128,
    },
}

impl WellEvent {
    pub fn well_id(&self) -> &WellId {
        match self {
            Self::BuildWell { well_id, .. }
            | Self::Swap { well_id, .. }
            | Self::AddLiquidity { well_id, .. }
            | Self::RemoveLiquidity { well_id, .. }
            | Self::RemoveLiquidityOneToken { well_id, .. } => well_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::BuildWell { .. } => "build_well",
            Self::Swap { .. } => "swap",
            Self::AddLiquidity { .. } => "add_liquidity",
            Self::RemoveLiquidity { .. } => "remove_liquidity",
            Self::RemoveLiquidityOneToken { .. } => "remove_liquidity_one_token",
        }
    }
}

/// Outcome of a state-changing operation whose settlement already succeeded.
/// Nothing is visible until the owner commits `state`.
#[derive(Debug, Clone)]
pub struct Execution<T> {
    pub state: WellState,
    pub value: T,
    pub event: WellEvent,
}

/// Well errors
#[derive(Debug, Error)]
pub enum WellError {
    #[error("Tokens must be distinct and in ascending order")]
    TokensNotOrdered,

    #[error("Invalid token count {count}: need between 2 and {max}")]
    InvalidTokenCount { count: usize, max: usize },

    #[error("Token metadata mismatch: {0}")]
    MetadataMismatch(String),

    #[error("Unknown well function: {0}")]
    UnknownWellFunction(String),

    #[error("Invalid well function data: {reason}")]
    InvalidWellFunctionData { reason: String },

    #[error("Invalid pump data: {reason}")]
    InvalidPumpData { reason: String },

    #[error("Config encoding failed: {0}")]
    Encoding(String),

    #[error("Slippage exceeded: amount {amount}, bound {bound}")]
    SlippageExceeded { amount: u128, bound: u128 },

    #[error("LP out below minimum: got {lp_out}, need {min}")]
    InsufficientLpOut { lp_out: u128, min: u128 },

    #[error("LP in above maximum: need {lp_in}, max {max}")]
    LpInTooHigh { lp_in: u128, max: u128 },

    #[error("Output of {token} below minimum: got {amount}, need {min}")]
    InsufficientOut { token: TokenId, amount: u128, min: u128 },

    #[error("Invariant did not converge after {iterations} iterations")]
    InvariantDidNotConverge { iterations: u32 },

    #[error("No reserve at index {index} reaches the target invariant")]
    UnsolvableReserve { index: usize },

    #[error("Token not in well: {0}")]
    UnknownToken(TokenId),

    #[error("Input and output token are the same")]
    SameToken,

    #[error("Expected {expected} amounts, got {got}")]
    AmountsLengthMismatch { expected: usize, got: usize },

    #[error("Index out of range: {0}")]
    InvalidIndex(usize),

    #[error("Insufficient reserves")]
    InsufficientReserves,

    #[error("LP amount exceeds supply")]
    InsufficientLpSupply,

    #[error("Well has no liquidity")]
    EmptyWell,

    #[error("Arithmetic overflow")]
    MathOverflow,

    #[error("Arithmetic underflow")]
    MathUnderflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Pump not found: {0}")]
    PumpNotFound(usize),

    #[error("Pump {0} does not track an EMA")]
    PumpUntracked(usize),
}

impl WellError {
    /// Stable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::TokensNotOrdered => "tokens_not_ordered",
            Self::InvalidTokenCount { .. } => "invalid_token_count",
            Self::MetadataMismatch(_) => "metadata_mismatch",
            Self::UnknownWellFunction(_) => "unknown_well_function",
            Self::InvalidWellFunctionData { .. } => "invalid_well_function_data",
            Self::InvalidPumpData { .. } => "invalid_pump_data",
            Self::Encoding(_) => "encoding",
            Self::SlippageExceeded { .. } => "slippage_exceeded",
            Self::InsufficientLpOut { .. } => "insufficient_lp_out",
            Self::LpInTooHigh { .. } => "lp_in_too_high",
            Self::InsufficientOut { .. } => "insufficient_out",
            Self::InvariantDidNotConverge { .. } => "invariant_did_not_converge",
            Self::UnsolvableReserve { .. } => "unsolvable_reserve",
            Self::UnknownToken(_) => "unknown_token",
            Self::SameToken => "same_token",
            Self::AmountsLengthMismatch { .. } => "amounts_length_mismatch",
            Self::InvalidIndex(_) => "invalid_index",
            Self::InsufficientReserves => "insufficient_reserves",
            Self::InsufficientLpSupply => "insufficient_lp_supply",
            Self::EmptyWell => "empty_well",
            Self::MathOverflow => "math_overflow",
            Self::MathUnderflow => "math_underflow",
            Self::DivisionByZero => "division_by_zero",
            Self::Collaborator(_) => "collaborator",
            Self::PumpNotFound(_) => "pump_not_found",
            Self::PumpUntracked(_) => "pump_untracked",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TokensNotOrdered
            | Self::InvalidTokenCount { .. }
            | Self::MetadataMismatch(_)
            | Self::UnknownWellFunction(_)
            | Self::InvalidWellFunctionData { .. }
            | Self::InvalidPumpData { .. }
            | Self::Encoding(_) => ErrorKind::ConstructionInvalid,
            Self::SlippageExceeded { .. } => ErrorKind::SlippageExceeded,
            Self::InsufficientLpOut { .. } => ErrorKind::InsufficientLpOut,
            Self::LpInTooHigh { .. } => ErrorKind::LpInTooHigh,
            Self::InsufficientOut { .. } => ErrorKind::InsufficientOut,
            Self::InvariantDidNotConverge { .. } => ErrorKind::InvariantDidNotConverge,
            Self::UnsolvableReserve { .. }
            | Self::UnknownToken(_)
            | Self::SameToken
            | Self::AmountsLengthMismatch { .. }
            | Self::InvalidIndex(_)
            | Self::InsufficientReserves
            | Self::InsufficientLpSupply
            | Self::EmptyWell
            | Self::PumpUntracked(_) => ErrorKind::InvalidInput,
            Self::MathOverflow | Self::MathUnderflow | Self::DivisionByZero => ErrorKind::Arithmetic,
            Self::Collaborator(_) => ErrorKind::Collaborator,
            Self::PumpNotFound(_) => ErrorKind::NotFound,
        }
    }
}

impl From<serde_json::Error> for WellError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_bootstrap() {
        let pumps = [
            PumpConfig::default_ema().build().unwrap(),
            PumpConfig::cumulative().build().unwrap(),
        ];
        let state = WellState::new(3, &pumps);
        assert!(state.is_bootstrap());
        assert_eq!(state.reserves, vec![0, 0, 0]);
        assert_eq!(state.pumps[0].ema.len(), 3);
        assert!(state.pumps[1].ema.is_empty());
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(WellError::TokensNotOrdered.kind(), ErrorKind::ConstructionInvalid);
        assert_eq!(
            WellError::SlippageExceeded { amount: 1, bound: 2 }.kind(),
            ErrorKind::SlippageExceeded
        );
        assert_eq!(
            WellError::InvariantDidNotConverge { iterations: 255 }.error_code(),
            "invariant_did_not_converge"
        );
        assert_eq!(WellError::MathOverflow.kind(), ErrorKind::Arithmetic);
        let err: WellError = CollaboratorError::LedgerUnavailable.into();
        assert_eq!(err.kind(), ErrorKind::Collaborator);
    }

    #[test]
    fn test_event_serialization() {
        let event = WellEvent::Swap {
            well_id: WellId::new("ab"),
            token_in: TokenId::new("a"),
            token_out: TokenId::new("b"),
            amount_in: 10,
            amount_out: 5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "swap");
        assert_eq!(json["amount_out"], 5);
        assert_eq!(event.name(), "swap");
    }
}
