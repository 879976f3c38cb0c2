//! Error types for Basin

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core errors that can occur outside of well operations
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for Basin core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Stable classification of every failure a well operation can surface.
///
/// Protocol crates map their own error enums onto these kinds so callers can
/// branch on the outcome without matching crate-specific variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Tokens not ascending/distinct, or well-function/pump parameters rejected
    ConstructionInvalid,
    /// Swap output below (or required input above) the caller's bound
    SlippageExceeded,
    /// LP minted below the caller's minimum
    InsufficientLpOut,
    /// LP burn above the caller's maximum
    LpInTooHigh,
    /// Removal output below the caller's minimum
    InsufficientOut,
    /// Iterative solver exhausted its budget
    InvariantDidNotConverge,
    /// Malformed request (unknown token, length mismatch, ...)
    InvalidInput,
    /// Overflow, underflow or division by zero
    Arithmetic,
    /// Custody or LP ledger collaborator refused a step
    Collaborator,
    /// Unknown well or pump
    NotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConstructionInvalid => "construction_invalid",
            Self::SlippageExceeded => "slippage_exceeded",
            Self::InsufficientLpOut => "insufficient_lp_out",
            Self::LpInTooHigh => "lp_in_too_high",
            Self::InsufficientOut => "insufficient_out",
            Self::InvariantDidNotConverge => "invariant_did_not_converge",
            Self::InvalidInput => "invalid_input",
            Self::Arithmetic => "arithmetic",
            Self::Collaborator => "collaborator",
            Self::NotFound => "not_found",
        }
    }

    /// Whether the failure came from a caller-supplied slippage bound
    pub fn is_bound_violation(&self) -> bool {
        matches!(
            self,
            Self::SlippageExceeded | Self::InsufficientLpOut | Self::LpInTooHigh | Self::InsufficientOut
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
