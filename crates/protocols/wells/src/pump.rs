//! Pumps (reserve oracles)
//!
//! A pump is advanced before every state-changing operation with the reserves
//! as they stood before that operation, and the time elapsed since the last
//! advance. Two accumulators are kept per token:
//!
//! - cumulative: `Σ reserve · seconds`, differenced between two snapshots to get
//!   a time-weighted average
//! - EMA: exponential moving average with per-second factor `α`, advanced in
//!   closed form as `r · (1 − α^t) + ema · α^t`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::fixed::ONE;
use crate::constants::pumps::DEFAULT_EMA_ALPHA;
use crate::math::{checked_add, checked_mul, checked_sub, decode_word, encode_word, mul_div, pow_fixed, Rounding};
use crate::state::WellError;

/// Oracle accumulators of one pump
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PumpState {
    /// Time-integrated reserves, one per token
    pub cumulative: Vec<u128>,
    /// Exponential moving average, one per token. Empty when the pump keeps no EMA.
    pub ema: Vec<u128>,
}

impl PumpState {
    pub fn new(n_tokens: usize, tracks_ema: bool) -> Self {
        Self {
            cumulative: vec![0; n_tokens],
            ema: if tracks_ema { vec![0; n_tokens] } else { Vec::new() },
        }
    }
}

/// Reserve oracle
pub trait Pump {
    fn name(&self) -> &'static str;

    /// Whether `advance` maintains `PumpState::ema`
    fn tracks_ema(&self) -> bool;

    /// Fold `elapsed` seconds at `reserves` into the accumulators
    fn advance(&self, prev: &PumpState, reserves: &[u128], elapsed: u64) -> Result<PumpState, WellError>;
}

/// Pump that only integrates reserves over time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CumulativePump;

/// Pump that integrates reserves and keeps an exponential moving average
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmaPump {
    alpha: u128,
}

impl EmaPump {
    pub fn new(alpha: u128) -> Result<Self, WellError> {
        if alpha == 0 || alpha >= ONE {
            return Err(WellError::InvalidPumpData {
                reason: format!("alpha {} must be strictly between 0 and {}", alpha, ONE),
            });
        }
        Ok(Self { alpha })
    }

    pub fn alpha(&self) -> u128 {
        self.alpha
    }
}

impl Pump for CumulativePump {
    fn name(&self) -> &'static str {
        "cumulative"
    }

    fn tracks_ema(&self) -> bool {
        false
    }

    fn advance(&self, prev: &PumpState, reserves: &[u128], elapsed: u64) -> Result<PumpState, WellError> {
        Ok(PumpState {
            cumulative: advance_cumulative(&prev.cumulative, reserves, elapsed)?,
            ema: Vec::new(),
        })
    }
}

impl Pump for EmaPump {
    fn name(&self) -> &'static str {
        "ema"
    }

    fn tracks_ema(&self) -> bool {
        true
    }

    fn advance(&self, prev: &PumpState, reserves: &[u128], elapsed: u64) -> Result<PumpState, WellError> {
        Ok(PumpState {
            cumulative: advance_cumulative(&prev.cumulative, reserves, elapsed)?,
            ema: advance_ema(&prev.ema, reserves, self.alpha, elapsed)?,
        })
    }
}

/// `prev[i] + reserves[i] · elapsed`, exact
pub fn advance_cumulative(prev: &[u128], reserves: &[u128], elapsed: u64) -> Result<Vec<u128>, WellError> {
    expect_len(prev, reserves)?;
    prev.iter()
        .zip(reserves)
        .map(|(c, r)| checked_add(*c, checked_mul(*r, elapsed as u128)?))
        .collect()
}

/// `reserves[i] · (1 − α^elapsed) + prev[i] · α^elapsed`, each term floored
pub fn advance_ema(prev: &[u128], reserves: &[u128], alpha: u128, elapsed: u64) -> Result<Vec<u128>, WellError> {
    expect_len(prev, reserves)?;
    if elapsed == 0 {
        return Ok(prev.to_vec());
    }
    let decay = pow_fixed(alpha, elapsed)?;
    let weight = ONE - decay;
    prev.iter()
        .zip(reserves)
        .map(|(ema, r)| {
            let fresh = mul_div(*r, weight, ONE, Rounding::Down)?;
            let carried = mul_div(*ema, decay, ONE, Rounding::Down)?;
            checked_add(fresh, carried)
        })
        .collect()
}

/// Time-weighted average reserves between two cumulative snapshots
pub fn twa_reserves(start: &[u128], end: &[u128], elapsed: u64) -> Result<Vec<u128>, WellError> {
    expect_len(start, end)?;
    if elapsed == 0 {
        return Err(WellError::DivisionByZero);
    }
    start
        .iter()
        .zip(end)
        .map(|(s, e)| Ok(checked_sub(*e, *s)? / elapsed as u128))
        .collect()
}

fn expect_len(a: &[u128], b: &[u128]) -> Result<(), WellError> {
    if a.len() != b.len() {
        return Err(WellError::AmountsLengthMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    Ok(())
}

/// Registered pump identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PumpKind {
    Ema,
    Cumulative,
}

impl PumpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ema => "ema",
            Self::Cumulative => "cumulative",
        }
    }
}

impl fmt::Display for PumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PumpKind {
    type Err = WellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ema" => Ok(Self::Ema),
            "cumulative" => Ok(Self::Cumulative),
            other => Err(WellError::InvalidPumpData {
                reason: format!("unknown pump '{}'", other),
            }),
        }
    }
}

/// Pump selection plus its parameter blob
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PumpConfig {
    pub kind: PumpKind,
    #[serde(with = "basin_core::hex_bytes", default)]
    pub data: Vec<u8>,
}

impl PumpConfig {
    pub fn ema(alpha: u128) -> Self {
        Self {
            kind: PumpKind::Ema,
            data: encode_word(alpha),
        }
    }

    pub fn default_ema() -> Self {
        Self::ema(DEFAULT_EMA_ALPHA)
    }

    pub fn cumulative() -> Self {
        Self {
            kind: PumpKind::Cumulative,
            data: Vec::new(),
        }
    }

    pub fn build(&self) -> Result<PumpStrategy, WellError> {
        match self.kind {
            PumpKind::Ema => {
                let alpha = decode_word(&self.data).ok_or_else(|| WellError::InvalidPumpData {
                    reason: format!("expected a 32-byte alpha word, got {} bytes", self.data.len()),
                })?;
                Ok(PumpStrategy::Ema(EmaPump::new(alpha)?))
            }
            PumpKind::Cumulative => {
                if !self.data.is_empty() {
                    return Err(WellError::InvalidPumpData {
                        reason: format!("cumulative pump takes no parameters, got {} bytes", self.data.len()),
                    });
                }
                Ok(PumpStrategy::Cumulative(CumulativePump))
            }
        }
    }
}

/// Built pump, one variant per registered kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStrategy {
    Ema(EmaPump),
    Cumulative(CumulativePump),
}

impl Pump for PumpStrategy {
    fn name(&self) -> &'static str {
        match self {
            Self::Ema(p) => p.name(),
            Self::Cumulative(p) => p.name(),
        }
    }

    fn tracks_ema(&self) -> bool {
        match self {
            Self::Ema(p) => p.tracks_ema(),
            Self::Cumulative(p) => p.tracks_ema(),
        }
    }

    fn advance(&self, prev: &PumpState, reserves: &[u128], elapsed: u64) -> Result<PumpState, WellError> {
        match self {
            Self::Ema(p) => p.advance(prev, reserves, elapsed),
            Self::Cumulative(p) => p.advance(prev, reserves, elapsed),
        }
    }
}
