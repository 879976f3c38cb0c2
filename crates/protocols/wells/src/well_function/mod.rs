//! Well functions
//!
//! A well function prices a pool through two operations: the invariant `K` of
//! a reserve vector, and the inverse that solves one reserve for a target `K`.
//! Wells only ever call these, so every curve is interchangeable. Swaps and
//! single-token removals go through `solve_for_reserve_from`, which a curve
//! with an exact inverse overrides so rounding in `K` never pays the caller.

mod constant_product;
pub mod solver;
mod stable;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use constant_product::{ConstantProduct, ConstantProduct2};
pub use stable::Stable;

use crate::math::{checked_add, encode_word, mul_div, Rounding};
use crate::state::WellError;

/// Pricing curve of a well
pub trait WellFunction {
    /// Stable identifier, used in logs
    fn name(&self) -> &'static str;

    /// Invariant `K` of a reserve vector. Non-decreasing in every reserve.
    fn invariant(&self, reserves: &[u128]) -> Result<u128, WellError>;

    /// Smallest reserve at `index` whose invariant is at least `target`,
    /// all other reserves held fixed.
    ///
    /// The default searches with the bounded bisection solver.
    fn solve_for_reserve(
        &self,
        reserves: &[u128],
        target: u128,
        index: usize,
    ) -> Result<u128, WellError> {
        solver::bisect_reserve(self, reserves, target, index)
    }

    /// Smallest reserve at `index`, other reserves taken from `next`, that keeps
    /// the curve at or above where `reserves` sits, scaled by
    /// `numerator / denominator`.
    ///
    /// Swaps pass `1 / 1`; single-token removals pass the surviving share of LP
    /// supply. The default solves against the rounded invariant and carries over
    /// the slack `reserves[index]` already had above the smallest reserve meeting
    /// it, so an unchanged `next` solves back to `reserves[index]`.
    fn solve_for_reserve_from(
        &self,
        reserves: &[u128],
        next: &[u128],
        index: usize,
        numerator: u128,
        denominator: u128,
    ) -> Result<u128, WellError> {
        if index >= reserves.len() {
            return Err(WellError::InvalidIndex(index));
        }
        let k = self.invariant(reserves)?;
        let floor = self.solve_for_reserve(reserves, k, index)?;
        let slack = reserves[index].saturating_sub(floor);
        let target = mul_div(k, numerator, denominator, Rounding::Up)?;
        checked_add(self.solve_for_reserve(next, target, index)?, slack)
    }
}

/// Registered well function identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WellFunctionKind {
    ConstantProduct,
    #[serde(rename = "constant-product-2")]
    ConstantProduct2,
    Stable,
}

impl WellFunctionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConstantProduct => "constant-product",
            Self::ConstantProduct2 => "constant-product-2",
            Self::Stable => "stable",
        }
    }
}

impl fmt::Display for WellFunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WellFunctionKind {
    type Err = WellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "constant-product" => Ok(Self::ConstantProduct),
            "constant-product-2" => Ok(Self::ConstantProduct2),
            "stable" => Ok(Self::Stable),
            other => Err(WellError::UnknownWellFunction(other.to_string())),
        }
    }
}

/// Well function selection plus its opaque parameter blob
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WellFunctionSpec {
    pub kind: WellFunctionKind,
    #[serde(with = "basin_core::hex_bytes", default)]
    pub data: Vec<u8>,
}

impl WellFunctionSpec {
    pub fn constant_product() -> Self {
        Self {
            kind: WellFunctionKind::ConstantProduct,
            data: Vec::new(),
        }
    }

    pub fn constant_product_2() -> Self {
        Self {
            kind: WellFunctionKind::ConstantProduct2,
            data: Vec::new(),
        }
    }

    pub fn stable(amplification: u128) -> Self {
        Self {
            kind: WellFunctionKind::Stable,
            data: encode_word(amplification),
        }
    }

    /// Look up a well function by identifier
    pub fn from_id(id: &str, data: Vec<u8>) -> Result<Self, WellError> {
        Ok(Self {
            kind: id.parse()?,
            data,
        })
    }

    /// Validate the parameters against the token count and build the strategy
    pub fn build(&self, n_tokens: usize) -> Result<WellFunctionStrategy, WellError> {
        match self.kind {
            WellFunctionKind::ConstantProduct => {
                expect_no_data(self.kind, &self.data)?;
                Ok(WellFunctionStrategy::ConstantProduct(ConstantProduct))
            }
            WellFunctionKind::ConstantProduct2 => {
                expect_no_data(self.kind, &self.data)?;
                if n_tokens != 2 {
                    return Err(WellError::InvalidWellFunctionData {
                        reason: format!("constant-product-2 requires 2 tokens, got {}", n_tokens),
                    });
                }
                Ok(WellFunctionStrategy::ConstantProduct2(ConstantProduct2))
            }
            WellFunctionKind::Stable => Ok(WellFunctionStrategy::Stable(Stable::from_data(&self.data)?)),
        }
    }
}

fn expect_no_data(kind: WellFunctionKind, data: &[u8]) -> Result<(), WellError> {
    if !data.is_empty() {
        return Err(WellError::InvalidWellFunctionData {
            reason: format!("{} takes no parameters, got {} bytes", kind, data.len()),
        });
    }
    Ok(())
}

/// Built well function, one variant per registered kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellFunctionStrategy {
    ConstantProduct(ConstantProduct),
    ConstantProduct2(ConstantProduct2),
    Stable(Stable),
}

impl WellFunction for WellFunctionStrategy {
    fn name(&self) -> &'static str {
        match self {
            Self::ConstantProduct(f) => f.name(),
            Self::ConstantProduct2(f) => f.name(),
            Self::Stable(f) => f.name(),
        }
    }

    fn invariant(&self, reserves: &[u128]) -> Result<u128, WellError> {
        match self {
            Self::ConstantProduct(f) => f.invariant(reserves),
            Self::ConstantProduct2(f) => f.invariant(reserves),
            Self::Stable(f) => f.invariant(reserves),
        }
    }

    fn solve_for_reserve(
        &self,
        reserves: &[u128],
        target: u128,
        index: usize,
    ) -> Result<u128, WellError> {
        match self {
            Self::ConstantProduct(f) => f.solve_for_reserve(reserves, target, index),
            Self::ConstantProduct2(f) => f.solve_for_reserve(reserves, target, index),
            Self::Stable(f) => f.solve_for_reserve(reserves, target, index),
        }
    }

    fn solve_for_reserve_from(
        &self,
        reserves: &[u128],
        next: &[u128],
        index: usize,
        numerator: u128,
        denominator: u128,
    ) -> Result<u128, WellError> {
        match self {
            Self::ConstantProduct(f) => f.solve_for_reserve_from(reserves, next, index, numerator, denominator),
            Self::ConstantProduct2(f) => f.solve_for_reserve_from(reserves, next, index, numerator, denominator),
            Self::Stable(f) => f.solve_for_reserve_from(reserves, next, index, numerator, denominator),
        }
    }
}
