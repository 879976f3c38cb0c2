//! StableSwap well function
//!
//! Curve-style invariant for pegged assets. `D` satisfies
//!
//! ```text
//! A·nⁿ·Σx + D = A·D·nⁿ + Dⁿ⁺¹ / (nⁿ·∏x)
//! ```
//!
//! and has no closed form, so it is found by Newton iteration from `D = Σx`.
//! The reserve inverse uses the bounded bisection solver.

use num_bigint::BigUint;
use num_traits::Zero;

use super::WellFunction;
use crate::constants::solver::{MAX_NEWTON_ITERATIONS, NEWTON_TOLERANCE};
use crate::constants::stable::{MAX_AMPLIFICATION, MIN_AMPLIFICATION};
use crate::math::{big, decode_word, to_u128};
use crate::state::WellError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stable {
    amplification: u128,
}

impl Stable {
    pub fn new(amplification: u128) -> Result<Self, WellError> {
        if !(MIN_AMPLIFICATION..=MAX_AMPLIFICATION).contains(&amplification) {
            return Err(WellError::InvalidWellFunctionData {
                reason: format!(
                    "amplification {} outside {}..={}",
                    amplification, MIN_AMPLIFICATION, MAX_AMPLIFICATION
                ),
            });
        }
        Ok(Self { amplification })
    }

    /// Parse the amplification from a 32-byte big-endian parameter word
    pub fn from_data(data: &[u8]) -> Result<Self, WellError> {
        let amplification = decode_word(data).ok_or_else(|| WellError::InvalidWellFunctionData {
            reason: format!("expected a 32-byte amplification word, got {} bytes", data.len()),
        })?;
        Self::new(amplification)
    }

    pub fn amplification(&self) -> u128 {
        self.amplification
    }
}

impl WellFunction for Stable {
    fn name(&self) -> &'static str {
        "stable"
    }

    fn invariant(&self, reserves: &[u128]) -> Result<u128, WellError> {
        let n = reserves.len();
        if n == 0 || reserves.iter().any(|r| *r == 0) {
            return Ok(0);
        }

        let n_big = big(n as u128);
        let sum: BigUint = reserves.iter().map(|r| big(*r)).sum();
        let ann = big(self.amplification) * n_big.pow(n as u32);
        let ann_minus_one = &ann - big(1);
        let n_plus_one = &n_big + big(1);
        let tolerance = big(NEWTON_TOLERANCE as u128);

        let mut d = sum.clone();
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let mut d_p = d.clone();
            for r in reserves {
                d_p = d_p * &d / (big(*r) * &n_big);
            }

            let numerator = (&ann * &sum + &d_p * &n_big) * &d;
            let denominator = &ann_minus_one * &d + &n_plus_one * &d_p;
            if denominator.is_zero() {
                return Err(WellError::DivisionByZero);
            }
            let next = numerator / denominator;

            let diff = if next > d { &next - &d } else { &d - &next };
            d = next;
            if diff <= tolerance {
                return to_u128(&d);
            }
        }

        Err(WellError::InvariantDidNotConverge {
            iterations: MAX_NEWTON_ITERATIONS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::encode_word;
    use crate::well_function::ConstantProduct;

    const M: u128 = 1_000_000;

    fn stable(a: u128) -> Stable {
        Stable::new(a).unwrap()
    }

    #[test]
    fn test_balanced_invariant_is_sum() {
        assert_eq!(stable(100).invariant(&[100 * M, 100 * M]).unwrap(), 200 * M);
        assert_eq!(stable(100).invariant(&[7 * M, 7 * M, 7 * M]).unwrap(), 21 * M);
    }

    #[test]
    fn test_imbalanced_invariant_between_product_and_sum() {
        let reserves = [50 * M, 150 * M];
        let d = stable(100).invariant(&reserves).unwrap();
        let k = ConstantProduct.invariant(&reserves).unwrap();
        assert!(d < 200 * M, "D {} not below sum", d);
        assert!(d > k, "D {} not above product invariant {}", d, k);
    }

    #[test]
    fn test_higher_amplification_flattens_curve() {
        let reserves = [50 * M, 150 * M];
        let low = stable(1).invariant(&reserves).unwrap();
        let high = stable(1_000).invariant(&reserves).unwrap();
        assert!(high > low);
    }

    #[test]
    fn test_zero_reserve_gives_zero() {
        assert_eq!(stable(100).invariant(&[0, 100 * M]).unwrap(), 0);
    }

    #[test]
    fn test_invariant_monotone() {
        let base = [80 * M, 120 * M, 95 * M];
        let d = stable(200).invariant(&base).unwrap();
        for index in 0..3 {
            let mut more = base;
            more[index] += M;
            assert!(stable(200).invariant(&more).unwrap() >= d);
        }
    }

    #[test]
    fn test_solve_returns_smallest_reserve() {
        let function = stable(100);
        let reserves = [100 * M, 100 * M];
        let target = function.invariant(&reserves).unwrap();

        let mut after = reserves;
        after[0] += 10 * M;
        let solved = function.solve_for_reserve(&after, target, 1).unwrap();
        after[1] = solved;
        assert!(function.invariant(&after).unwrap() >= target);
        after[1] = solved - 1;
        assert!(function.invariant(&after).unwrap() < target);
    }

    #[test]
    fn test_swap_near_peg_is_close_to_one_for_one() {
        let function = stable(1_000);
        let reserves = [100 * M, 100 * M];
        let target = function.invariant(&reserves).unwrap();
        let solved = function
            .solve_for_reserve(&[101 * M, 100 * M], target, 1)
            .unwrap();
        let out = 100 * M - solved;
        assert!(out < M && out > 999_000, "out {}", out);
    }

    #[test]
    fn test_unchanged_reserves_solve_back() {
        let function = stable(100);
        let reserves = [50 * M + 7, 150 * M - 3];
        for index in 0..2 {
            assert_eq!(
                function.solve_for_reserve_from(&reserves, &reserves, index, 1, 1).unwrap(),
                reserves[index]
            );
        }
        let mut next = reserves;
        next[0] += M;
        assert!(function.solve_for_reserve_from(&reserves, &next, 1, 1, 1).unwrap() < reserves[1]);
    }

    #[test]
    fn test_parameter_validation() {
        assert_eq!(Stable::from_data(&encode_word(85)).unwrap().amplification(), 85);
        assert!(matches!(
            Stable::from_data(&encode_word(0)),
            Err(WellError::InvalidWellFunctionData { .. })
        ));
        assert!(Stable::from_data(&encode_word(MAX_AMPLIFICATION + 1)).is_err());
        assert!(Stable::from_data(&[1, 2, 3]).is_err());
    }
}
