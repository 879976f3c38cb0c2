//! Constant product well functions
//!
//! `K = N · ⌊(∏ rᵢ)^(1/N)⌋`. Scaling the root by N keeps K on the same scale
//! as the reserves, so a balanced pool has K equal to the sum of its reserves.

use num_bigint::BigUint;
use num_traits::Zero;

use super::WellFunction;
use crate::math::{big, checked_mul, div_big, nth_root, product, product_except, to_u128, Rounding};
use crate::state::WellError;

/// Constant product over any number of tokens (N >= 2)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstantProduct;

/// Two-token constant product. Same curve as [`ConstantProduct`] with N fixed at 2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstantProduct2;

impl WellFunction for ConstantProduct {
    fn name(&self) -> &'static str {
        "constant-product"
    }

    fn invariant(&self, reserves: &[u128]) -> Result<u128, WellError> {
        product_invariant(reserves)
    }

    fn solve_for_reserve(
        &self,
        reserves: &[u128],
        target: u128,
        index: usize,
    ) -> Result<u128, WellError> {
        solve_product(reserves, target, index)
    }

    fn solve_for_reserve_from(
        &self,
        reserves: &[u128],
        next: &[u128],
        index: usize,
        numerator: u128,
        denominator: u128,
    ) -> Result<u128, WellError> {
        solve_product_from(reserves, next, index, numerator, denominator)
    }
}

impl WellFunction for ConstantProduct2 {
    fn name(&self) -> &'static str {
        "constant-product-2"
    }

    fn invariant(&self, reserves: &[u128]) -> Result<u128, WellError> {
        expect_two(reserves)?;
        product_invariant(reserves)
    }

    fn solve_for_reserve(
        &self,
        reserves: &[u128],
        target: u128,
        index: usize,
    ) -> Result<u128, WellError> {
        expect_two(reserves)?;
        solve_product(reserves, target, index)
    }

    fn solve_for_reserve_from(
        &self,
        reserves: &[u128],
        next: &[u128],
        index: usize,
        numerator: u128,
        denominator: u128,
    ) -> Result<u128, WellError> {
        expect_two(reserves)?;
        solve_product_from(reserves, next, index, numerator, denominator)
    }
}

fn expect_two(reserves: &[u128]) -> Result<(), WellError> {
    if reserves.len() != 2 {
        return Err(WellError::AmountsLengthMismatch {
            expected: 2,
            got: reserves.len(),
        });
    }
    Ok(())
}

fn product_invariant(reserves: &[u128]) -> Result<u128, WellError> {
    let n = reserves.len();
    let root = to_u128(&nth_root(&product(reserves), n)?)?;
    checked_mul(root, n as u128)
}

/// Closed-form inverse.
///
/// `N · ⌊(x · P)^(1/N)⌋ >= K` holds exactly when `x · P >= ⌈K / N⌉^N`, where
/// `P` is the product of the other reserves. The smallest such `x` is
/// `⌈⌈K / N⌉^N / P⌉`.
fn solve_product(reserves: &[u128], target: u128, index: usize) -> Result<u128, WellError> {
    if index >= reserves.len() {
        return Err(WellError::InvalidIndex(index));
    }
    if target == 0 {
        return Ok(0);
    }

    let n = reserves.len();
    let others = product_except(reserves, index);
    if others.is_zero() {
        return Err(WellError::UnsolvableReserve { index });
    }

    let root = div_big(&big(target), &big(n as u128), Rounding::Up)?;
    let required: BigUint = root.pow(n as u32);
    to_u128(&div_big(&required, &others, Rounding::Up)?)
}

/// Exact inverse against the reserve product rather than the floored `K`.
///
/// The result `x` is the smallest reserve with
/// `x · P_next · denominatorᴺ >= ∏reserves · numeratorᴺ`, where `P_next` is the
/// product of the other reserves in `next`. The pool's product never falls
/// below its scaled starting value.
fn solve_product_from(
    reserves: &[u128],
    next: &[u128],
    index: usize,
    numerator: u128,
    denominator: u128,
) -> Result<u128, WellError> {
    if next.len() != reserves.len() {
        return Err(WellError::AmountsLengthMismatch {
            expected: reserves.len(),
            got: next.len(),
        });
    }
    if index >= next.len() {
        return Err(WellError::InvalidIndex(index));
    }

    let n = reserves.len() as u32;
    let others = product_except(next, index);
    if others.is_zero() {
        return Err(WellError::UnsolvableReserve { index });
    }

    let target = product(reserves) * big(numerator).pow(n);
    let scale = big(denominator).pow(n) * others;
    to_u128(&div_big(&target, &scale, Rounding::Up)?)
}
