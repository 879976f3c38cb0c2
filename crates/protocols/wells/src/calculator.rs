//! Well Calculator
//!
//! Pure pricing for every well operation. Each function takes the well function,
//! the current reserves (and LP supply where relevant) and returns the
//! caller-facing amount together with the reserves the pool would hold after
//! the operation. Nothing here touches state, pumps or collaborators.
//!
//! Amounts paid to the caller round down; amounts required from the caller
//! round up.

use crate::math::{checked_add, checked_sub, mul_div, Rounding};
use crate::state::WellError;
use crate::well_function::WellFunction;

/// Result of pricing one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    /// Caller-facing amount(s)
    pub value: T,
    /// Reserves after the operation
    pub reserves: Vec<u128>,
    /// LP supply after the operation
    pub lp_supply: u128,
}

fn check_pair(reserves: &[u128], i: usize, j: usize) -> Result<(), WellError> {
    let n = reserves.len();
    if i >= n {
        return Err(WellError::InvalidIndex(i));
    }
    if j >= n {
        return Err(WellError::InvalidIndex(j));
    }
    if i == j {
        return Err(WellError::SameToken);
    }
    Ok(())
}

fn check_amounts(reserves: &[u128], amounts: &[u128]) -> Result<(), WellError> {
    if amounts.len() != reserves.len() {
        return Err(WellError::AmountsLengthMismatch {
            expected: reserves.len(),
            got: amounts.len(),
        });
    }
    Ok(())
}

fn check_lp_in(lp_supply: u128, lp_in: u128) -> Result<(), WellError> {
    if lp_supply == 0 {
        return Err(WellError::EmptyWell);
    }
    if lp_in > lp_supply {
        return Err(WellError::InsufficientLpSupply);
    }
    Ok(())
}

fn nonzero_invariant<F: WellFunction + ?Sized>(function: &F, reserves: &[u128]) -> Result<u128, WellError> {
    match function.invariant(reserves)? {
        0 => Err(WellError::EmptyWell),
        k => Ok(k),
    }
}

/// Output for an exact input of `reserves[i]`'s token
///
/// `r'[i] = r[i] + amount_in`, `r'[j]` is the smallest reserve keeping the curve
/// where `r` had it, `amount_out = r[j] − r'[j]`. No input pays nothing.
pub fn swap_out<F: WellFunction + ?Sized>(
    function: &F,
    reserves: &[u128],
    lp_supply: u128,
    i: usize,
    j: usize,
    amount_in: u128,
) -> Result<Outcome<u128>, WellError> {
    check_pair(reserves, i, j)?;
    nonzero_invariant(function, reserves)?;

    let mut next = reserves.to_vec();
    next[i] = checked_add(reserves[i], amount_in)?;
    let solved = function.solve_for_reserve_from(reserves, &next, j, 1, 1)?;
    let amount_out = checked_sub(reserves[j], solved)?;
    next[j] = solved;

    Ok(Outcome {
        value: amount_out,
        reserves: next,
        lp_supply,
    })
}

/// Input required for an exact output of `reserves[j]`'s token
///
/// `r'[j] = r[j] − amount_out`, `r'[i]` is the smallest reserve keeping the curve
/// where `r` had it, `amount_in = r'[i] − r[i]`. Taking the whole reserve is rejected.
pub fn swap_in<F: WellFunction + ?Sized>(
    function: &F,
    reserves: &[u128],
    lp_supply: u128,
    i: usize,
    j: usize,
    amount_out: u128,
) -> Result<Outcome<u128>, WellError> {
    check_pair(reserves, i, j)?;
    if amount_out >= reserves[j] {
        return Err(WellError::InsufficientReserves);
    }
    nonzero_invariant(function, reserves)?;

    let mut next = reserves.to_vec();
    next[j] = reserves[j] - amount_out;
    let solved = function.solve_for_reserve_from(reserves, &next, i, 1, 1)?;
    let amount_in = checked_sub(solved, reserves[i])?;
    next[i] = solved;

    Ok(Outcome {
        value: amount_in,
        reserves: next,
        lp_supply,
    })
}

/// LP minted for depositing `amounts`
///
/// Bootstrap (`lp_supply == 0`) mints `K'`; otherwise `⌊lp_supply · K' / K⌋ − lp_supply`.
pub fn add_liquidity_out<F: WellFunction + ?Sized>(
    function: &F,
    reserves: &[u128],
    lp_supply: u128,
    amounts: &[u128],
) -> Result<Outcome<u128>, WellError> {
    check_amounts(reserves, amounts)?;
    let next = reserves
        .iter()
        .zip(amounts)
        .map(|(r, a)| checked_add(*r, *a))
        .collect::<Result<Vec<_>, _>>()?;
    let k_next = function.invariant(&next)?;

    let lp_out = if lp_supply == 0 {
        k_next
    } else {
        let k = nonzero_invariant(function, reserves)?;
        mul_div(lp_supply, k_next, k, Rounding::Down)?.saturating_sub(lp_supply)
    };

    Ok(Outcome {
        value: lp_out,
        lp_supply: checked_add(lp_supply, lp_out)?,
        reserves: next,
    })
}

/// Proportional withdrawal for burning `lp_in`: `⌊r[i] · lp_in / lp_supply⌋`
pub fn remove_liquidity_out(
    reserves: &[u128],
    lp_supply: u128,
    lp_in: u128,
) -> Result<Outcome<Vec<u128>>, WellError> {
    check_lp_in(lp_supply, lp_in)?;
    let amounts = reserves
        .iter()
        .map(|r| mul_div(*r, lp_in, lp_supply, Rounding::Down))
        .collect::<Result<Vec<_>, _>>()?;
    let next = reserves
        .iter()
        .zip(&amounts)
        .map(|(r, a)| checked_sub(*r, *a))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Outcome {
        value: amounts,
        reserves: next,
        lp_supply: lp_supply - lp_in,
    })
}

/// Single-token withdrawal for burning `lp_in`
///
/// `r'[j]` is the smallest reserve keeping the curve at `(lp_supply − lp_in) / lp_supply`
/// of where `r` had it, `amount_out = r[j] − r'[j]`.
pub fn remove_liquidity_one_token_out<F: WellFunction + ?Sized>(
    function: &F,
    reserves: &[u128],
    lp_supply: u128,
    lp_in: u128,
    j: usize,
) -> Result<Outcome<u128>, WellError> {
    if j >= reserves.len() {
        return Err(WellError::InvalidIndex(j));
    }
    check_lp_in(lp_supply, lp_in)?;
    let remaining = lp_supply - lp_in;
    let solved = function.solve_for_reserve_from(reserves, reserves, j, remaining, lp_supply)?;
    let amount_out = checked_sub(reserves[j], solved)?;
    let mut next = reserves.to_vec();
    next[j] = solved;

    Ok(Outcome {
        value: amount_out,
        reserves: next,
        lp_supply: remaining,
    })
}

/// LP burned for withdrawing exactly `amounts`
///
/// `K'' = inv(r − amounts)`, `lp_in = ⌈lp_supply · (K − K'') / K⌉`.
pub fn remove_liquidity_imbalanced_in<F: WellFunction + ?Sized>(
    function: &F,
    reserves: &[u128],
    lp_supply: u128,
    amounts: &[u128],
) -> Result<Outcome<u128>, WellError> {
    check_amounts(reserves, amounts)?;
    if lp_supply == 0 {
        return Err(WellError::EmptyWell);
    }
    let next = reserves
        .iter()
        .zip(amounts)
        .map(|(r, a)| r.checked_sub(*a).ok_or(WellError::InsufficientReserves))
        .collect::<Result<Vec<_>, _>>()?;

    let k = nonzero_invariant(function, reserves)?;
    let k_next = function.invariant(&next)?;
    let lp_in = mul_div(lp_supply, k.saturating_sub(k_next), k, Rounding::Up)?;
    if lp_in > lp_supply {
        return Err(WellError::InsufficientLpSupply);
    }

    Ok(Outcome {
        value: lp_in,
        reserves: next,
        lp_supply: lp_supply - lp_in,
    })
}
