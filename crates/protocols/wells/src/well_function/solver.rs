//! Bounded reserve solver
//!
//! Finds the smallest reserve at one index whose invariant reaches a target,
//! for any well function whose invariant grows with that reserve. Used by
//! strategies without a closed-form inverse.

use super::WellFunction;
use crate::constants::solver::{MAX_BISECTION_STEPS, MAX_BRACKET_DOUBLINGS};
use crate::state::WellError;

/// Smallest `x` such that `invariant(reserves with [index] = x) >= target`.
///
/// The upper bracket starts at the current reserve and doubles until it
/// reaches the target. Running out of doublings (or out of u128) means no
/// reserve satisfies the target.
pub fn bisect_reserve<F>(
    function: &F,
    reserves: &[u128],
    target: u128,
    index: usize,
) -> Result<u128, WellError>
where
    F: WellFunction + ?Sized,
{
    if index >= reserves.len() {
        return Err(WellError::InvalidIndex(index));
    }

    let mut probe = reserves.to_vec();
    let mut invariant_at = |value: u128| -> Result<u128, WellError> {
        probe[index] = value;
        function.invariant(&probe)
    };

    if invariant_at(0)? >= target {
        return Ok(0);
    }

    let mut lo = 0u128;
    let mut hi = reserves[index].max(1);
    let mut doublings = 0u32;
    while invariant_at(hi)? < target {
        if doublings >= MAX_BRACKET_DOUBLINGS {
            return Err(WellError::UnsolvableReserve { index });
        }
        lo = hi;
        hi = hi
            .checked_mul(2)
            .ok_or(WellError::UnsolvableReserve { index })?;
        doublings += 1;
    }

    let mut steps = 0u32;
    while hi - lo > 1 {
        if steps >= MAX_BISECTION_STEPS {
            return Err(WellError::InvariantDidNotConverge { iterations: steps });
        }
        let mid = lo + (hi - lo) / 2;
        if invariant_at(mid)? >= target {
            hi = mid;
        } else {
            lo = mid;
        }
        steps += 1;
    }

    tracing::debug!(
        "Solved reserve {} = {} for target {} ({} doublings, {} steps)",
        index, hi, target, doublings, steps
    );
    Ok(hi)
}
