//! Fixed-point arithmetic kernel
//!
//! Integer helpers with an explicit rounding direction. Anything a well pays
//! out is rounded down; anything it requires from a caller is rounded up.
//!
//! Products of reserves are carried in `BigUint` so an N-token product never
//! overflows; results are narrowed back to `u128` with an explicit check.

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

use crate::constants::fixed::{ONE, PARAM_WORD_BYTES};
use crate::state::WellError;

/// Direction to round a non-exact quotient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Toward zero. Used for amounts paid to a caller.
    Down,
    /// Away from zero. Used for amounts required from a caller.
    Up,
}

pub fn big(value: u128) -> BigUint {
    BigUint::from(value)
}

/// Narrow a big integer back to `u128`
pub fn to_u128(value: &BigUint) -> Result<u128, WellError> {
    value.to_u128().ok_or(WellError::MathOverflow)
}

/// `numerator / denominator` with the requested rounding
pub fn div_big(
    numerator: &BigUint,
    denominator: &BigUint,
    rounding: Rounding,
) -> Result<BigUint, WellError> {
    if denominator.is_zero() {
        return Err(WellError::DivisionByZero);
    }
    let quotient = numerator / denominator;
    if rounding == Rounding::Up && !(numerator % denominator).is_zero() {
        Ok(quotient + 1u32)
    } else {
        Ok(quotient)
    }
}

/// `a * b / denominator` with a 256+ bit intermediate
pub fn mul_div(a: u128, b: u128, denominator: u128, rounding: Rounding) -> Result<u128, WellError> {
    let quotient = div_big(&(big(a) * big(b)), &big(denominator), rounding)?;
    to_u128(&quotient)
}

pub fn div(a: u128, b: u128, rounding: Rounding) -> Result<u128, WellError> {
    if b == 0 {
        return Err(WellError::DivisionByZero);
    }
    let quotient = a / b;
    if rounding == Rounding::Up && a % b != 0 {
        Ok(quotient + 1)
    } else {
        Ok(quotient)
    }
}

pub fn checked_add(a: u128, b: u128) -> Result<u128, WellError> {
    a.checked_add(b).ok_or(WellError::MathOverflow)
}

pub fn checked_sub(a: u128, b: u128) -> Result<u128, WellError> {
    a.checked_sub(b).ok_or(WellError::MathUnderflow)
}

pub fn checked_mul(a: u128, b: u128) -> Result<u128, WellError> {
    a.checked_mul(b).ok_or(WellError::MathOverflow)
}

/// Product of every reserve
pub fn product(values: &[u128]) -> BigUint {
    values
        .iter()
        .fold(BigUint::one(), |acc, value| acc * big(*value))
}

/// Product of every reserve except the one at `skip`
pub fn product_except(values: &[u128], skip: usize) -> BigUint {
    values
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != skip)
        .fold(BigUint::one(), |acc, (_, value)| acc * big(*value))
}

/// `⌊value^(1/n)⌋`
pub fn nth_root(value: &BigUint, n: usize) -> Result<BigUint, WellError> {
    let n = u32::try_from(n).map_err(|_| WellError::MathOverflow)?;
    if n == 0 {
        return Err(WellError::DivisionByZero);
    }
    Ok(value.nth_root(n))
}

/// `base^exp` for an 18-decimal fixed-point `base <= 1.0`.
///
/// Exponentiation by squaring, flooring after every multiply, so the result
/// never exceeds the exact power and the cost is O(log exp).
pub fn pow_fixed(base: u128, exp: u64) -> Result<u128, WellError> {
    if base > ONE {
        return Err(WellError::MathOverflow);
    }
    let mut result = ONE;
    let mut factor = base;
    let mut remaining = exp;
    while remaining > 0 {
        if remaining & 1 == 1 {
            result = checked_mul(result, factor)? / ONE;
        }
        remaining >>= 1;
        if remaining > 0 {
            factor = checked_mul(factor, factor)? / ONE;
            if factor == 0 {
                return Ok(0);
            }
        }
    }
    Ok(result)
}

/// Encode a parameter as a 32-byte big-endian word
pub fn encode_word(value: u128) -> Vec<u8> {
    let mut word = vec![0u8; PARAM_WORD_BYTES];
    word[PARAM_WORD_BYTES - 16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Decode a 32-byte big-endian word. `None` on a wrong length or a value wider than u128.
pub fn decode_word(data: &[u8]) -> Option<u128> {
    if data.len() != PARAM_WORD_BYTES {
        return None;
    }
    let (high, low) = data.split_at(PARAM_WORD_BYTES - 16);
    if high.iter().any(|b| *b != 0) {
        return None;
    }
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(low);
    Some(u128::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_div_rounding() {
        assert_eq!(div(10, 3, Rounding::Down).unwrap(), 3);
        assert_eq!(div(10, 3, Rounding::Up).unwrap(), 4);
        assert_eq!(div(9, 3, Rounding::Up).unwrap(), 3);
        assert!(matches!(div(1, 0, Rounding::Down), Err(WellError::DivisionByZero)));
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // u128::MAX * 2 overflows u128 but the quotient fits
        assert_eq!(mul_div(u128::MAX, 2, 4, Rounding::Down).unwrap(), u128::MAX / 2);
        assert_eq!(mul_div(u128::MAX, 2, 4, Rounding::Up).unwrap(), u128::MAX / 2 + 1);
    }

    #[test]
    fn test_mul_div_overflowing_result() {
        assert!(matches!(
            mul_div(u128::MAX, 3, 2, Rounding::Down),
            Err(WellError::MathOverflow)
        ));
    }

    #[test]
    fn test_checked_helpers() {
        assert!(matches!(checked_sub(1, 2), Err(WellError::MathUnderflow)));
        assert!(matches!(checked_add(u128::MAX, 1), Err(WellError::MathOverflow)));
        assert_eq!(checked_add(2, 3).unwrap(), 5);
    }

    #[test]
    fn test_products() {
        assert_eq!(product(&[2, 3, 7]), big(42));
        assert_eq!(product_except(&[2, 3, 7], 1), big(14));
        assert_eq!(product(&[]), big(1));
    }

    #[test]
    fn test_nth_root_floors() {
        assert_eq!(nth_root(&big(10_000), 2).unwrap(), big(100));
        assert_eq!(nth_root(&big(10_001), 2).unwrap(), big(100));
        assert_eq!(nth_root(&big(9_999), 2).unwrap(), big(99));
        assert_eq!(nth_root(&big(1_000_000_000_000), 3).unwrap(), big(10_000));
        assert!(nth_root(&big(8), 0).is_err());
    }

    #[test]
    fn test_pow_fixed_identities() {
        assert_eq!(pow_fixed(ONE, 12345).unwrap(), ONE);
        assert_eq!(pow_fixed(ONE / 2, 0).unwrap(), ONE);
        assert_eq!(pow_fixed(ONE / 2, 1).unwrap(), ONE / 2);
        assert_eq!(pow_fixed(ONE / 2, 3).unwrap(), ONE / 8);
        assert_eq!(pow_fixed(0, 5).unwrap(), 0);
    }

    #[test]
    fn test_pow_fixed_matches_reference_powers() {
        // alpha^n for the default EMA alpha, reference values to 18 decimals
        let alpha = crate::constants::pumps::DEFAULT_EMA_ALPHA;
        let cases: [(u64, u128); 3] = [
            (1_000, 573_753_399_578_216_471),
            (5_000, 62_176_512_557_204_924),
            (10_000, 3_865_918_713_776_261),
        ];
        for (exp, expected) in cases {
            let got = pow_fixed(alpha, exp).unwrap();
            assert!(got <= expected, "alpha^{} = {} above {}", exp, got, expected);
            assert!(expected - got < 100_000, "alpha^{} = {} too far from {}", exp, got, expected);
        }
    }

    #[test]
    fn test_pow_fixed_rejects_base_above_one() {
        assert!(pow_fixed(ONE + 1, 2).is_err());
    }

    #[test]
    fn test_word_encoding() {
        let word = encode_word(1_000);
        assert_eq!(word.len(), 32);
        assert_eq!(decode_word(&word), Some(1_000));
        assert_eq!(decode_word(&word[1..]), None);

        let mut wide = vec![0u8; 32];
        wide[0] = 1;
        assert_eq!(decode_word(&wide), None);
    }
}
