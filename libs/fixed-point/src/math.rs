//! Signed natural logarithm and exponential in 18-decimal fixed point
//!
//! Both functions use the rational approximations deployed on-chain (Remco
//! Bloemen's `wadLn`/`wadExp`). The intermediate steps run in 2^96 binary fixed
//! point with EVM wrapping semantics, so they operate on raw two's-complement
//! `U256` words rather than checked `I256` arithmetic.

use crate::errors::{FixedPointError, Result};
use ethers_core::types::{I256, U256};

const ONE_18: u128 = 1_000_000_000_000_000_000;

/// floor(ln(0.5e-18) * 1e18); below this exp(x) rounds to zero
const EXP_LOWER_BOUND: U256 = U256([
    0xb731c958f34d94c1,
    0xfffffffffffffffd,
    0xffffffffffffffff,
    0xffffffffffffffff,
]);
/// floor(ln((2^255 - 1) / 1e18) * 1e18); at or above this exp(x) overflows
const EXP_UPPER_BOUND: U256 = U256([0x55bf798b4a1bf1e5, 0x7, 0, 0]);
/// ln(2) * 2^96
const LN_2_X96: U256 = U256([0xd1cf79abc9e3b398, 0xb17217f7, 0, 0]);
/// Scale factor s * 2^k * 1e18 / 2^96 in 2^213 basis
const EXP_FINAL_SCALE: U256 = U256([
    0xee70ef65f9978af3,
    0x63c32e5c2f6dc192,
    0x000000029d9dc385,
    0,
]);
/// s * 5e18 * 2^96
const LN_FINAL_SCALE: U256 = U256([
    0x5cef59f0815a5506,
    0xdaa0d5f769dba191,
    0x0000000000001340,
    0,
]);
/// ln(2) * 5e18 * 2^192
const LN_2_SCALED: U256 = U256([
    0xd803ae7b6687f2b3,
    0x7614a3f75373f047,
    0xb3975ab3ee5b203a,
    0x00000267a36c0c95,
]);
/// ln(2^96 / 1e18) * 5e18 * 2^192
const LN_OFFSET: U256 = U256([
    0xe8028c72b8864284,
    0x356a1b7863008a5a,
    0x7177eebf7cd370a3,
    0x000057115e47018c,
]);

const fn word(value: u128) -> U256 {
    U256([value as u64, (value >> 64) as u64, 0, 0])
}

fn is_negative(x: U256) -> bool {
    x.bit(255)
}

fn wrapping_add(a: U256, b: U256) -> U256 {
    a.overflowing_add(b).0
}

fn wrapping_sub(a: U256, b: U256) -> U256 {
    a.overflowing_sub(b).0
}

fn wrapping_mul(a: U256, b: U256) -> U256 {
    a.overflowing_mul(b).0
}

fn negate(x: U256) -> U256 {
    wrapping_add(!x, U256::one())
}

/// Arithmetic shift right
fn sar(x: U256, shift: usize) -> U256 {
    if is_negative(x) {
        !((!x) >> shift)
    } else {
        x >> shift
    }
}

/// Signed division truncating toward zero, like the EVM `sdiv`
fn sdiv(a: U256, b: U256) -> U256 {
    let abs_a = if is_negative(a) { negate(a) } else { a };
    let abs_b = if is_negative(b) { negate(b) } else { b };
    let quotient = abs_a / abs_b;
    if is_negative(a) != is_negative(b) {
        negate(quotient)
    } else {
        quotient
    }
}

fn signed_le(a: U256, b: U256) -> bool {
    I256::from_raw(a) <= I256::from_raw(b)
}

/// `(a * b) / 1e18` with wrapping multiplication and truncating signed division
pub(crate) fn scaled_wrapping_mul(a: I256, b: I256) -> I256 {
    let product = wrapping_mul(a.into_raw(), b.into_raw());
    I256::from_raw(sdiv(product, word(ONE_18)))
}

/// Natural logarithm of a positive 18-decimal fixed-point value
pub fn ln(x: I256) -> Result<I256> {
    if x <= I256::zero() {
        return Err(FixedPointError::InvalidLnInput {
            input: x.to_string(),
        });
    }
    let x = x.into_raw();

    // ln(2^k * x) = k * ln(2) + ln(x), reduce x to (1, 2) * 2^96
    let k = x.bits() as i64 - 1 - 96;
    let mut x = x << ((159 - k) as usize);
    x = x >> 159usize;

    let shr96 = |v: U256| sar(v, 96);

    // (8, 8)-term rational approximation; p is monic
    let mut p = wrapping_add(x, word(3273285459638523848632254066296));
    p = wrapping_add(shr96(wrapping_mul(p, x)), word(24828157081833163892658089445524));
    p = wrapping_add(shr96(wrapping_mul(p, x)), word(43456485725739037958740375743393));
    p = wrapping_sub(shr96(wrapping_mul(p, x)), word(11111509109440967052023855526967));
    p = wrapping_sub(shr96(wrapping_mul(p, x)), word(45023709667254063763336534515857));
    p = wrapping_sub(shr96(wrapping_mul(p, x)), word(14706773417378608786704636184526));
    p = wrapping_sub(
        wrapping_mul(p, x),
        word(795164235651350426258249787498) << 96usize,
    );

    let mut q = wrapping_add(x, word(5573035233440673466300451813936));
    q = wrapping_add(shr96(wrapping_mul(q, x)), word(71694874799317883764090561454958));
    q = wrapping_add(shr96(wrapping_mul(q, x)), word(283447036172924575727196451306956));
    q = wrapping_add(shr96(wrapping_mul(q, x)), word(401686690394027663651624208769553));
    q = wrapping_add(shr96(wrapping_mul(q, x)), word(204048457590392012362485061816622));
    q = wrapping_add(shr96(wrapping_mul(q, x)), word(31853899698501571402653359427138));
    q = wrapping_add(shr96(wrapping_mul(q, x)), word(909429971244387300277376558375));

    // q has no roots in the reduced domain
    let mut r = sdiv(p, q);

    r = wrapping_mul(r, LN_FINAL_SCALE);
    r = wrapping_add(r, wrapping_mul(LN_2_SCALED, I256::from(k).into_raw()));
    r = wrapping_add(r, LN_OFFSET);

    Ok(I256::from_raw(sar(r, 174)))
}

/// Natural exponential of an 18-decimal fixed-point value
///
/// Returns zero when the result would be below 0.5e-18.
pub fn exp(x: I256) -> Result<I256> {
    let raw = x.into_raw();
    if signed_le(raw, EXP_LOWER_BOUND) {
        return Ok(I256::zero());
    }
    if !signed_le(raw, wrapping_sub(EXP_UPPER_BOUND, U256::one())) {
        return Err(FixedPointError::InvalidExpInput {
            input: x.to_string(),
        });
    }

    // Convert to 2^96 basis: multiply by 1e18 / 2^96 = 5^18 / 2^78
    let mut x = sdiv(raw << 78usize, word(3_814_697_265_625));

    // exp(x) = exp(x') * 2^k with k = round(x / ln 2)
    let k = sar(
        wrapping_add(sdiv(x << 96usize, LN_2_X96), U256::one() << 95usize),
        96,
    );
    x = wrapping_sub(x, wrapping_mul(k, LN_2_X96));

    let shr96 = |v: U256| sar(v, 96);

    // (6, 7)-term rational approximation; p is monic
    let mut y = wrapping_add(x, word(1346386616545796478920950773328));
    y = wrapping_add(shr96(wrapping_mul(y, x)), word(57155421227552351082224309758442));
    let mut p = wrapping_sub(
        wrapping_add(y, x),
        word(94201549194550492254356042504812),
    );
    p = wrapping_add(shr96(wrapping_mul(p, y)), word(28719021644029726153956944680412240));
    p = wrapping_add(
        wrapping_mul(p, x),
        word(4385272521454847904659076985693276) << 96usize,
    );

    let mut q = wrapping_sub(x, word(2855989394907223263936484059900));
    q = wrapping_add(shr96(wrapping_mul(q, x)), word(50020603652535783019961831881945));
    q = wrapping_sub(shr96(wrapping_mul(q, x)), word(533845033583426703283633433725380));
    q = wrapping_add(shr96(wrapping_mul(q, x)), word(3604857256930695427073651918091429));
    q = wrapping_sub(shr96(wrapping_mul(q, x)), word(14423608567350463180887372962807573));
    q = wrapping_add(shr96(wrapping_mul(q, x)), word(26449188498355588339934803723976023));

    // q has no real roots, r lands in (0.09, 0.25) * 2^96
    let r = sdiv(p, q);

    // k is in [-61, 195], so the shift is always positive
    let k = k.low_u64() as i64;
    let r = wrapping_mul(r, EXP_FINAL_SCALE) >> ((195 - k) as usize);

    Ok(I256::from_raw(r))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(value: i128) -> I256 {
        I256::from(value)
    }

    #[test]
    fn test_ln_known_values() {
        assert_eq!(ln(int(ONE_18 as i128)).unwrap(), I256::zero());
        assert_eq!(ln(int(2 * ONE_18 as i128)).unwrap(), int(693147180559945309));
        assert_eq!(ln(int(ONE_18 as i128 / 2)).unwrap(), int(-693147180559945310));
        assert_eq!(
            ln(int(1_000_000_000_000_000_000_000_000_000_000_000_000)).unwrap(),
            int(41446531673892822312)
        );
    }

    #[test]
    fn test_ln_rejects_non_positive() {
        assert!(matches!(
            ln(I256::zero()),
            Err(FixedPointError::InvalidLnInput { .. })
        ));
        assert!(ln(int(-5)).is_err());
    }

    #[test]
    fn test_exp_known_values() {
        assert_eq!(exp(I256::zero()).unwrap(), int(ONE_18 as i128));
        assert_eq!(exp(int(ONE_18 as i128)).unwrap(), int(2718281828459045235));
        assert_eq!(exp(int(-(ONE_18 as i128))).unwrap(), int(367879441171442321));
    }

    #[test]
    fn test_exp_bounds() {
        assert_eq!(exp(int(-42139678854452767551)).unwrap(), I256::zero());
        assert_eq!(exp(int(-50 * ONE_18 as i128)).unwrap(), I256::zero());
        assert!(matches!(
            exp(int(135305999368893231589)),
            Err(FixedPointError::InvalidExpInput { .. })
        ));
        assert!(exp(int(135305999368893231588)).is_ok());
    }

    #[test]
    fn test_scaled_wrapping_mul() {
        let half = int(ONE_18 as i128 / 2);
        assert_eq!(scaled_wrapping_mul(half, int(-4 * ONE_18 as i128)), int(-2 * ONE_18 as i128));
    }
}
