//! Stateless pool formulas
//!
//! Helpers that take their inputs explicitly instead of reading a [`State`],
//! so they can be used before a pool exists (deployment sizing) or on values
//! that came from somewhere other than a snapshot.
//!
//! [`State`]: crate::State

use crate::errors::{DomainError, Result};
use ethers_core::types::{I256, U256};
use fixed_point::{FixedPoint, FixedPointError};

/// 365 days, the annualization basis for all rates
pub const SECONDS_PER_YEAR: u64 = 60 * 60 * 24 * 365;

const BENCHMARK_NUMERATOR: FixedPoint = FixedPoint::from_raw_u128(5_245_920_000_000_000_000);
const BENCHMARK_DENOMINATOR: FixedPoint = FixedPoint::from_raw_u128(46_650_000_000_000_000);

fn seconds_in_year() -> FixedPoint {
    FixedPoint::from_raw(U256::from(SECONDS_PER_YEAR))
}

/// `z - zeta`, which must stay strictly positive
pub fn calculate_effective_share_reserves(
    share_reserves: FixedPoint,
    share_adjustment: I256,
) -> Result<FixedPoint> {
    let effective = I256::try_from(share_reserves)?
        .checked_sub(share_adjustment)
        .ok_or(FixedPointError::Overflow {
            operation: "effective share reserves",
        })?;
    if effective <= I256::zero() {
        return Err(DomainError::NonPositiveEffectiveShareReserves {
            share_reserves: share_reserves.raw().to_string(),
            share_adjustment: share_adjustment.to_string(),
        }
        .into());
    }
    Ok(FixedPoint::try_from(effective)?)
}

/// Bond reserves that give a pool the target APR
///
/// Inverts the spot price formula:
///
/// ```text
/// y = mu * (z - zeta) * (1 + apr * t) ^ (1 / t_s)
/// ```
///
/// where `t` is the position duration in years. Rounds down to underestimate
/// the reserves.
pub fn calculate_initial_bond_reserves(
    effective_share_reserves: FixedPoint,
    initial_vault_share_price: FixedPoint,
    apr: FixedPoint,
    position_duration: U256,
    time_stretch: FixedPoint,
) -> Result<FixedPoint> {
    let t = FixedPoint::from_raw(position_duration).div_down(seconds_in_year())?;

    let mut inner = FixedPoint::ONE.checked_add(apr.mul_down(t)?)?;
    if inner >= FixedPoint::ONE {
        // Rounding the exponent down gives a smaller result
        inner = inner.pow(FixedPoint::ONE.div_down(time_stretch)?)?;
    } else {
        inner = inner.pow(FixedPoint::ONE.div_up(time_stretch)?)?;
    }

    Ok(initial_vault_share_price
        .mul_down(effective_share_reserves)?
        .mul_down(inner)?)
}

/// Time stretch tuned for a target rate and position duration
///
/// The one-year benchmark is `1 / (5.24592 / (0.04665 * rate * 100))`. Other
/// durations keep the benchmark reserve ratio and solve
/// `p = ratio ^ t_s` for `t_s = ln(p) / ln(ratio)`.
pub fn calculate_time_stretch(rate: FixedPoint, position_duration: U256) -> Result<FixedPoint> {
    let rate_percent = FixedPoint::from_raw(
        rate.raw()
            .checked_mul(U256::from(100u64))
            .ok_or(FixedPointError::Overflow {
                operation: "rate percent",
            })?,
    );
    let benchmark = BENCHMARK_NUMERATOR.div_down(BENCHMARK_DENOMINATOR.mul_down(rate_percent)?)?;
    let time_stretch = FixedPoint::ONE.div_down(benchmark)?;

    if position_duration == U256::from(SECONDS_PER_YEAR) {
        return Ok(time_stretch);
    }

    // p = 1 / (1 + rate * (duration / 365 days))
    let target_spot_price = FixedPoint::ONE.div_down(
        FixedPoint::ONE.checked_add(
            rate.mul_div_down(FixedPoint::from_raw(position_duration), seconds_in_year())?,
        )?,
    )?;
    let benchmark_reserve_ratio = FixedPoint::ONE.div_down(calculate_initial_bond_reserves(
        FixedPoint::ONE,
        FixedPoint::ONE,
        rate,
        U256::from(SECONDS_PER_YEAR),
        time_stretch,
    )?)?;

    // Both logarithms are negative since both arguments are below one
    let ln_price = negated_ln(target_spot_price)?;
    let ln_ratio = negated_ln(benchmark_reserve_ratio)?;
    Ok(ln_price.div_down(ln_ratio)?)
}

/// `-ln(x)` for `x` in (0, 1]
fn negated_ln(x: FixedPoint) -> Result<FixedPoint> {
    let ln = fixed_point::ln(I256::try_from(x)?)?;
    let negated = ln.checked_neg().ok_or(FixedPointError::Overflow {
        operation: "ln negation",
    })?;
    Ok(FixedPoint::try_from(negated)?)
}

/// Annualized fixed rate implied by a bond price: `(1 - p) / (p * t)`
pub fn calculate_rate_given_fixed_price(price: FixedPoint, position_duration: U256) -> Result<FixedPoint> {
    let t = FixedPoint::from_raw(position_duration).div_down(seconds_in_year())?;
    Ok(FixedPoint::ONE
        .checked_sub(price)?
        .div_down(price.mul_down(t)?)?)
}

/// Bond price implied by an annualized fixed rate: `1 / (1 + r * t)`
pub fn calculate_fixed_price_given_rate(rate: FixedPoint, position_duration: U256) -> Result<FixedPoint> {
    let t = FixedPoint::from_raw(position_duration).div_down(seconds_in_year())?;
    Ok(FixedPoint::ONE.div_down(FixedPoint::ONE.checked_add(rate.mul_down(t)?)?)?)
}
