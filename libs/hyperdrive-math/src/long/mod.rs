//! Long positions
//!
//! A long pays base now for bonds that redeem at par at maturity. Opening a
//! long buys bonds from the curve and pushes the spot price toward one;
//! closing sells the unmatured part back to the curve.

mod close;
mod fees;
mod max;
mod open;
mod targeted;

use crate::errors::Result;
use ethers_core::types::I256;
use fixed_point::{FixedPoint, FixedPointError};

/// Short exposure in the current checkpoint that offsets new longs
///
/// `-min(checkpoint_exposure, 0)`: only a net short checkpoint releases
/// reserves for longs.
pub(crate) fn netted_checkpoint_exposure(checkpoint_exposure: I256) -> Result<FixedPoint> {
    if !checkpoint_exposure.is_negative() {
        return Ok(FixedPoint::ZERO);
    }
    let magnitude = checkpoint_exposure
        .checked_neg()
        .ok_or(FixedPointError::Overflow {
            operation: "checkpoint exposure negation",
        })?;
    Ok(FixedPoint::try_from(magnitude)?)
}
