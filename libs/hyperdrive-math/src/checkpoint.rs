//! Checkpoint and position time arithmetic
//!
//! Positions mature on checkpoint boundaries. A checkpoint time is any
//! timestamp rounded down to a multiple of the checkpoint duration, and the
//! fraction of a position's term still on the curve is measured from the
//! latest checkpoint rather than from the raw timestamp.

use crate::errors::{DomainError, Result};
use crate::state::State;
use ethers_core::types::U256;
use fixed_point::{FixedPoint, FixedPointError};
use serde::{Deserialize, Serialize};

/// How `to_checkpoint_at` treats timestamps after the current time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FutureCheckpointPolicy {
    /// Round future timestamps like any other
    #[default]
    Allow,
    /// Fail with [`DomainError::FutureCheckpoint`]
    Reject,
}

/// Whole seconds as an 18-decimal value
fn scale_seconds(seconds: U256) -> Result<FixedPoint> {
    let scaled = seconds
        .checked_mul(FixedPoint::ONE.raw())
        .ok_or(FixedPointError::Overflow {
            operation: "timestamp scaling",
        })?;
    Ok(FixedPoint::from_raw(scaled))
}

impl State {
    /// Round `time` down to its checkpoint: `time - time % checkpoint_duration`
    pub fn to_checkpoint(&self, time: U256) -> Result<U256> {
        let duration = self.checkpoint_duration();
        if duration.is_zero() {
            return Err(FixedPointError::DivisionByZero.into());
        }
        Ok(time - time % duration)
    }

    /// [`State::to_checkpoint`] with an explicit policy for future times
    pub fn to_checkpoint_at(
        &self,
        time: U256,
        now: U256,
        policy: FutureCheckpointPolicy,
    ) -> Result<U256> {
        if policy == FutureCheckpointPolicy::Reject && time > now {
            return Err(DomainError::FutureCheckpoint { time, now }.into());
        }
        self.to_checkpoint(time)
    }

    /// Fraction of the position duration left before `maturity_time`
    ///
    /// Measured from the checkpoint containing `current_time` and clamped to
    /// `[0, 1]`. Matured positions return zero.
    pub fn time_remaining_scaled(&self, current_time: U256, maturity_time: U256) -> Result<FixedPoint> {
        let latest_checkpoint = self.to_checkpoint(current_time)?;
        if maturity_time <= latest_checkpoint {
            return Ok(FixedPoint::ZERO);
        }
        let remaining = FixedPoint::from_raw(maturity_time - latest_checkpoint)
            .div_down(FixedPoint::from_raw(self.position_duration()))?;
        Ok(remaining.min(FixedPoint::ONE))
    }

    /// Time remaining for an average maturity reported scaled by 1e18
    ///
    /// Average maturities are weighted means, so they keep fractional
    /// seconds; the checkpoint and duration are scaled up to match instead of
    /// truncating the average.
    pub fn average_time_remaining_scaled(
        &self,
        current_time: U256,
        scaled_maturity_time: U256,
    ) -> Result<FixedPoint> {
        let scaled_checkpoint = scale_seconds(self.to_checkpoint(current_time)?)?;
        let scaled_maturity = FixedPoint::from_raw(scaled_maturity_time);
        if scaled_maturity <= scaled_checkpoint {
            return Ok(FixedPoint::ZERO);
        }
        let scaled_duration = scale_seconds(self.position_duration())?;
        Ok(scaled_maturity
            .checked_sub(scaled_checkpoint)?
            .div_down(scaled_duration)?
            .min(FixedPoint::ONE))
    }
}
