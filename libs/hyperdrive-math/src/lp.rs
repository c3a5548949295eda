//! LP valuation and solvency
//!
//! LP capital is worth the share reserves after closing every outstanding
//! position against the pool: the part of each position still on the curve is
//! traded on the curve (up to what the curve can absorb) and the matured part
//! settles at the flat price.

use crate::errors::{DomainError, Result};
use crate::state::State;
use crate::yield_space::YieldSpace;
use ethers_core::types::{I256, U256};
use fixed_point::{FixedPoint, FixedPointError};
use tracing::trace;

fn signed(value: FixedPoint) -> Result<I256> {
    Ok(I256::try_from(value)?)
}

fn signed_add(a: I256, b: I256) -> Result<I256> {
    Ok(a.checked_add(b).ok_or(FixedPointError::Overflow {
        operation: "present value",
    })?)
}

fn signed_sub(a: I256, b: I256) -> Result<I256> {
    Ok(a.checked_sub(b).ok_or(FixedPointError::Overflow {
        operation: "present value",
    })?)
}

impl State {
    /// Share reserves not needed to back long exposure: `z - e / c - z_min`
    ///
    /// Fails with [`DomainError::Insolvent`] when the reserves fall short.
    pub fn calculate_solvency(&self) -> Result<FixedPoint> {
        let exposure_shares = self.long_exposure().div_down(self.vault_share_price())?;
        let required = exposure_shares.checked_add(self.minimum_share_reserves())?;
        if self.share_reserves() < required {
            return Err(DomainError::Insolvent {
                context: "share reserves do not cover long exposure",
            }
            .into());
        }
        Ok(self.share_reserves().checked_sub(required)?)
    }

    /// Shares available for withdrawal, zero when everything backs exposure
    pub fn calculate_idle_share_reserves(&self) -> Result<FixedPoint> {
        let exposure_shares = self.long_exposure().div_up(self.vault_share_price())?;
        let required = exposure_shares.checked_add(self.minimum_share_reserves())?;
        Ok(self.share_reserves().saturating_sub(required))
    }

    pub fn calculate_idle_share_reserves_in_base(&self) -> Result<FixedPoint> {
        Ok(self
            .calculate_idle_share_reserves()?
            .mul_down(self.vault_share_price())?)
    }

    /// Present value of LP capital in shares at `current_time`
    ///
    /// `z + curve_trade + flat_trade - z_min`, failing if negative.
    pub fn calculate_present_value(&self, current_time: U256) -> Result<FixedPoint> {
        let long_time_remaining =
            self.average_time_remaining_scaled(current_time, self.long_average_maturity_time())?;
        let short_time_remaining =
            self.average_time_remaining_scaled(current_time, self.short_average_maturity_time())?;

        let curve_trade = self.calculate_net_curve_trade(long_time_remaining, short_time_remaining)?;
        let flat_trade = self.calculate_net_flat_trade(long_time_remaining, short_time_remaining)?;

        let present_value = signed_sub(
            signed_add(
                signed_add(signed(self.share_reserves())?, curve_trade)?,
                flat_trade,
            )?,
            signed(self.minimum_share_reserves())?,
        )?;
        trace!(
            curve_trade = %curve_trade,
            flat_trade = %flat_trade,
            present_value = %present_value,
            "present value"
        );
        if present_value.is_negative() {
            return Err(DomainError::Insolvent {
                context: "negative present value",
            }
            .into());
        }
        Ok(FixedPoint::try_from(present_value)?)
    }

    /// Share change from closing the curve portion of all positions
    ///
    /// A net long position is sold to the pool, which pays shares out
    /// (negative); a net short position is bought back, which pays shares in
    /// (positive). Whatever exceeds the curve's capacity is marked at the
    /// flat price.
    pub fn calculate_net_curve_trade(
        &self,
        long_time_remaining: FixedPoint,
        short_time_remaining: FixedPoint,
    ) -> Result<I256> {
        let longs = self.longs_outstanding().mul_down(long_time_remaining)?;
        let shorts = self.shorts_outstanding().mul_down(short_time_remaining)?;
        let c = self.vault_share_price();

        if longs > shorts {
            let net_position = longs.checked_sub(shorts)?;
            let max_curve_trade = self.calculate_max_sell_bonds_in()?;
            if max_curve_trade >= net_position {
                match self.calculate_shares_out_given_bonds_in_down(net_position) {
                    Ok(shares) => Ok(-signed(shares)?),
                    Err(_) if net_position < self.minimum_transaction_amount() => Ok(I256::zero()),
                    Err(err) => Err(err),
                }
            } else {
                let max_share_payment = self.calculate_max_sell_shares_out()?;
                let remainder = net_position.checked_sub(max_curve_trade)?.div_down(c)?;
                Ok(-signed(max_share_payment.checked_add(remainder)?)?)
            }
        } else if shorts > longs {
            let net_position = shorts.checked_sub(longs)?;
            let max_curve_trade = self.calculate_max_buy_bonds_out()?;
            if max_curve_trade >= net_position {
                match self.calculate_shares_in_given_bonds_out_up(net_position) {
                    Ok(shares) => signed(shares),
                    Err(_) if net_position < self.minimum_transaction_amount() => Ok(I256::zero()),
                    Err(err) => Err(err),
                }
            } else {
                let max_share_payment = self.calculate_max_buy_shares_in()?;
                let remainder = net_position.checked_sub(max_curve_trade)?.div_down(c)?;
                signed(max_share_payment.checked_add(remainder)?)
            }
        } else {
            Ok(I256::zero())
        }
    }

    /// Share change from settling the matured portion of all positions
    ///
    /// `shorts * (1 - t_s) / c - longs * (1 - t_l) / c`
    pub fn calculate_net_flat_trade(
        &self,
        long_time_remaining: FixedPoint,
        short_time_remaining: FixedPoint,
    ) -> Result<I256> {
        let c = self.vault_share_price();
        let short_flat = self
            .shorts_outstanding()
            .mul_div_down(FixedPoint::ONE.checked_sub(short_time_remaining)?, c)?;
        let long_flat = self
            .longs_outstanding()
            .mul_div_up(FixedPoint::ONE.checked_sub(long_time_remaining)?, c)?;
        signed_sub(signed(short_flat)?, signed(long_flat)?)
    }
}
