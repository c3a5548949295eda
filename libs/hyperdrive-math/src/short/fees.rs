use crate::errors::Result;
use crate::state::State;
use crate::yield_space::YieldSpace;
use ethers_core::types::U256;
use fixed_point::FixedPoint;

impl State {
    /// Curve fee paid in base when opening a short: `phi_c * (1 - p) * dy`
    ///
    /// Rounded up.
    pub fn open_short_curve_fee(&self, bond_amount: FixedPoint) -> Result<FixedPoint> {
        let spot_price = self.calculate_spot_price()?;
        Ok(self
            .curve_fee()
            .mul_up(FixedPoint::ONE.checked_sub(spot_price)?)?
            .mul_up(bond_amount)?)
    }

    /// Governance share of the open short curve fee, in base
    pub fn open_short_governance_fee(
        &self,
        bond_amount: FixedPoint,
        maybe_curve_fee: Option<FixedPoint>,
    ) -> Result<FixedPoint> {
        let curve_fee = match maybe_curve_fee {
            Some(fee) => fee,
            None => self.open_short_curve_fee(bond_amount)?,
        };
        Ok(self.governance_lp_fee().mul_down(curve_fee)?)
    }

    /// Curve fee paid in shares when closing a short, rounded up
    ///
    /// `phi_c * (1 - p) * dy * t / c` where `t` is the time remaining.
    pub fn close_short_curve_fee(
        &self,
        bond_amount: FixedPoint,
        maturity_time: U256,
        current_time: U256,
    ) -> Result<FixedPoint> {
        let time_remaining = self.time_remaining_scaled(current_time, maturity_time)?;
        let spot_price = self.calculate_spot_price()?;
        Ok(self
            .curve_fee()
            .mul_up(FixedPoint::ONE.checked_sub(spot_price)?)?
            .mul_up(bond_amount)?
            .mul_div_up(time_remaining, self.vault_share_price())?)
    }

    /// Flat fee paid in shares on the matured part of a short, rounded up
    pub fn close_short_flat_fee(
        &self,
        bond_amount: FixedPoint,
        maturity_time: U256,
        current_time: U256,
    ) -> Result<FixedPoint> {
        let time_remaining = self.time_remaining_scaled(current_time, maturity_time)?;
        Ok(bond_amount
            .mul_div_up(
                FixedPoint::ONE.checked_sub(time_remaining)?,
                self.vault_share_price(),
            )?
            .mul_up(self.flat_fee())?)
    }
}
