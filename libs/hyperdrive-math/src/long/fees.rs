use crate::errors::Result;
use crate::state::State;
use crate::yield_space::YieldSpace;
use ethers_core::types::U256;
use fixed_point::FixedPoint;

impl State {
    /// Curve fee paid in bonds when opening a long: `phi_c * (1 / p - 1) * dx`
    ///
    /// Rounded up.
    pub fn open_long_curve_fee(&self, base_amount: FixedPoint) -> Result<FixedPoint> {
        let spot_price = self.calculate_spot_price()?;
        Ok(self
            .curve_fee()
            .mul_up(FixedPoint::ONE.div_up(spot_price)?.checked_sub(FixedPoint::ONE)?)?
            .mul_up(base_amount)?)
    }

    /// Governance share of the open long curve fee, in base: `phi_g * fee * p`
    pub fn open_long_governance_fee(
        &self,
        base_amount: FixedPoint,
        maybe_curve_fee: Option<FixedPoint>,
    ) -> Result<FixedPoint> {
        let curve_fee = match maybe_curve_fee {
            Some(fee) => fee,
            None => self.open_long_curve_fee(base_amount)?,
        };
        Ok(self
            .governance_lp_fee()
            .mul_down(curve_fee)?
            .mul_down(self.calculate_spot_price()?)?)
    }

    /// Curve fee paid in shares when closing a long, rounded up
    ///
    /// `phi_c * (1 - p) * dy * t / c` where `t` is the time remaining.
    pub fn close_long_curve_fee(
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

    /// Flat fee paid in shares on the matured part of a long, rounded up
    pub fn close_long_flat_fee(
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_utils::{fixed, test_state, test_state_with_fees, units};

    #[test]
    fn test_fees_vanish_without_rates() {
        let state = test_state();
        assert_eq!(state.open_long_curve_fee(units(100)).unwrap(), FixedPoint::ZERO);
        assert_eq!(
            state.open_long_governance_fee(units(100), None).unwrap(),
            FixedPoint::ZERO
        );
        assert_eq!(
            state
                .close_long_flat_fee(units(100), U256::zero(), U256::from(10u64))
                .unwrap(),
            FixedPoint::ZERO
        );
    }

    #[test]
    fn test_open_long_fees() {
        let state = test_state_with_fees();
        let curve_fee = state.open_long_curve_fee(units(100)).unwrap();
        // 0.05 * (1 / 0.933 - 1) * 100 ~= 0.3589
        assert!(curve_fee > fixed(358_000_000_000_000_000));
        assert!(curve_fee < fixed(360_000_000_000_000_000));

        let governance = state
            .open_long_governance_fee(units(100), Some(curve_fee))
            .unwrap();
        assert_eq!(
            governance,
            state.open_long_governance_fee(units(100), None).unwrap()
        );
        assert!(governance < curve_fee);
    }

    #[test]
    fn test_close_long_fees_split_by_time() {
        let state = test_state_with_fees();
        let year = state.position_duration();

        // At open everything is on the curve
        let curve = state.close_long_curve_fee(units(100), year, U256::zero()).unwrap();
        let flat = state.close_long_flat_fee(units(100), year, U256::zero()).unwrap();
        assert!(curve > FixedPoint::ZERO);
        assert_eq!(flat, FixedPoint::ZERO);

        // At maturity everything is flat: 100 * 0.0005
        let curve = state.close_long_curve_fee(units(100), year, year).unwrap();
        let flat = state.close_long_flat_fee(units(100), year, year).unwrap();
        assert_eq!(curve, FixedPoint::ZERO);
        assert_eq!(flat, fixed(50_000_000_000_000_000));
    }
}
