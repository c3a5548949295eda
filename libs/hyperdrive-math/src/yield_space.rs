//! YieldSpace bonding curve
//!
//! The pool prices bonds against vault shares on the invariant
//!
//! ```text
//! k = (c / mu) * (mu * ze)^(1 - t) + y^(1 - t)
//! ```
//!
//! where `ze` is the effective share reserves, `y` the bond reserves, `c` the
//! vault share price, `mu` the initial vault share price and `t` the time
//! stretch. Every conversion below holds `k` fixed and rounds against the
//! trader: amounts paid in round up, amounts paid out round down.

use crate::errors::{DomainError, HyperdriveError, Result};
use crate::state::State;
use crate::utils::calculate_rate_given_fixed_price;
use ethers_core::types::I256;
use fixed_point::{FixedPoint, FixedPointError};

fn insufficient(context: &'static str) -> HyperdriveError {
    DomainError::InsufficientLiquidity { context }.into()
}

/// Curve math over any source of reserves and prices
pub trait YieldSpace {
    /// Share reserves
    fn z(&self) -> FixedPoint;

    /// Share adjustment
    fn zeta(&self) -> I256;

    /// Effective share reserves, `z - zeta`
    fn ze(&self) -> Result<FixedPoint>;

    /// Bond reserves
    fn y(&self) -> FixedPoint;

    /// Vault share price
    fn c(&self) -> FixedPoint;

    /// Initial vault share price
    fn mu(&self) -> FixedPoint;

    /// Time stretch
    fn t(&self) -> FixedPoint;

    /// Minimum share reserves
    fn z_min(&self) -> FixedPoint;

    /// `1 - t`, the curve exponent
    fn one_minus_t(&self) -> Result<FixedPoint> {
        Ok(FixedPoint::ONE.checked_sub(self.t())?)
    }

    /// `(mu * ze / y)^t`
    fn calculate_spot_price(&self) -> Result<FixedPoint> {
        Ok(self.mu().mul_div_down(self.ze()?, self.y())?.pow(self.t())?)
    }

    /// Invariant rounded up
    fn k_up(&self) -> Result<FixedPoint> {
        let one_minus_t = self.one_minus_t()?;
        let share_term = self
            .c()
            .mul_div_up(self.mu().mul_up(self.ze()?)?.pow(one_minus_t)?, self.mu())?;
        Ok(share_term.checked_add(self.y().pow(one_minus_t)?)?)
    }

    /// Invariant rounded down
    fn k_down(&self) -> Result<FixedPoint> {
        let one_minus_t = self.one_minus_t()?;
        let share_term = self
            .c()
            .mul_div_down(self.mu().mul_down(self.ze()?)?.pow(one_minus_t)?, self.mu())?;
        Ok(share_term.checked_add(self.y().pow(one_minus_t)?)?)
    }

    /// Bonds a trader receives for `dz` shares, rounded down
    ///
    /// ```text
    /// dy = y - (k - (c / mu) * (mu * (ze + dz))^(1 - t))^(1 / (1 - t))
    /// ```
    fn calculate_bonds_out_given_shares_in_down(&self, dz: FixedPoint) -> Result<FixedPoint> {
        let one_minus_t = self.one_minus_t()?;
        let k = self.k_up()?;

        let ze = self.mu().mul_down(self.ze()?.checked_add(dz)?)?.pow(one_minus_t)?;
        let ze = self.c().mul_div_down(ze, self.mu())?;
        if k < ze {
            return Err(insufficient("bonds out given shares in exceeds the invariant"));
        }

        let mut y = k.checked_sub(ze)?;
        y = if y >= FixedPoint::ONE {
            // Larger exponent, larger ending reserves, fewer bonds out
            y.pow(FixedPoint::ONE.div_up(one_minus_t)?)?
        } else {
            y.pow(FixedPoint::ONE.div_down(one_minus_t)?)?
        };

        if self.y() <= y {
            return Err(insufficient("bonds out given shares in is not positive"));
        }
        Ok(self.y().checked_sub(y)?)
    }

    /// Shares a trader must pay for `dy` bonds, rounded up
    ///
    /// ```text
    /// dz = (((mu / c) * (k - (y - dy)^(1 - t)))^(1 / (1 - t))) / mu - ze
    /// ```
    fn calculate_shares_in_given_bonds_out_up(&self, dy: FixedPoint) -> Result<FixedPoint> {
        let one_minus_t = self.one_minus_t()?;
        let k = self.k_up()?;

        if self.y() < dy {
            return Err(insufficient("bond amount exceeds the bond reserves"));
        }
        let y = self.y().checked_sub(dy)?.pow(one_minus_t)?;
        if k < y {
            return Err(insufficient("shares in given bonds out exceeds the invariant"));
        }

        let mut z = k.checked_sub(y)?.mul_div_up(self.mu(), self.c())?;
        z = if z >= FixedPoint::ONE {
            z.pow(FixedPoint::ONE.div_up(one_minus_t)?)?
        } else {
            z.pow(FixedPoint::ONE.div_down(one_minus_t)?)?
        };
        z = z.div_up(self.mu())?;

        let ze = self.ze()?;
        if z < ze {
            return Err(insufficient("shares in given bonds out is negative"));
        }
        Ok(z.checked_sub(ze)?)
    }

    /// Shares a trader must pay for `dy` bonds, rounded down
    fn calculate_shares_in_given_bonds_out_down(&self, dy: FixedPoint) -> Result<FixedPoint> {
        let one_minus_t = self.one_minus_t()?;
        let k = self.k_down()?;

        if self.y() < dy {
            return Err(insufficient("bond amount exceeds the bond reserves"));
        }
        let y = self.y().checked_sub(dy)?.pow(one_minus_t)?;
        if k < y {
            return Err(insufficient("shares in given bonds out exceeds the invariant"));
        }

        let mut z = k.checked_sub(y)?.mul_div_down(self.mu(), self.c())?;
        z = if z >= FixedPoint::ONE {
            z.pow(FixedPoint::ONE.div_down(one_minus_t)?)?
        } else {
            z.pow(FixedPoint::ONE.div_up(one_minus_t)?)?
        };
        z = z.div_down(self.mu())?;

        let ze = self.ze()?;
        if z < ze {
            return Err(insufficient("shares in given bonds out is negative"));
        }
        Ok(z.checked_sub(ze)?)
    }

    /// Shares a trader receives for `dy` bonds, rounded down
    ///
    /// ```text
    /// dz = ze - (((mu / c) * (k - (y + dy)^(1 - t)))^(1 / (1 - t))) / mu
    /// ```
    fn calculate_shares_out_given_bonds_in_down(&self, dy: FixedPoint) -> Result<FixedPoint> {
        let one_minus_t = self.one_minus_t()?;
        let k = self.k_up()?;

        let y = self.y().checked_add(dy)?.pow(one_minus_t)?;
        if k < y {
            return Err(insufficient("shares out given bonds in exceeds the invariant"));
        }

        let mut z = k.checked_sub(y)?.mul_div_up(self.mu(), self.c())?;
        z = if z >= FixedPoint::ONE {
            z.pow(FixedPoint::ONE.div_up(one_minus_t)?)?
        } else {
            z.pow(FixedPoint::ONE.div_down(one_minus_t)?)?
        };
        z = z.div_up(self.mu())?;

        let ze = self.ze()?;
        if ze < z {
            return Err(insufficient("shares out given bonds in is negative"));
        }
        Ok(ze.checked_sub(z)?)
    }

    /// Shares that can be traded in before the spot price reaches one
    ///
    /// At a spot price of one `mu * ze = y`, so the invariant gives
    /// `ze = (k / (c / mu + 1))^(1 / (1 - t)) / mu`.
    fn calculate_max_buy_shares_in(&self) -> Result<FixedPoint> {
        let one_minus_t = self.one_minus_t()?;
        let k = self.k_down()?;

        let mut optimal_ze =
            k.div_down(self.c().div_up(self.mu())?.checked_add(FixedPoint::ONE)?)?;
        optimal_ze = if optimal_ze >= FixedPoint::ONE {
            optimal_ze.pow(FixedPoint::ONE.div_down(one_minus_t)?)?
        } else {
            optimal_ze.pow(FixedPoint::ONE.div_up(one_minus_t)?)?
        };
        optimal_ze = optimal_ze.div_down(self.mu())?;

        let ze = self.ze()?;
        if optimal_ze < ze {
            return Err(insufficient("spot price is already above one"));
        }
        Ok(optimal_ze.checked_sub(ze)?)
    }

    /// Bonds that can be bought before the spot price reaches one
    fn calculate_max_buy_bonds_out(&self) -> Result<FixedPoint> {
        let one_minus_t = self.one_minus_t()?;
        let k = self.k_up()?;

        let mut optimal_y =
            k.div_up(self.c().div_down(self.mu())?.checked_add(FixedPoint::ONE)?)?;
        optimal_y = if optimal_y >= FixedPoint::ONE {
            optimal_y.pow(FixedPoint::ONE.div_up(one_minus_t)?)?
        } else {
            optimal_y.pow(FixedPoint::ONE.div_down(one_minus_t)?)?
        };

        if self.y() < optimal_y {
            return Err(insufficient("spot price is already above one"));
        }
        Ok(self.y().checked_sub(optimal_y)?)
    }

    /// Lowest effective share reserves that keep `z >= z_min`
    ///
    /// A negative adjustment raises the floor to `z_min - zeta`.
    fn effective_share_reserves_floor(&self) -> Result<FixedPoint> {
        let zeta = self.zeta();
        if zeta.is_negative() {
            let magnitude = zeta.checked_neg().ok_or(FixedPointError::Overflow {
                operation: "share adjustment negation",
            })?;
            Ok(self.z_min().checked_add(FixedPoint::try_from(magnitude)?)?)
        } else {
            Ok(self.z_min())
        }
    }

    /// Bonds that can be sold before the share reserves reach the floor
    fn calculate_max_sell_bonds_in(&self) -> Result<FixedPoint> {
        let one_minus_t = self.one_minus_t()?;
        let floor = self.effective_share_reserves_floor()?;
        let k = self.k_down()?;

        let share_term = self
            .c()
            .mul_div_up(self.mu().mul_up(floor)?.pow(one_minus_t)?, self.mu())?;
        if k < share_term {
            return Err(insufficient("share reserves are below the minimum"));
        }

        let mut optimal_y = k.checked_sub(share_term)?;
        optimal_y = if optimal_y >= FixedPoint::ONE {
            optimal_y.pow(FixedPoint::ONE.div_down(one_minus_t)?)?
        } else {
            optimal_y.pow(FixedPoint::ONE.div_up(one_minus_t)?)?
        };

        if optimal_y < self.y() {
            return Err(insufficient("share reserves are below the minimum"));
        }
        Ok(optimal_y.checked_sub(self.y())?)
    }

    /// Shares that can leave the pool before the reserves reach the floor
    fn calculate_max_sell_shares_out(&self) -> Result<FixedPoint> {
        let floor = self.effective_share_reserves_floor()?;
        let ze = self.ze()?;
        if ze < floor {
            return Err(insufficient("share reserves are below the minimum"));
        }
        Ok(ze.checked_sub(floor)?)
    }
}

impl YieldSpace for State {
    fn z(&self) -> FixedPoint {
        self.share_reserves()
    }

    fn zeta(&self) -> I256 {
        self.share_adjustment()
    }

    fn ze(&self) -> Result<FixedPoint> {
        self.effective_share_reserves()
    }

    fn y(&self) -> FixedPoint {
        self.bond_reserves()
    }

    fn c(&self) -> FixedPoint {
        self.vault_share_price()
    }

    fn mu(&self) -> FixedPoint {
        self.initial_vault_share_price()
    }

    fn t(&self) -> FixedPoint {
        self.time_stretch()
    }

    fn z_min(&self) -> FixedPoint {
        self.minimum_share_reserves()
    }
}

impl State {
    /// Annualized fixed rate implied by the current spot price
    pub fn calculate_spot_rate(&self) -> Result<FixedPoint> {
        calculate_rate_given_fixed_price(self.calculate_spot_price()?, self.position_duration())
    }

    /// Highest spot price a long may push the pool to
    ///
    /// Beyond `1 / (1 + phi_c * (1 / p - 1))` the curve fee would make the
    /// realized price exceed one, i.e. a negative interest rate.
    pub fn calculate_max_spot_price(&self) -> Result<FixedPoint> {
        let spot_price = self.calculate_spot_price()?;
        let discount = FixedPoint::ONE
            .div_up(spot_price)?
            .checked_sub(FixedPoint::ONE)?;
        Ok(FixedPoint::ONE.div_down(
            FixedPoint::ONE.checked_add(self.curve_fee().mul_up(discount)?)?,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_utils::{fixed, test_state, test_state_with_fees, units};

    fn abs_diff(a: FixedPoint, b: FixedPoint) -> FixedPoint {
        if a > b {
            a.saturating_sub(b)
        } else {
            b.saturating_sub(a)
        }
    }

    #[test]
    fn test_spot_price_and_rate() {
        let state = test_state();
        // (1M / 2M)^0.1
        assert_eq!(
            state.calculate_spot_price().unwrap(),
            fixed(933_032_991_536_807_415)
        );
        let rate = state.calculate_spot_rate().unwrap();
        assert!(rate > fixed(71_000_000_000_000_000) && rate < fixed(72_000_000_000_000_000), "{rate}");
    }

    #[test]
    fn test_max_spot_price() {
        // Without a curve fee the ceiling is one
        assert_eq!(test_state().calculate_max_spot_price().unwrap(), FixedPoint::ONE);

        let state = test_state_with_fees();
        let max_price = state.calculate_max_spot_price().unwrap();
        assert!(max_price < FixedPoint::ONE);
        assert!(max_price > state.calculate_spot_price().unwrap());
    }

    #[test]
    fn test_k_rounding() {
        let state = test_state();
        assert!(state.k_up().unwrap() >= state.k_down().unwrap());
    }

    #[test]
    fn test_buy_and_sell_round_trip() {
        let state = test_state();
        let dz = units(1_000);
        let dy = state.calculate_bonds_out_given_shares_in_down(dz).unwrap();
        // Bonds trade at a discount
        assert!(dy > dz);

        let back_up = state.calculate_shares_in_given_bonds_out_up(dy).unwrap();
        let back_down = state.calculate_shares_in_given_bonds_out_down(dy).unwrap();
        assert!(back_up >= back_down);
        assert!(abs_diff(back_up, dz) < fixed(1_000_000_000_000));

        let out = state.calculate_shares_out_given_bonds_in_down(dy).unwrap();
        assert!(out < dz);
    }

    #[test]
    fn test_bonds_out_rejects_exhausted_curve() {
        let state = test_state();
        assert!(state.calculate_shares_in_given_bonds_out_up(units(2_000_001)).is_err());
    }

    #[test]
    fn test_max_buy_reaches_unit_price() {
        let state = test_state();
        let shares_in = state.calculate_max_buy_shares_in().unwrap();
        let bonds_out = state.calculate_max_buy_bonds_out().unwrap();
        let after = state.with_reserves(
            state.share_reserves().checked_add(shares_in).unwrap(),
            state.bond_reserves().checked_sub(bonds_out).unwrap(),
        );
        let price = after.calculate_spot_price().unwrap();
        assert!(abs_diff(price, FixedPoint::ONE) < fixed(1_000_000_000), "{price}");
    }

    #[test]
    fn test_max_sell_respects_floor() {
        let state = test_state();
        let shares_out = state.calculate_max_sell_shares_out().unwrap();
        assert_eq!(
            shares_out,
            units(1_000_000).checked_sub(state.minimum_share_reserves()).unwrap()
        );
        let bonds_in = state.calculate_max_sell_bonds_in().unwrap();
        assert!(bonds_in > FixedPoint::ZERO);
    }

    #[test]
    fn test_negative_adjustment_raises_floor() {
        let mut state = test_state();
        state.info.share_adjustment = -I256::try_from(units(10)).unwrap();
        assert_eq!(
            state.effective_share_reserves_floor().unwrap(),
            units(10).checked_add(state.minimum_share_reserves()).unwrap()
        );
    }
}
