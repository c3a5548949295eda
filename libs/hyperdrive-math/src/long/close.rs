use crate::errors::{DomainError, Result};
use crate::state::State;
use crate::yield_space::YieldSpace;
use ethers_core::types::U256;
use fixed_point::FixedPoint;

impl State {
    /// Shares received for closing `bond_amount` longs
    ///
    /// The matured fraction `1 - t` redeems at par (`dy * (1 - t) / c`), the
    /// remaining fraction is sold on the curve. Curve and flat fees are then
    /// deducted.
    pub fn calculate_close_long(
        &self,
        bond_amount: FixedPoint,
        maturity_time: U256,
        current_time: U256,
    ) -> Result<FixedPoint> {
        if bond_amount < self.minimum_transaction_amount() {
            return Err(DomainError::MinimumTransactionAmount {
                amount: bond_amount,
                minimum: self.minimum_transaction_amount(),
            }
            .into());
        }

        let time_remaining = self.time_remaining_scaled(current_time, maturity_time)?;
        let flat = bond_amount.mul_div_down(
            FixedPoint::ONE.checked_sub(time_remaining)?,
            self.vault_share_price(),
        )?;
        let curve = if time_remaining > FixedPoint::ZERO {
            self.calculate_shares_out_given_bonds_in_down(bond_amount.mul_down(time_remaining)?)?
        } else {
            FixedPoint::ZERO
        };

        let fees = self
            .close_long_curve_fee(bond_amount, maturity_time, current_time)?
            .checked_add(self.close_long_flat_fee(bond_amount, maturity_time, current_time)?)?;
        let proceeds = flat.checked_add(curve)?;
        if proceeds < fees {
            return Err(DomainError::InsufficientLiquidity {
                context: "close long proceeds do not cover fees",
            }
            .into());
        }
        Ok(proceeds.checked_sub(fees)?)
    }
}
