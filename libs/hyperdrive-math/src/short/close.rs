use crate::errors::{DomainError, Result};
use crate::state::State;
use crate::yield_space::YieldSpace;
use ethers_core::types::U256;
use fixed_point::FixedPoint;
use tracing::trace;

impl State {
    /// Shares returned for closing `bond_amount` shorts
    ///
    /// The trader buys the bonds back: the matured fraction at par
    /// (`dy * (1 - t) / c`) and the rest on the curve, plus curve and flat
    /// fees, all rounded up. What is left of the short's value after that
    /// cost is returned, floored at zero.
    pub fn calculate_close_short(
        &self,
        bond_amount: FixedPoint,
        open_vault_share_price: FixedPoint,
        close_vault_share_price: FixedPoint,
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
        let open_vault_share_price = self.resolve_open_vault_share_price(open_vault_share_price);

        let time_remaining = self.time_remaining_scaled(current_time, maturity_time)?;
        let flat = bond_amount.mul_div_up(
            FixedPoint::ONE.checked_sub(time_remaining)?,
            self.vault_share_price(),
        )?;
        let curve = if time_remaining > FixedPoint::ZERO {
            self.calculate_shares_in_given_bonds_out_up(bond_amount.mul_up(time_remaining)?)?
        } else {
            FixedPoint::ZERO
        };
        let fees = self
            .close_short_curve_fee(bond_amount, maturity_time, current_time)?
            .checked_add(self.close_short_flat_fee(bond_amount, maturity_time, current_time)?)?;
        let cost = flat.checked_add(curve)?.checked_add(fees)?;

        let proceeds = self.calculate_short_proceeds_down(
            bond_amount,
            cost,
            open_vault_share_price,
            close_vault_share_price,
        )?;
        trace!(
            bond_amount = %bond_amount,
            cost = %cost,
            proceeds = %proceeds,
            "close short"
        );
        Ok(proceeds)
    }
}
