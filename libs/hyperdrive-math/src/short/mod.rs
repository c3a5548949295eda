//! Short positions
//!
//! A short sells bonds to the curve and deposits the difference between par
//! and the sale proceeds, plus the interest the sold bonds' backing would earn
//! over the term. At close the trader keeps the variable interest earned on
//! that backing minus the cost of buying the bonds back.

mod close;
mod fees;
mod max;
mod open;

use crate::errors::Result;
use crate::state::State;
use fixed_point::FixedPoint;

/// Open vault share price reported for a checkpoint that has not been minted
///
/// Resolved to the current vault share price by
/// [`State::resolve_open_vault_share_price`].
pub const CHECKPOINT_NOT_MINTED: FixedPoint = FixedPoint::ZERO;

impl State {
    /// The checkpoint's open vault share price, or the current one if the
    /// checkpoint has not been minted yet
    pub fn resolve_open_vault_share_price(&self, open_vault_share_price: FixedPoint) -> FixedPoint {
        if open_vault_share_price == CHECKPOINT_NOT_MINTED {
            self.vault_share_price()
        } else {
            open_vault_share_price
        }
    }

    /// Shares owed to a short, rounded up
    ///
    /// ```text
    /// dy * c1 / (c0 * c) + dy * phi_f / c - dz
    /// ```
    ///
    /// where `dz` is the shares the short paid (or, at open, received) on the
    /// curve. Floored at zero.
    pub fn calculate_short_proceeds_up(
        &self,
        bond_amount: FixedPoint,
        share_amount: FixedPoint,
        open_vault_share_price: FixedPoint,
        close_vault_share_price: FixedPoint,
    ) -> Result<FixedPoint> {
        let c = self.vault_share_price();
        let total_value = bond_amount
            .mul_div_up(close_vault_share_price, open_vault_share_price)?
            .div_up(c)?
            .checked_add(bond_amount.mul_div_up(self.flat_fee(), c)?)?;
        Ok(total_value.saturating_sub(share_amount))
    }

    /// [`State::calculate_short_proceeds_up`] rounded down
    pub fn calculate_short_proceeds_down(
        &self,
        bond_amount: FixedPoint,
        share_amount: FixedPoint,
        open_vault_share_price: FixedPoint,
        close_vault_share_price: FixedPoint,
    ) -> Result<FixedPoint> {
        let c = self.vault_share_price();
        let total_value = bond_amount
            .mul_div_down(close_vault_share_price, open_vault_share_price)?
            .div_down(c)?
            .checked_add(bond_amount.mul_div_down(self.flat_fee(), c)?)?;
        Ok(total_value.saturating_sub(share_amount))
    }
}
