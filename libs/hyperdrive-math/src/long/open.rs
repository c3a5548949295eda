use crate::errors::{DomainError, Result};
use crate::state::State;
use crate::utils::calculate_rate_given_fixed_price;
use crate::yield_space::YieldSpace;
use fixed_point::FixedPoint;
use tracing::trace;

impl State {
    /// Bonds received for `base_amount` of base
    ///
    /// The base is converted to shares at the current vault share price and
    /// traded on the curve; the curve fee is taken out of the bonds. Fails if
    /// the amount is below the minimum transaction amount or if the trade
    /// would push the spot price past [`State::calculate_max_spot_price`].
    pub fn calculate_open_long(&self, base_amount: FixedPoint) -> Result<FixedPoint> {
        if base_amount < self.minimum_transaction_amount() {
            return Err(DomainError::MinimumTransactionAmount {
                amount: base_amount,
                minimum: self.minimum_transaction_amount(),
            }
            .into());
        }

        let share_amount = base_amount.div_down(self.vault_share_price())?;
        let bond_amount = self.calculate_bonds_out_given_shares_in_down(share_amount)?;

        let spot_price_after = self.calculate_spot_price_after_long(base_amount, Some(bond_amount))?;
        if spot_price_after > self.calculate_max_spot_price()? {
            return Err(DomainError::NegativeInterest { trade: "open long" }.into());
        }

        let curve_fee = self.open_long_curve_fee(base_amount)?;
        if bond_amount <= curve_fee {
            return Err(DomainError::NegativeInterest { trade: "open long" }.into());
        }
        trace!(
            base_amount = %base_amount,
            bond_amount = %bond_amount,
            curve_fee = %curve_fee,
            "open long"
        );
        Ok(bond_amount.checked_sub(curve_fee)?)
    }

    /// Share and bond reserve deltas applied to the pool by a long
    ///
    /// `bond_amount` is the gross curve output; pass `None` to compute it.
    /// Shares grow by `dx / c` less the governance fee. Bonds shrink by the
    /// curve output less the part of the curve fee kept by LPs.
    pub fn calculate_pool_deltas_after_open_long(
        &self,
        base_amount: FixedPoint,
        maybe_bond_amount: Option<FixedPoint>,
    ) -> Result<(FixedPoint, FixedPoint)> {
        let c = self.vault_share_price();
        let share_amount = base_amount.div_down(c)?;
        let bond_amount = match maybe_bond_amount {
            Some(bonds) => bonds,
            None => self.calculate_bonds_out_given_shares_in_down(share_amount)?,
        };

        let curve_fee = self.open_long_curve_fee(base_amount)?;
        let governance_fee = self.open_long_governance_fee(base_amount, Some(curve_fee))?;
        let governance_fee_bonds = self.governance_lp_fee().mul_down(curve_fee)?;

        let share_delta = share_amount.checked_sub(governance_fee.div_down(c)?)?;
        let bond_delta = bond_amount.checked_sub(curve_fee.checked_sub(governance_fee_bonds)?)?;
        Ok((share_delta, bond_delta))
    }

    /// Spot price after opening a long of `base_amount`
    pub fn calculate_spot_price_after_long(
        &self,
        base_amount: FixedPoint,
        maybe_bond_amount: Option<FixedPoint>,
    ) -> Result<FixedPoint> {
        let (share_delta, bond_delta) =
            self.calculate_pool_deltas_after_open_long(base_amount, maybe_bond_amount)?;
        if self.bond_reserves() < bond_delta {
            return Err(DomainError::InsufficientLiquidity {
                context: "long exceeds the bond reserves",
            }
            .into());
        }
        let after = self.with_reserves(
            self.share_reserves().checked_add(share_delta)?,
            self.bond_reserves().checked_sub(bond_delta)?,
        );
        after.calculate_spot_price()
    }

    /// Spot rate after opening a long of `base_amount`
    pub fn calculate_spot_rate_after_long(
        &self,
        base_amount: FixedPoint,
        maybe_bond_amount: Option<FixedPoint>,
    ) -> Result<FixedPoint> {
        calculate_rate_given_fixed_price(
            self.calculate_spot_price_after_long(base_amount, maybe_bond_amount)?,
            self.position_duration(),
        )
    }
}
