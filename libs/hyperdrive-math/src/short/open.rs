use crate::errors::{DomainError, Result};
use crate::state::State;
use crate::yield_space::YieldSpace;
use fixed_point::FixedPoint;
use tracing::trace;

impl State {
    /// Base the trader deposits to short `bond_amount` bonds
    ///
    /// The bonds are sold on the curve; the trader covers par plus the
    /// prepaid flat fee, scaled by the vault growth since the checkpoint
    /// opened, minus what the curve paid. The LP part of the curve fee is
    /// withheld from the curve proceeds. Pass [`super::CHECKPOINT_NOT_MINTED`]
    /// when the checkpoint has no open price yet.
    pub fn calculate_open_short(
        &self,
        bond_amount: FixedPoint,
        open_vault_share_price: FixedPoint,
    ) -> Result<FixedPoint> {
        if bond_amount < self.minimum_transaction_amount() {
            return Err(DomainError::MinimumTransactionAmount {
                amount: bond_amount,
                minimum: self.minimum_transaction_amount(),
            }
            .into());
        }
        let open_vault_share_price = self.resolve_open_vault_share_price(open_vault_share_price);
        let c = self.vault_share_price();

        let share_delta = self.calculate_pool_share_delta_after_open_short(bond_amount)?;
        let base_deposit = self
            .calculate_short_proceeds_up(bond_amount, share_delta, open_vault_share_price, c)?
            .mul_up(c)?;
        trace!(
            bond_amount = %bond_amount,
            share_delta = %share_delta,
            base_deposit = %base_deposit,
            "open short"
        );
        Ok(base_deposit)
    }

    /// Shares paid out of the pool by a short of `bond_amount`
    ///
    /// The curve output less the curve fee the LPs keep. Fails when the curve
    /// would pay more than par, which is a negative interest trade.
    pub fn calculate_pool_share_delta_after_open_short(
        &self,
        bond_amount: FixedPoint,
    ) -> Result<FixedPoint> {
        let c = self.vault_share_price();
        let curve_shares = self.calculate_shares_out_given_bonds_in_down(bond_amount)?;
        if curve_shares.mul_up(c)? > bond_amount {
            return Err(DomainError::NegativeInterest { trade: "open short" }.into());
        }

        let curve_fee = self.open_short_curve_fee(bond_amount)?;
        let governance_fee = self.open_short_governance_fee(bond_amount, Some(curve_fee))?;
        let lp_fee_shares = curve_fee.div_up(c)?.saturating_sub(governance_fee.div_down(c)?);
        Ok(curve_shares.saturating_sub(lp_fee_shares))
    }

    /// Spot price after shorting `bond_amount` bonds
    ///
    /// `maybe_base_amount` is the curve output in base; pass `None` to use
    /// the pool share delta.
    pub fn calculate_spot_price_after_short(
        &self,
        bond_amount: FixedPoint,
        maybe_base_amount: Option<FixedPoint>,
    ) -> Result<FixedPoint> {
        let share_delta = match maybe_base_amount {
            Some(base_amount) => base_amount.div_down(self.vault_share_price())?,
            None => self.calculate_pool_share_delta_after_open_short(bond_amount)?,
        };
        if self.share_reserves() < share_delta {
            return Err(DomainError::InsufficientLiquidity {
                context: "short exceeds the share reserves",
            }
            .into());
        }
        let after = self.with_reserves(
            self.share_reserves().checked_sub(share_delta)?,
            self.bond_reserves().checked_add(bond_amount)?,
        );
        after.calculate_spot_price()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HyperdriveError;
    use crate::short::CHECKPOINT_NOT_MINTED;
    use crate::state::test_utils::{fixed, test_state, test_state_with_fees, units};

    #[test]
    fn test_open_short_deposit_is_par_minus_curve_proceeds() {
        let state = test_state();
        let bonds = units(1_000);
        let deposit = state.calculate_open_short(bonds, units(1)).unwrap();
        let curve_shares = state.calculate_shares_out_given_bonds_in_down(bonds).unwrap();
        assert_eq!(deposit, bonds.checked_sub(curve_shares).unwrap());
        // About 1000 * (1 - 0.933)
        assert!(deposit > units(60) && deposit < units(70), "{deposit}");
    }

    #[test]
    fn test_unminted_checkpoint_uses_current_price() {
        let state = test_state();
        let open_price = fixed(900_000_000_000_000_000);
        let with_sentinel = state
            .calculate_open_short(units(50), CHECKPOINT_NOT_MINTED)
            .unwrap();
        let with_current = state
            .calculate_open_short(units(50), state.vault_share_price())
            .unwrap();
        assert_eq!(with_sentinel, with_current);

        // Vault growth since the checkpoint opened is owed up front
        let with_growth = state.calculate_open_short(units(50), open_price).unwrap();
        assert!(with_growth > with_current);
    }

    #[test]
    fn test_open_short_minimum_transaction() {
        let state = test_state();
        assert!(matches!(
            state.calculate_open_short(fixed(1_000), units(1)),
            Err(HyperdriveError::Domain(DomainError::MinimumTransactionAmount { .. }))
        ));
    }

    #[test]
    fn test_open_short_fees_raise_deposit() {
        let plain = test_state().calculate_open_short(units(1_000), units(1)).unwrap();
        let with_fees = test_state_with_fees()
            .calculate_open_short(units(1_000), units(1))
            .unwrap();
        assert!(with_fees > plain);
    }

    #[test]
    fn test_open_short_at_negative_interest() {
        let mut state = test_state();
        // Share reserves priced above the bonds
        state.info.bond_reserves = units(500_000);
        let result = state.calculate_open_short(units(10), units(1));
        assert!(matches!(result, Err(ref e) if e.is_domain()), "{result:?}");
    }

    #[test]
    fn test_spot_price_after_short_falls() {
        let state = test_state();
        let before = state.calculate_spot_price().unwrap();
        let after = state
            .calculate_spot_price_after_short(units(100), None)
            .unwrap();
        assert!(after < before);

        let curve_shares = state
            .calculate_shares_out_given_bonds_in_down(units(100))
            .unwrap();
        assert_eq!(
            state
                .calculate_spot_price_after_short(units(100), Some(curve_shares))
                .unwrap(),
            after
        );
    }

    #[test]
    fn test_pool_share_delta_keeps_lp_fee() {
        let state = test_state_with_fees();
        let curve_shares = state
            .calculate_shares_out_given_bonds_in_down(units(1_000))
            .unwrap();
        let share_delta = state
            .calculate_pool_share_delta_after_open_short(units(1_000))
            .unwrap();
        assert!(share_delta < curve_shares);
    }
}
