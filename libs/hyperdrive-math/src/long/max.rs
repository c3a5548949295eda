use super::netted_checkpoint_exposure;
use crate::errors::{DomainError, Result};
use crate::solver::{domain_to_none, SolverOutcome, DEFAULT_ALLOWABLE_ERROR, DEFAULT_MAX_ITERATIONS};
use crate::state::State;
use crate::yield_space::YieldSpace;
use ethers_core::types::I256;
use fixed_point::FixedPoint;
use tracing::{debug, warn};

/// Upper weight given to a unit price when bootstrapping the realized price
const REALIZED_PRICE_WEIGHT: FixedPoint = FixedPoint::from_raw_u128(800_000_000_000_000_000);

impl State {
    /// Largest long, in base, the pool can absorb within `budget`
    ///
    /// The long is bounded by the curve (the spot price may not pass the
    /// max spot price) and by solvency. When the curve bound is solvent the
    /// answer is immediate; otherwise Newton's method walks solvency down to
    /// zero from a conservative estimate.
    pub fn calculate_max_long(
        &self,
        budget: FixedPoint,
        checkpoint_exposure: I256,
        maybe_max_iterations: Option<usize>,
    ) -> Result<FixedPoint> {
        Ok(self
            .calculate_max_long_with_diagnostics(budget, checkpoint_exposure, maybe_max_iterations)?
            .value)
    }

    /// [`State::calculate_max_long`] with convergence details
    pub fn calculate_max_long_with_diagnostics(
        &self,
        budget: FixedPoint,
        checkpoint_exposure: I256,
        maybe_max_iterations: Option<usize>,
    ) -> Result<SolverOutcome> {
        let max_iterations = maybe_max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
        let spot_price = self.calculate_spot_price()?;

        let (absolute_max_base_amount, absolute_max_bond_amount) =
            self.calculate_absolute_max_long()?;
        if domain_to_none(self.solvency_after_long(
            absolute_max_base_amount,
            absolute_max_bond_amount,
            checkpoint_exposure,
        ))?
        .is_some()
        {
            debug!(
                absolute_max_base_amount = %absolute_max_base_amount,
                "absolute max long is solvent"
            );
            return Ok(SolverOutcome::exact(absolute_max_base_amount.min(budget)));
        }

        // Fails when the pool is insolvent before any trade
        let initial_solvency =
            self.solvency_after_long(FixedPoint::ZERO, FixedPoint::ZERO, checkpoint_exposure)?;

        // S(x) decreases in x, so step with x + S(x) / -S'(x)
        let (mut base_amount, mut solvency) = self.max_long_guess(
            absolute_max_base_amount,
            spot_price,
            checkpoint_exposure,
            initial_solvency,
        )?;
        let mut iterations = 0;
        for iteration in 0..max_iterations {
            if base_amount >= budget {
                return Ok(SolverOutcome {
                    value: budget,
                    iterations,
                    residual: solvency,
                    converged: true,
                });
            }
            if solvency <= DEFAULT_ALLOWABLE_ERROR {
                break;
            }

            let derivative = match domain_to_none(
                self.solvency_after_long_derivative_negation(base_amount, spot_price),
            )? {
                Some(derivative) if !derivative.is_zero() => derivative,
                _ => break,
            };
            let candidate = base_amount.checked_add(solvency.div_down(derivative)?)?;
            iterations = iteration + 1;
            if candidate >= absolute_max_base_amount {
                break;
            }
            match self.long_solvency_at(candidate, checkpoint_exposure)? {
                Some(candidate_solvency) => {
                    base_amount = candidate;
                    solvency = candidate_solvency;
                }
                None => break,
            }
            debug!(
                iteration,
                base_amount = %base_amount,
                solvency = %solvency,
                "max long newton step"
            );
        }

        let converged = solvency <= DEFAULT_ALLOWABLE_ERROR;
        if !converged {
            warn!(
                iterations,
                base_amount = %base_amount,
                solvency = %solvency,
                "max long did not converge, returning best solvent guess"
            );
        }
        Ok(SolverOutcome {
            value: base_amount.min(budget),
            iterations,
            residual: solvency,
            converged,
        })
    }

    /// Long that moves the spot price to the max spot price
    ///
    /// Returns `(base_amount, bond_amount)`. With curve fee `phi_c` the ending
    /// price is `1 / (1 + phi_c * (1 / p - 1))`, which pins the ending
    /// reserves to
    ///
    /// ```text
    /// ze_t = (k / (c / mu + (1 + phi_c * (1 / p - 1))^((1 - t) / t)))^(1 / (1 - t)) / mu
    /// y_t  = mu * ze_t * (1 + phi_c * (1 / p - 1))^(1 / t)
    /// ```
    pub fn calculate_absolute_max_long(&self) -> Result<(FixedPoint, FixedPoint)> {
        let spot_price = self.calculate_spot_price()?;
        let t = self.time_stretch();
        let one_minus_t = self.one_minus_t()?;
        let c = self.vault_share_price();
        let mu = self.initial_vault_share_price();

        let fee_term = FixedPoint::ONE.checked_add(
            self.curve_fee()
                .mul_up(FixedPoint::ONE.div_up(spot_price)?.checked_sub(FixedPoint::ONE)?)?,
        )?;

        let denominator = c
            .div_up(mu)?
            .checked_add(fee_term.pow(one_minus_t.div_up(t)?)?)?;
        let mut target_share_reserves = self.k_down()?.div_down(denominator)?;
        target_share_reserves = if target_share_reserves >= FixedPoint::ONE {
            target_share_reserves.pow(FixedPoint::ONE.div_down(one_minus_t)?)?
        } else {
            target_share_reserves.pow(FixedPoint::ONE.div_up(one_minus_t)?)?
        };
        target_share_reserves = target_share_reserves.div_down(mu)?;

        let target_bond_reserves = mu
            .mul_down(target_share_reserves)?
            .mul_down(fee_term.pow(FixedPoint::ONE.div_up(t)?)?)?;

        let effective_share_reserves = self.effective_share_reserves()?;
        if target_share_reserves < effective_share_reserves || self.bond_reserves() < target_bond_reserves {
            return Err(DomainError::InsufficientLiquidity {
                context: "spot price is already at the max spot price",
            }
            .into());
        }

        let base_amount = target_share_reserves
            .checked_sub(effective_share_reserves)?
            .mul_down(c)?;
        let gross_bonds = self.bond_reserves().checked_sub(target_bond_reserves)?;
        let curve_fee = self.open_long_curve_fee(base_amount)?;
        if gross_bonds < curve_fee {
            return Err(DomainError::NegativeInterest {
                trade: "absolute max long",
            }
            .into());
        }
        Ok((base_amount, gross_bonds.checked_sub(curve_fee)?))
    }

    /// Solvency after a long of `base_amount` paying out `bond_amount`
    ///
    /// ```text
    /// S = z + (dx - g) / c + ce / c - (e + dy) / c - z_min
    /// ```
    ///
    /// where `g` is the governance fee and `ce` the short exposure in the
    /// checkpoint that nets against the new long.
    pub fn solvency_after_long(
        &self,
        base_amount: FixedPoint,
        bond_amount: FixedPoint,
        checkpoint_exposure: I256,
    ) -> Result<FixedPoint> {
        let c = self.vault_share_price();
        let governance_fee_shares = self
            .open_long_governance_fee(base_amount, None)?
            .div_down(c)?;
        let share_reserves = self
            .share_reserves()
            .checked_add(base_amount.div_down(c)?)?
            .checked_sub(governance_fee_shares)?;
        let exposure = self.long_exposure().checked_add(bond_amount)?;
        let netted = netted_checkpoint_exposure(checkpoint_exposure)?;

        let available = share_reserves.checked_add(netted.div_down(c)?)?;
        let required = exposure
            .div_down(c)?
            .checked_add(self.minimum_share_reserves())?;
        if available < required {
            return Err(DomainError::Insolvent {
                context: "long exposure exceeds share reserves",
            }
            .into());
        }
        Ok(available.checked_sub(required)?)
    }

    /// `-S'(x) = (y'(x) + phi_g * phi_c * (1 - p) - 1) / c`
    ///
    /// Fails with [`DomainError::DegenerateDerivative`] when solvency is not
    /// decreasing at `base_amount`.
    pub(crate) fn solvency_after_long_derivative_negation(
        &self,
        base_amount: FixedPoint,
        spot_price: FixedPoint,
    ) -> Result<FixedPoint> {
        let derivative = self.long_amount_derivative(base_amount, spot_price)?;
        let governance = self
            .governance_lp_fee()
            .mul_down(self.curve_fee())?
            .mul_down(FixedPoint::ONE.checked_sub(spot_price)?)?;
        let numerator = derivative.checked_add(governance)?;
        if numerator <= FixedPoint::ONE {
            return Err(DomainError::DegenerateDerivative {
                context: "max long solvency",
            }
            .into());
        }
        Ok(numerator
            .checked_sub(FixedPoint::ONE)?
            .div_down(self.vault_share_price())?)
    }

    /// Bonds received per unit of base at `base_amount`, net of the curve fee
    ///
    /// The curve part is [`State::long_curve_derivative`]; the fee part is
    /// `phi_c * (1 / p - 1)`.
    pub(crate) fn long_amount_derivative(
        &self,
        base_amount: FixedPoint,
        spot_price: FixedPoint,
    ) -> Result<FixedPoint> {
        let derivative = self.long_curve_derivative(base_amount)?;
        let fee = self
            .curve_fee()
            .mul_up(FixedPoint::ONE.div_up(spot_price)?.checked_sub(FixedPoint::ONE)?)?;
        if derivative < fee {
            return Err(DomainError::NegativeInterest {
                trade: "long derivative",
            }
            .into());
        }
        Ok(derivative.checked_sub(fee)?)
    }

    /// Marginal curve output in bonds per unit of base at `base_amount`
    ///
    /// ```text
    /// (mu * z')^(-t) * (k - (c / mu) * (mu * z')^(1 - t))^(t / (1 - t))
    /// ```
    ///
    /// with `z' = ze + x / c`.
    pub(crate) fn long_curve_derivative(&self, base_amount: FixedPoint) -> Result<FixedPoint> {
        let t = self.time_stretch();
        let one_minus_t = self.one_minus_t()?;
        let c = self.vault_share_price();
        let mu = self.initial_vault_share_price();

        let inner = mu.mul_down(
            self.effective_share_reserves()?
                .checked_add(base_amount.div_down(c)?)?,
        )?;
        let derivative = FixedPoint::ONE.div_down(inner.pow(t)?)?;

        let k = self.k_down()?;
        let share_term = c.mul_div_down(inner.pow(one_minus_t)?, mu)?;
        if k < share_term {
            return Err(DomainError::InsufficientLiquidity {
                context: "long exhausts the curve",
            }
            .into());
        }
        let mut bond_term = k.checked_sub(share_term)?;
        bond_term = if bond_term >= FixedPoint::ONE {
            bond_term.pow(t.div_up(one_minus_t)?)?
        } else {
            bond_term.pow(t.div_down(one_minus_t)?)?
        };
        Ok(derivative.mul_down(bond_term)?)
    }

    /// Solvency after opening a long of `base_amount`, `None` if invalid
    fn long_solvency_at(
        &self,
        base_amount: FixedPoint,
        checkpoint_exposure: I256,
    ) -> Result<Option<FixedPoint>> {
        let bond_amount = match domain_to_none(self.calculate_open_long(base_amount))? {
            Some(bonds) => bonds,
            None => return Ok(None),
        };
        domain_to_none(self.solvency_after_long(base_amount, bond_amount, checkpoint_exposure))
    }

    /// First Newton guess and its solvency
    ///
    /// The spot-price estimate overshoots little because bonds get more
    /// expensive as the long grows. It is refined once by moving the assumed
    /// realized price toward one in proportion to the size of the long. The
    /// refined guess is used if solvent, then the plain estimate, then zero.
    fn max_long_guess(
        &self,
        absolute_max_base_amount: FixedPoint,
        spot_price: FixedPoint,
        checkpoint_exposure: I256,
        initial_solvency: FixedPoint,
    ) -> Result<(FixedPoint, FixedPoint)> {
        let estimate = self.max_long_estimate(spot_price, spot_price, initial_solvency)?;

        let refined = if absolute_max_base_amount.is_zero() {
            estimate
        } else {
            let ratio = estimate.div_down(absolute_max_base_amount)?.min(FixedPoint::ONE);
            let weight = ratio
                .pow(FixedPoint::ONE.div_up(self.one_minus_t()?)?)?
                .mul_down(REALIZED_PRICE_WEIGHT)?;
            let estimate_price = spot_price
                .mul_down(FixedPoint::ONE.checked_sub(weight)?)?
                .checked_add(weight)?;
            self.max_long_estimate(estimate_price, spot_price, initial_solvency)?
        };

        for guess in [refined, estimate] {
            if guess.is_zero() {
                continue;
            }
            if let Some(solvency) = self.long_solvency_at(guess, checkpoint_exposure)? {
                return Ok((guess, solvency));
            }
        }
        Ok((FixedPoint::ZERO, initial_solvency))
    }

    /// Linearized max long at an assumed realized price
    ///
    /// ```text
    /// x = S0 * c / (1 / p_r + phi_g * phi_c * (1 - p) - 1 - phi_c * (1 / p - 1))
    /// ```
    ///
    /// Zero when the denominator is not positive.
    fn max_long_estimate(
        &self,
        estimate_price: FixedPoint,
        spot_price: FixedPoint,
        initial_solvency: FixedPoint,
    ) -> Result<FixedPoint> {
        let gains = FixedPoint::ONE.div_down(estimate_price)?.checked_add(
            self.governance_lp_fee()
                .mul_down(self.curve_fee())?
                .mul_down(FixedPoint::ONE.checked_sub(spot_price)?)?,
        )?;
        let costs = FixedPoint::ONE.checked_add(
            self.curve_fee()
                .mul_down(FixedPoint::ONE.div_down(spot_price)?.checked_sub(FixedPoint::ONE)?)?,
        )?;
        if gains <= costs {
            return Ok(FixedPoint::ZERO);
        }
        Ok(initial_solvency
            .mul_down(self.vault_share_price())?
            .div_down(gains.checked_sub(costs)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HyperdriveError;
    use crate::state::test_utils::{test_state, test_state_with_fees, units};
    use test_log::test;

    #[test]
    fn test_absolute_max_long_reaches_unit_price() {
        let state = test_state();
        let (base, bonds) = state.calculate_absolute_max_long().unwrap();
        assert!(base > units(491_000) && base < units(492_000), "{base}");
        assert!(bonds > base);
    }

    #[test]
    fn test_max_long_limited_by_budget() {
        let state = test_state();
        assert_eq!(
            state
                .calculate_max_long(units(1), I256::from(10_000i64), Some(20))
                .unwrap(),
            units(1)
        );
    }

    #[test]
    fn test_max_long_unconstrained_is_absolute_max() {
        let state = test_state();
        let (absolute, _) = state.calculate_absolute_max_long().unwrap();
        let outcome = state
            .calculate_max_long_with_diagnostics(units(10_000_000), I256::zero(), None)
            .unwrap();
        assert_eq!(outcome.value, absolute);
        assert!(outcome.converged);
    }

    #[test]
    fn test_max_long_limited_by_solvency() {
        let mut state = test_state();
        state.info.long_exposure = units(990_000);
        let outcome = state
            .calculate_max_long_with_diagnostics(units(1_000_000), I256::zero(), None)
            .unwrap();
        // Solvency binds around 172_122 base
        assert!(outcome.value > units(172_000) && outcome.value < units(172_200), "{}", outcome.value);
        assert!(outcome.converged);

        let bonds = state.calculate_open_long(outcome.value).unwrap();
        assert!(state
            .solvency_after_long(outcome.value, bonds, I256::zero())
            .is_ok());
    }

    #[test]
    fn test_checkpoint_exposure_frees_reserves() {
        let mut state = test_state();
        state.info.long_exposure = units(990_000);
        let plain = state
            .calculate_max_long(units(1_000_000), I256::zero(), None)
            .unwrap();
        let netted = state
            .calculate_max_long(
                units(1_000_000),
                -I256::try_from(units(1_000)).unwrap(),
                None,
            )
            .unwrap();
        assert!(netted > plain);
    }

    #[test]
    fn test_max_long_on_insolvent_pool() {
        let mut state = test_state();
        state.info.long_exposure = units(2_000_000);
        assert!(matches!(
            state.calculate_max_long(units(100), I256::zero(), None),
            Err(HyperdriveError::Domain(DomainError::Insolvent { .. }))
        ));
    }

    #[test]
    fn test_max_long_with_fees_is_solvent() {
        let mut state = test_state_with_fees();
        state.info.long_exposure = units(990_000);
        let max_long = state
            .calculate_max_long(units(1_000_000), I256::zero(), None)
            .unwrap();
        assert!(max_long > FixedPoint::ZERO);
        let bonds = state.calculate_open_long(max_long).unwrap();
        assert!(state
            .solvency_after_long(max_long, bonds, I256::zero())
            .is_ok());
    }
}
