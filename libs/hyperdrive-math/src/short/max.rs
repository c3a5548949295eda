use crate::errors::{DomainError, Result};
use crate::solver::{domain_to_none, SolverOutcome, DEFAULT_ALLOWABLE_ERROR, DEFAULT_MAX_ITERATIONS};
use crate::state::State;
use crate::yield_space::YieldSpace;
use ethers_core::types::I256;
use fixed_point::FixedPoint;
use tracing::{debug, warn};

impl State {
    /// Largest short, in bonds, whose deposit fits within `budget`
    ///
    /// The short is bounded by the curve (the share reserves may not fall
    /// below the floor), by solvency, and by the budget. `conservative_price`
    /// is an optional lower bound on the realized price that speeds up the
    /// first guess; without it the first guess assumes a zero price.
    pub fn calculate_max_short(
        &self,
        budget: FixedPoint,
        open_vault_share_price: FixedPoint,
        checkpoint_exposure: I256,
        maybe_conservative_price: Option<FixedPoint>,
        maybe_max_iterations: Option<usize>,
    ) -> Result<FixedPoint> {
        Ok(self
            .calculate_max_short_with_diagnostics(
                budget,
                open_vault_share_price,
                checkpoint_exposure,
                maybe_conservative_price,
                maybe_max_iterations,
            )?
            .value)
    }

    /// [`State::calculate_max_short`] with convergence details
    ///
    /// The residual is the unspent part of the budget, in base.
    pub fn calculate_max_short_with_diagnostics(
        &self,
        budget: FixedPoint,
        open_vault_share_price: FixedPoint,
        checkpoint_exposure: I256,
        maybe_conservative_price: Option<FixedPoint>,
        maybe_max_iterations: Option<usize>,
    ) -> Result<SolverOutcome> {
        if budget.is_zero() {
            return Ok(SolverOutcome::exact(FixedPoint::ZERO));
        }
        let max_iterations = maybe_max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
        let open_vault_share_price = self.resolve_open_vault_share_price(open_vault_share_price);
        let spot_price = self.calculate_spot_price()?;

        let absolute_max_bond_amount =
            self.calculate_absolute_max_short(checkpoint_exposure, Some(max_iterations))?;
        if absolute_max_bond_amount < self.minimum_transaction_amount() {
            return Ok(SolverOutcome::exact(FixedPoint::ZERO));
        }
        let deposit_at = |bond_amount: FixedPoint| -> Result<Option<FixedPoint>> {
            domain_to_none(self.calculate_open_short(bond_amount, open_vault_share_price))
        };
        if let Some(deposit) = deposit_at(absolute_max_bond_amount)? {
            if deposit <= budget {
                debug!(
                    absolute_max_bond_amount = %absolute_max_bond_amount,
                    deposit = %deposit,
                    "absolute max short fits the budget"
                );
                return Ok(SolverOutcome {
                    value: absolute_max_bond_amount,
                    iterations: 0,
                    residual: budget.checked_sub(deposit)?,
                    converged: true,
                });
            }
        }

        let (mut best, mut best_deposit) = match self.max_short_guess(
            budget,
            open_vault_share_price,
            spot_price,
            maybe_conservative_price,
            absolute_max_bond_amount,
        )? {
            Some(guess) => guess,
            None => {
                debug!("budget does not cover the minimum short");
                return Ok(SolverOutcome::exact(FixedPoint::ZERO));
            }
        };

        // D(x) is convex: steps from below land above the root and are pulled
        // back with the flatter slope at the best valid point
        let mut bond_amount = best;
        let mut deposit = best_deposit;
        let mut iterations = 0;
        for iteration in 0..max_iterations {
            if budget.checked_sub(best_deposit)? < DEFAULT_ALLOWABLE_ERROR {
                break;
            }
            let derivative = match domain_to_none(self.short_deposit_derivative(
                bond_amount,
                open_vault_share_price,
                spot_price,
            ))? {
                Some(derivative) => derivative,
                None => break,
            };
            bond_amount = if deposit <= budget {
                bond_amount.checked_add(budget.checked_sub(deposit)?.div_down(derivative)?)?
            } else {
                bond_amount.saturating_sub(deposit.checked_sub(budget)?.div_up(derivative)?)
            }
            .min(absolute_max_bond_amount);
            iterations = iteration + 1;

            deposit = match deposit_at(bond_amount)? {
                Some(deposit) => deposit,
                None => break,
            };
            if deposit <= budget {
                if bond_amount > best {
                    best = bond_amount;
                    best_deposit = deposit;
                }
            } else if let Some((pulled_back, pulled_back_deposit)) = self.pull_back_short(
                bond_amount,
                deposit,
                budget,
                best,
                open_vault_share_price,
                spot_price,
            )? {
                if pulled_back > best {
                    best = pulled_back;
                    best_deposit = pulled_back_deposit;
                }
            }
            debug!(
                iteration,
                bond_amount = %bond_amount,
                deposit = %deposit,
                best = %best,
                "max short newton step"
            );
        }

        let residual = budget.checked_sub(best_deposit)?;
        let converged = residual < DEFAULT_ALLOWABLE_ERROR || best == absolute_max_bond_amount;
        if !converged {
            warn!(
                iterations,
                bond_amount = %best,
                unspent_budget = %residual,
                "max short did not converge, returning best valid guess"
            );
        }
        Ok(SolverOutcome {
            value: best,
            iterations,
            residual,
            converged,
        })
    }

    /// Largest short the pool can absorb, ignoring the budget
    ///
    /// Starts from the curve limit. If that short would leave the pool
    /// insolvent, Newton's method walks solvency down to zero from the
    /// linearized estimate `S0 * c / (p - phi_c * (1 - p) * (1 - phi_g))`.
    /// Solvency is convex and decreasing in the short size, so the steps stay
    /// on the solvent side.
    pub fn calculate_absolute_max_short(
        &self,
        checkpoint_exposure: I256,
        maybe_max_iterations: Option<usize>,
    ) -> Result<FixedPoint> {
        let max_iterations = maybe_max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
        let curve_max = self.calculate_max_sell_bonds_in()?;
        if domain_to_none(self.solvency_after_short(curve_max, checkpoint_exposure))?.is_some() {
            return Ok(curve_max);
        }

        let c = self.vault_share_price();
        let spot_price = self.calculate_spot_price()?;
        let lp_fee_rate = self.short_lp_fee_rate(spot_price)?;
        if spot_price <= lp_fee_rate {
            return Err(DomainError::DegenerateDerivative {
                context: "absolute max short",
            }
            .into());
        }
        let initial_solvency = self.calculate_solvency()?;
        let mut bond_amount = initial_solvency
            .mul_div_down(c, spot_price.checked_sub(lp_fee_rate)?)?
            .min(curve_max);
        let mut solvency = match domain_to_none(self.solvency_after_short(bond_amount, checkpoint_exposure))? {
            Some(solvency) => solvency,
            None => return Ok(FixedPoint::ZERO),
        };

        for iteration in 0..max_iterations {
            if solvency <= DEFAULT_ALLOWABLE_ERROR {
                break;
            }
            let derivative = match domain_to_none(
                self.solvency_after_short_derivative_negation(bond_amount, checkpoint_exposure, spot_price),
            )? {
                Some(derivative) if !derivative.is_zero() => derivative,
                _ => break,
            };
            let candidate = bond_amount
                .checked_add(solvency.div_down(derivative)?)?
                .min(curve_max);
            match domain_to_none(self.solvency_after_short(candidate, checkpoint_exposure))? {
                Some(candidate_solvency) => {
                    bond_amount = candidate;
                    solvency = candidate_solvency;
                }
                None => break,
            }
            debug!(
                iteration,
                bond_amount = %bond_amount,
                solvency = %solvency,
                "absolute max short newton step"
            );
        }
        Ok(bond_amount)
    }

    /// Solvency after shorting `bond_amount`
    ///
    /// ```text
    /// S = z - dz - (e - min(max(ce, 0), dy)) / c - z_min
    /// ```
    ///
    /// where `dz` is the pool share delta and `ce` the long exposure in the
    /// checkpoint that the new short nets against.
    pub fn solvency_after_short(
        &self,
        bond_amount: FixedPoint,
        checkpoint_exposure: I256,
    ) -> Result<FixedPoint> {
        let c = self.vault_share_price();
        let share_delta = self.calculate_pool_share_delta_after_open_short(bond_amount)?;
        let netted = netted_long_exposure(checkpoint_exposure)?.min(bond_amount);
        let exposure = self.long_exposure().saturating_sub(netted);

        let required = share_delta
            .checked_add(exposure.div_down(c)?)?
            .checked_add(self.minimum_share_reserves())?;
        if self.share_reserves() < required {
            return Err(DomainError::Insolvent {
                context: "short drains reserves backing long exposure",
            }
            .into());
        }
        Ok(self.share_reserves().checked_sub(required)?)
    }

    /// `-S'(x) = (p_m(x) - phi_c * (1 - p) * (1 - phi_g) - n) / c`
    ///
    /// `n` is one while the short still nets against checkpoint exposure.
    fn solvency_after_short_derivative_negation(
        &self,
        bond_amount: FixedPoint,
        checkpoint_exposure: I256,
        spot_price: FixedPoint,
    ) -> Result<FixedPoint> {
        let mut offset = self.short_lp_fee_rate(spot_price)?;
        if bond_amount < netted_long_exposure(checkpoint_exposure)? {
            offset = offset.checked_add(FixedPoint::ONE)?;
        }
        let marginal_price = self.short_marginal_price(bond_amount)?;
        if marginal_price <= offset {
            return Err(DomainError::DegenerateDerivative {
                context: "max short solvency",
            }
            .into());
        }
        Ok(marginal_price
            .checked_sub(offset)?
            .div_down(self.vault_share_price())?)
    }

    /// `D'(x) = c / c0 + phi_f + phi_c * (1 - p) * (1 - phi_g) - p_m(x)`
    fn short_deposit_derivative(
        &self,
        bond_amount: FixedPoint,
        open_vault_share_price: FixedPoint,
        spot_price: FixedPoint,
    ) -> Result<FixedPoint> {
        let cost = self
            .vault_share_price()
            .div_up(open_vault_share_price)?
            .checked_add(self.flat_fee())?
            .checked_add(self.short_lp_fee_rate(spot_price)?)?;
        let marginal_price = self.short_marginal_price(bond_amount)?;
        if cost <= marginal_price {
            return Err(DomainError::DegenerateDerivative {
                context: "max short deposit",
            }
            .into());
        }
        Ok(cost.checked_sub(marginal_price)?)
    }

    /// Price of the next bond sold after a short of `bond_amount`
    ///
    /// ```text
    /// p_m(x) = ((mu / c) * (k - (y + x)^(1 - t)))^(t / (1 - t)) / (y + x)^t
    /// ```
    fn short_marginal_price(&self, bond_amount: FixedPoint) -> Result<FixedPoint> {
        let t = self.time_stretch();
        let one_minus_t = self.one_minus_t()?;
        let bond_reserves = self.bond_reserves().checked_add(bond_amount)?;

        let k = self.k_down()?;
        let bond_term = bond_reserves.pow(one_minus_t)?;
        if k < bond_term {
            return Err(DomainError::InsufficientLiquidity {
                context: "short exhausts the curve",
            }
            .into());
        }
        let inner = self
            .initial_vault_share_price()
            .div_down(self.vault_share_price())?
            .mul_down(k.checked_sub(bond_term)?)?;
        Ok(inner
            .pow(t.div_down(one_minus_t)?)?
            .div_down(bond_reserves.pow(t)?)?)
    }

    /// LP part of the short curve fee per bond: `phi_c * (1 - p) * (1 - phi_g)`
    fn short_lp_fee_rate(&self, spot_price: FixedPoint) -> Result<FixedPoint> {
        Ok(self
            .curve_fee()
            .mul_down(FixedPoint::ONE.checked_sub(spot_price)?)?
            .mul_down(FixedPoint::ONE.checked_sub(self.governance_lp_fee())?)?)
    }

    /// First valid guess and its deposit, `None` if no short fits
    ///
    /// `B / (c / c0 + phi_f + phi_c * (1 - p) - p_r)` spends at most the
    /// budget whenever `p_r` is at or below the realized price. The caller's
    /// conservative price is tried first, then `p_r = 0`.
    fn max_short_guess(
        &self,
        budget: FixedPoint,
        open_vault_share_price: FixedPoint,
        spot_price: FixedPoint,
        maybe_conservative_price: Option<FixedPoint>,
        absolute_max_bond_amount: FixedPoint,
    ) -> Result<Option<(FixedPoint, FixedPoint)>> {
        let worst_case_cost = self
            .vault_share_price()
            .div_up(open_vault_share_price)?
            .checked_add(self.flat_fee())?
            .checked_add(
                self.curve_fee()
                    .mul_up(FixedPoint::ONE.checked_sub(spot_price)?)?,
            )?;

        let mut guesses = Vec::with_capacity(2);
        if let Some(conservative_price) = maybe_conservative_price {
            if conservative_price < worst_case_cost {
                guesses.push(budget.div_down(worst_case_cost.checked_sub(conservative_price)?)?);
            }
        }
        guesses.push(budget.div_down(worst_case_cost)?);

        for guess in guesses {
            let guess = guess.min(absolute_max_bond_amount);
            if guess < self.minimum_transaction_amount() {
                continue;
            }
            if let Some(deposit) =
                domain_to_none(self.calculate_open_short(guess, open_vault_share_price))?
            {
                if deposit <= budget {
                    return Ok(Some((guess, deposit)));
                }
            }
        }
        Ok(None)
    }

    /// Step back from an overshoot using the slope at the best valid point
    fn pull_back_short(
        &self,
        bond_amount: FixedPoint,
        deposit: FixedPoint,
        budget: FixedPoint,
        best: FixedPoint,
        open_vault_share_price: FixedPoint,
        spot_price: FixedPoint,
    ) -> Result<Option<(FixedPoint, FixedPoint)>> {
        let slope = match domain_to_none(self.short_deposit_derivative(
            best,
            open_vault_share_price,
            spot_price,
        ))? {
            Some(slope) => slope,
            None => return Ok(None),
        };
        let candidate = bond_amount.saturating_sub(deposit.checked_sub(budget)?.div_up(slope)?);
        if candidate <= best {
            return Ok(None);
        }
        Ok(
            domain_to_none(self.calculate_open_short(candidate, open_vault_share_price))?
                .filter(|candidate_deposit| *candidate_deposit <= budget)
                .map(|candidate_deposit| (candidate, candidate_deposit)),
        )
    }
}

/// Long exposure in the current checkpoint that offsets new shorts
///
/// `max(checkpoint_exposure, 0)`: only a net long checkpoint releases
/// reserves for shorts.
fn netted_long_exposure(checkpoint_exposure: I256) -> Result<FixedPoint> {
    if checkpoint_exposure.is_negative() {
        return Ok(FixedPoint::ZERO);
    }
    Ok(FixedPoint::try_from(checkpoint_exposure)?)
}
