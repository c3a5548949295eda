use crate::errors::{DomainError, Result};
use crate::solver::{domain_to_none, SolverOutcome, DEFAULT_ALLOWABLE_ERROR, DEFAULT_MAX_ITERATIONS};
use crate::state::State;
use crate::yield_space::YieldSpace;
use ethers_core::types::I256;
use fixed_point::FixedPoint;
use tracing::{debug, warn};

impl State {
    /// Long, in base, that brings the spot rate down to `target_rate`
    ///
    /// The answer never exceeds [`State::calculate_max_long`] for the same
    /// budget and checkpoint exposure. A target equal to the current rate
    /// needs no trade; a target above it cannot be reached with a long.
    pub fn calculate_targeted_long_with_budget(
        &self,
        budget: FixedPoint,
        target_rate: FixedPoint,
        checkpoint_exposure: I256,
        maybe_max_iterations: Option<usize>,
        maybe_allowable_error: Option<FixedPoint>,
    ) -> Result<FixedPoint> {
        Ok(self
            .calculate_targeted_long_with_diagnostics(
                budget,
                target_rate,
                checkpoint_exposure,
                maybe_max_iterations,
                maybe_allowable_error,
            )?
            .value)
    }

    /// [`State::calculate_targeted_long_with_budget`] with convergence details
    ///
    /// The residual is the distance between the spot rate after the returned
    /// long and the target.
    pub fn calculate_targeted_long_with_diagnostics(
        &self,
        budget: FixedPoint,
        target_rate: FixedPoint,
        checkpoint_exposure: I256,
        maybe_max_iterations: Option<usize>,
        maybe_allowable_error: Option<FixedPoint>,
    ) -> Result<SolverOutcome> {
        let max_iterations = maybe_max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
        let allowable_error = maybe_allowable_error.unwrap_or(DEFAULT_ALLOWABLE_ERROR);

        let spot_rate = self.calculate_spot_rate()?;
        if target_rate > spot_rate {
            return Err(DomainError::UnreachableTargetRate {
                target: target_rate,
                spot_rate,
            }
            .into());
        }
        if target_rate == spot_rate {
            return Ok(SolverOutcome::exact(FixedPoint::ZERO));
        }

        let max_long =
            self.calculate_max_long(budget, checkpoint_exposure, Some(max_iterations))?;

        // Closed form that ignores fees; exact without them and an
        // underestimate with them, so Newton only has to walk forward
        let (target_share_reserves, _) = self.reserves_given_rate(target_rate)?;
        let estimate = self.long_base_to_reach(target_share_reserves)?;

        let mut base_amount = estimate.max(self.minimum_transaction_amount());
        let mut best = FixedPoint::ZERO;
        let mut loss = spot_rate.checked_sub(target_rate)?;
        let mut iterations = 0;
        for iteration in 0..max_iterations {
            if base_amount >= max_long {
                debug!(
                    base_amount = %base_amount,
                    max_long = %max_long,
                    "targeted long capped at max long"
                );
                let residual = self.targeted_long_loss(max_long, target_rate)?.unwrap_or(loss);
                return Ok(SolverOutcome {
                    value: max_long,
                    iterations,
                    residual,
                    converged: true,
                });
            }

            let rate_after =
                match domain_to_none(self.calculate_spot_rate_after_long(base_amount, None))? {
                    Some(rate) => rate,
                    None => break,
                };
            if rate_after < target_rate {
                debug!(
                    iteration,
                    base_amount = %base_amount,
                    rate_after = %rate_after,
                    "targeted long overshot, keeping previous guess"
                );
                break;
            }
            best = base_amount;
            loss = rate_after.checked_sub(target_rate)?;
            iterations = iteration + 1;
            debug!(
                iteration,
                base_amount = %base_amount,
                rate_after = %rate_after,
                loss = %loss,
                "targeted long newton step"
            );
            if loss < allowable_error {
                break;
            }

            let derivative =
                match domain_to_none(self.negative_rate_after_long_derivative(base_amount))? {
                    Some(derivative) if !derivative.is_zero() => derivative,
                    _ => break,
                };
            base_amount = base_amount.checked_add(loss.div_down(derivative)?)?;
        }

        let converged = loss < allowable_error;
        if !converged {
            warn!(
                iterations,
                base_amount = %best,
                loss = %loss,
                "targeted long did not converge, returning best guess"
            );
        }
        Ok(SolverOutcome {
            value: best.min(max_long),
            iterations,
            residual: loss,
            converged,
        })
    }

    /// Effective share and bond reserves at which the spot rate equals `rate`
    ///
    /// Holds `k` fixed. With `s = (1 + r * t)^(1 / t_s)`:
    ///
    /// ```text
    /// mu * ze_t = (k / (c / mu + s^(1 - t_s)))^(1 / (1 - t_s))
    /// y_t       = mu * ze_t * s
    /// ```
    pub(crate) fn reserves_given_rate(&self, rate: FixedPoint) -> Result<(FixedPoint, FixedPoint)> {
        let ts = self.time_stretch();
        let one_minus_t = self.one_minus_t()?;
        let c = self.vault_share_price();
        let mu = self.initial_vault_share_price();

        let ratio = FixedPoint::ONE
            .checked_add(rate.mul_down(self.annualized_position_duration()?)?)?
            .pow(FixedPoint::ONE.div_down(ts)?)?;
        let mut inner = self
            .k_down()?
            .div_down(c.div_down(mu)?.checked_add(ratio.pow(one_minus_t)?)?)?;
        inner = if inner >= FixedPoint::ONE {
            inner.pow(FixedPoint::ONE.div_down(one_minus_t)?)?
        } else {
            inner.pow(FixedPoint::ONE.div_up(one_minus_t)?)?
        };
        Ok((inner.div_down(mu)?, inner.mul_down(ratio)?))
    }

    /// Base needed to move the effective share reserves to `target`
    fn long_base_to_reach(&self, target_share_reserves: FixedPoint) -> Result<FixedPoint> {
        Ok(target_share_reserves
            .saturating_sub(self.effective_share_reserves()?)
            .mul_down(self.vault_share_price())?)
    }

    /// `rate_after(x) - target`, `None` when the long is not valid
    fn targeted_long_loss(
        &self,
        base_amount: FixedPoint,
        target_rate: FixedPoint,
    ) -> Result<Option<FixedPoint>> {
        if base_amount < self.minimum_transaction_amount() {
            return Ok(None);
        }
        Ok(domain_to_none(self.calculate_spot_rate_after_long(base_amount, None))?
            .map(|rate| rate.saturating_sub(target_rate)))
    }

    /// `-r'(x)` for the spot rate after a long of `x`
    ///
    /// With `r = (1 - p) / (p * t)` the rate falls as the price rises:
    /// `-r'(x) = p'(x) / (t * p^2)`. The price is `v^t_s` with
    /// `v = mu * (ze + dz(x)) / (y - dy(x))`, so `p' = t_s * p * v' / v` and
    ///
    /// ```text
    /// -r'(x) = t_s * v' / (v * t * p)
    /// v'     = (a' * b + a * dy') / b^2
    /// ```
    ///
    /// where `a` and `b` are the numerator and denominator of `v`, `a'` nets
    /// out the governance fee and `dy'` is the pool's bond outflow rate.
    fn negative_rate_after_long_derivative(&self, base_amount: FixedPoint) -> Result<FixedPoint> {
        let c = self.vault_share_price();
        let mu = self.initial_vault_share_price();
        let ts = self.time_stretch();
        let spot_price = self.calculate_spot_price()?;

        let (share_delta, bond_delta) =
            self.calculate_pool_deltas_after_open_long(base_amount, None)?;
        if self.bond_reserves() <= bond_delta {
            return Err(DomainError::InsufficientLiquidity {
                context: "targeted long exceeds the bond reserves",
            }
            .into());
        }
        let numerator = mu.mul_down(self.effective_share_reserves()?.checked_add(share_delta)?)?;
        let denominator = self.bond_reserves().checked_sub(bond_delta)?;

        let governance_rate = self
            .governance_lp_fee()
            .mul_down(self.curve_fee())?
            .mul_down(FixedPoint::ONE.checked_sub(spot_price)?)?;
        let numerator_derivative =
            mu.mul_div_down(FixedPoint::ONE.checked_sub(governance_rate)?, c)?;

        let lp_fee_rate = FixedPoint::ONE
            .checked_sub(self.governance_lp_fee())?
            .mul_up(
                self.curve_fee()
                    .mul_up(FixedPoint::ONE.div_up(spot_price)?.checked_sub(FixedPoint::ONE)?)?,
            )?;
        let curve_derivative = self.long_curve_derivative(base_amount)?;
        if curve_derivative <= lp_fee_rate {
            return Err(DomainError::DegenerateDerivative {
                context: "targeted long bond outflow",
            }
            .into());
        }
        let bond_outflow_derivative = curve_derivative.checked_sub(lp_fee_rate)?;

        let ratio = numerator.div_down(denominator)?;
        let ratio_derivative = numerator_derivative
            .mul_down(denominator)?
            .checked_add(numerator.mul_down(bond_outflow_derivative)?)?
            .div_down(denominator.mul_down(denominator)?)?;
        let price = ratio.pow(ts)?;

        Ok(ts.mul_down(ratio_derivative)?.div_down(
            ratio
                .mul_down(self.annualized_position_duration()?)?
                .mul_down(price)?,
        )?)
    }
}
