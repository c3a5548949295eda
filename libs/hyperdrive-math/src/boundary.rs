//! Decimal-string interface
//!
//! Host-language bindings pass every amount as a base-10 integer string
//! (18-decimal fixed point for amounts and prices, whole seconds for times,
//! signed for checkpoint exposure) and read every result back the same way.
//! [`HyperdriveState`] wraps a [`State`] and exposes each engine operation in
//! that form. Malformed input fails with [`HyperdriveError::Conversion`]
//! naming the offending parameter; nothing in this module panics.
//!
//! Optional parameters left as `None` fall back to the [`EngineSettings`]
//! the wrapper was built with.

use crate::errors::{HyperdriveError, IntegerKind, Result};
use crate::settings::EngineSettings;
use crate::short::CHECKPOINT_NOT_MINTED;
use crate::state::schema::PoolSnapshot;
use crate::state::State;
use crate::utils;
use crate::yield_space::YieldSpace;
use ethers_core::types::{I256, U256};
use fixed_point::FixedPoint;

fn is_unsigned_decimal(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn parse_u256(field: &str, value: &str) -> Result<U256> {
    if !is_unsigned_decimal(value) {
        return Err(HyperdriveError::conversion(field, IntegerKind::U256));
    }
    U256::from_dec_str(value).map_err(|_| HyperdriveError::conversion(field, IntegerKind::U256))
}

fn parse_fixed(field: &str, value: &str) -> Result<FixedPoint> {
    parse_u256(field, value).map(FixedPoint::from_raw)
}

fn parse_optional_fixed(field: &str, value: Option<&str>) -> Result<Option<FixedPoint>> {
    value.map(|value| parse_fixed(field, value)).transpose()
}

fn parse_i256(field: &str, value: &str) -> Result<I256> {
    let digits = value.strip_prefix('-').unwrap_or(value);
    if !is_unsigned_decimal(digits) {
        return Err(HyperdriveError::conversion(field, IntegerKind::I256));
    }
    I256::from_dec_str(value).map_err(|_| HyperdriveError::conversion(field, IntegerKind::I256))
}

fn render(value: FixedPoint) -> String {
    value.raw().to_string()
}

/// Effective share reserves `z - zeta`
pub fn calculate_effective_share_reserves(
    share_reserves: &str,
    share_adjustment: &str,
) -> Result<String> {
    utils::calculate_effective_share_reserves(
        parse_fixed("share_reserves", share_reserves)?,
        parse_i256("share_adjustment", share_adjustment)?,
    )
    .map(render)
}

/// Bond reserves that set a fresh pool's rate to `apr`
pub fn calculate_initial_bond_reserves(
    effective_share_reserves: &str,
    initial_vault_share_price: &str,
    apr: &str,
    position_duration: &str,
    time_stretch: &str,
) -> Result<String> {
    utils::calculate_initial_bond_reserves(
        parse_fixed("effective_share_reserves", effective_share_reserves)?,
        parse_fixed("initial_vault_share_price", initial_vault_share_price)?,
        parse_fixed("apr", apr)?,
        parse_u256("position_duration", position_duration)?,
        parse_fixed("time_stretch", time_stretch)?,
    )
    .map(render)
}

pub fn calculate_time_stretch(rate: &str, position_duration: &str) -> Result<String> {
    utils::calculate_time_stretch(
        parse_fixed("rate", rate)?,
        parse_u256("position_duration", position_duration)?,
    )
    .map(render)
}

/// A pool state with a decimal-string interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyperdriveState {
    state: State,
    settings: EngineSettings,
}

impl HyperdriveState {
    pub fn new(state: State) -> Self {
        Self::with_settings(state, EngineSettings::default())
    }

    pub fn with_settings(state: State, settings: EngineSettings) -> Self {
        Self { state, settings }
    }

    /// Migrate a snapshot of any supported version into a wrapper
    pub fn from_snapshot(snapshot: PoolSnapshot, settings: EngineSettings) -> Result<Self> {
        Ok(Self::with_settings(snapshot.migrate()?, settings))
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn max_iterations(&self, maybe_max_iterations: Option<usize>) -> usize {
        maybe_max_iterations.unwrap_or(self.settings.solver.max_iterations)
    }

    // Pricing

    pub fn calculate_spot_price(&self) -> Result<String> {
        self.state.calculate_spot_price().map(render)
    }

    pub fn calculate_spot_rate(&self) -> Result<String> {
        self.state.calculate_spot_rate().map(render)
    }

    pub fn calculate_max_spot_price(&self) -> Result<String> {
        self.state.calculate_max_spot_price().map(render)
    }

    pub fn calculate_spot_price_after_long(
        &self,
        base_amount: &str,
        bond_amount: Option<&str>,
    ) -> Result<String> {
        self.state
            .calculate_spot_price_after_long(
                parse_fixed("base_amount", base_amount)?,
                parse_optional_fixed("bond_amount", bond_amount)?,
            )
            .map(render)
    }

    pub fn calculate_spot_rate_after_long(
        &self,
        base_amount: &str,
        bond_amount: Option<&str>,
    ) -> Result<String> {
        self.state
            .calculate_spot_rate_after_long(
                parse_fixed("base_amount", base_amount)?,
                parse_optional_fixed("bond_amount", bond_amount)?,
            )
            .map(render)
    }

    pub fn calculate_spot_price_after_short(
        &self,
        bond_amount: &str,
        base_amount: Option<&str>,
    ) -> Result<String> {
        self.state
            .calculate_spot_price_after_short(
                parse_fixed("bond_amount", bond_amount)?,
                parse_optional_fixed("base_amount", base_amount)?,
            )
            .map(render)
    }

    pub fn calculate_bonds_out_given_shares_in_down(&self, amount_in: &str) -> Result<String> {
        self.state
            .calculate_bonds_out_given_shares_in_down(parse_fixed("amount_in", amount_in)?)
            .map(render)
    }

    pub fn calculate_shares_in_given_bonds_out_up(&self, amount_in: &str) -> Result<String> {
        self.state
            .calculate_shares_in_given_bonds_out_up(parse_fixed("amount_in", amount_in)?)
            .map(render)
    }

    pub fn calculate_shares_in_given_bonds_out_down(&self, amount_in: &str) -> Result<String> {
        self.state
            .calculate_shares_in_given_bonds_out_down(parse_fixed("amount_in", amount_in)?)
            .map(render)
    }

    pub fn calculate_shares_out_given_bonds_in_down(&self, amount_in: &str) -> Result<String> {
        self.state
            .calculate_shares_out_given_bonds_in_down(parse_fixed("amount_in", amount_in)?)
            .map(render)
    }

    // Trades

    pub fn calculate_open_long(&self, base_amount: &str) -> Result<String> {
        self.state
            .calculate_open_long(parse_fixed("base_amount", base_amount)?)
            .map(render)
    }

    pub fn calculate_close_long(
        &self,
        bond_amount: &str,
        maturity_time: &str,
        current_time: &str,
    ) -> Result<String> {
        self.state
            .calculate_close_long(
                parse_fixed("bond_amount", bond_amount)?,
                parse_u256("maturity_time", maturity_time)?,
                parse_u256("current_time", current_time)?,
            )
            .map(render)
    }

    /// Base deposit for a short; `None` for an unminted checkpoint
    pub fn calculate_open_short(
        &self,
        bond_amount: &str,
        open_vault_share_price: Option<&str>,
    ) -> Result<String> {
        let open_vault_share_price =
            parse_optional_fixed("open_vault_share_price", open_vault_share_price)?
                .unwrap_or(CHECKPOINT_NOT_MINTED);
        self.state
            .calculate_open_short(parse_fixed("bond_amount", bond_amount)?, open_vault_share_price)
            .map(render)
    }

    pub fn calculate_close_short(
        &self,
        bond_amount: &str,
        open_vault_share_price: &str,
        close_vault_share_price: &str,
        maturity_time: &str,
        current_time: &str,
    ) -> Result<String> {
        self.state
            .calculate_close_short(
                parse_fixed("bond_amount", bond_amount)?,
                parse_fixed("open_vault_share_price", open_vault_share_price)?,
                parse_fixed("close_vault_share_price", close_vault_share_price)?,
                parse_u256("maturity_time", maturity_time)?,
                parse_u256("current_time", current_time)?,
            )
            .map(render)
    }

    // Fees

    pub fn open_long_curve_fee(&self, base_amount: &str) -> Result<String> {
        self.state
            .open_long_curve_fee(parse_fixed("base_amount", base_amount)?)
            .map(render)
    }

    pub fn open_long_governance_fee(&self, base_amount: &str) -> Result<String> {
        self.state
            .open_long_governance_fee(parse_fixed("base_amount", base_amount)?, None)
            .map(render)
    }

    pub fn close_long_curve_fee(
        &self,
        bond_amount: &str,
        maturity_time: &str,
        current_time: &str,
    ) -> Result<String> {
        self.state
            .close_long_curve_fee(
                parse_fixed("bond_amount", bond_amount)?,
                parse_u256("maturity_time", maturity_time)?,
                parse_u256("current_time", current_time)?,
            )
            .map(render)
    }

    pub fn close_long_flat_fee(
        &self,
        bond_amount: &str,
        maturity_time: &str,
        current_time: &str,
    ) -> Result<String> {
        self.state
            .close_long_flat_fee(
                parse_fixed("bond_amount", bond_amount)?,
                parse_u256("maturity_time", maturity_time)?,
                parse_u256("current_time", current_time)?,
            )
            .map(render)
    }

    pub fn open_short_curve_fee(&self, bond_amount: &str) -> Result<String> {
        self.state
            .open_short_curve_fee(parse_fixed("bond_amount", bond_amount)?)
            .map(render)
    }

    pub fn open_short_governance_fee(&self, bond_amount: &str) -> Result<String> {
        self.state
            .open_short_governance_fee(parse_fixed("bond_amount", bond_amount)?, None)
            .map(render)
    }

    pub fn close_short_curve_fee(
        &self,
        bond_amount: &str,
        maturity_time: &str,
        current_time: &str,
    ) -> Result<String> {
        self.state
            .close_short_curve_fee(
                parse_fixed("bond_amount", bond_amount)?,
                parse_u256("maturity_time", maturity_time)?,
                parse_u256("current_time", current_time)?,
            )
            .map(render)
    }

    pub fn close_short_flat_fee(
        &self,
        bond_amount: &str,
        maturity_time: &str,
        current_time: &str,
    ) -> Result<String> {
        self.state
            .close_short_flat_fee(
                parse_fixed("bond_amount", bond_amount)?,
                parse_u256("maturity_time", maturity_time)?,
                parse_u256("current_time", current_time)?,
            )
            .map(render)
    }

    // Valuation

    pub fn calculate_solvency(&self) -> Result<String> {
        self.state.calculate_solvency().map(render)
    }

    pub fn calculate_idle_share_reserves_in_base(&self) -> Result<String> {
        self.state.calculate_idle_share_reserves_in_base().map(render)
    }

    pub fn calculate_present_value(&self, current_time: &str) -> Result<String> {
        self.state
            .calculate_present_value(parse_u256("current_time", current_time)?)
            .map(render)
    }

    // Sizing

    pub fn calculate_max_long(
        &self,
        budget: &str,
        checkpoint_exposure: &str,
        max_iterations: Option<usize>,
    ) -> Result<String> {
        self.state
            .calculate_max_long(
                parse_fixed("budget", budget)?,
                parse_i256("checkpoint_exposure", checkpoint_exposure)?,
                Some(self.max_iterations(max_iterations)),
            )
            .map(render)
    }

    pub fn calculate_max_short(
        &self,
        budget: &str,
        open_vault_share_price: &str,
        checkpoint_exposure: &str,
        conservative_price: Option<&str>,
        max_iterations: Option<usize>,
    ) -> Result<String> {
        self.state
            .calculate_max_short(
                parse_fixed("budget", budget)?,
                parse_fixed("open_vault_share_price", open_vault_share_price)?,
                parse_i256("checkpoint_exposure", checkpoint_exposure)?,
                parse_optional_fixed("conservative_price", conservative_price)?,
                Some(self.max_iterations(max_iterations)),
            )
            .map(render)
    }

    pub fn calculate_targeted_long(
        &self,
        budget: &str,
        target_rate: &str,
        checkpoint_exposure: &str,
        max_iterations: Option<usize>,
        allowable_error: Option<&str>,
    ) -> Result<String> {
        let allowable_error = parse_optional_fixed("allowable_error", allowable_error)?
            .unwrap_or(self.settings.solver.allowable_error);
        self.state
            .calculate_targeted_long_with_budget(
                parse_fixed("budget", budget)?,
                parse_fixed("target_rate", target_rate)?,
                parse_i256("checkpoint_exposure", checkpoint_exposure)?,
                Some(self.max_iterations(max_iterations)),
                Some(allowable_error),
            )
            .map(render)
    }

    // Time

    pub fn to_checkpoint(&self, time: &str) -> Result<String> {
        self.state
            .to_checkpoint(parse_u256("time", time)?)
            .map(|checkpoint| checkpoint.to_string())
    }

    /// [`State::to_checkpoint_at`] under the configured future-time policy
    pub fn to_checkpoint_at(&self, time: &str, now: &str) -> Result<String> {
        self.state
            .to_checkpoint_at(
                parse_u256("time", time)?,
                parse_u256("now", now)?,
                self.settings.checkpoint.future_policy,
            )
            .map(|checkpoint| checkpoint.to_string())
    }
}
