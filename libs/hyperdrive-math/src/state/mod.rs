//! Pool state model
//!
//! A [`State`] pairs the deploy-time [`PoolConfig`] with one [`PoolInfo`]
//! reserve snapshot. Operations never mutate it; hypothetical post-trade
//! pools are built as fresh copies through [`State::with_reserves`].

pub mod schema;

use crate::errors::{DomainError, Result};
use crate::utils::{calculate_effective_share_reserves, SECONDS_PER_YEAR};
use ethers_core::types::{Address, H256, I256, U256};
use fixed_point::FixedPoint;

/// Protocol fee rates, each a fraction in `[0, 1e18]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fees {
    /// Charged on the curve portion of a trade, proportional to slippage
    pub curve: FixedPoint,
    /// Charged on the flat (matured) portion of a trade
    pub flat: FixedPoint,
    /// Governance cut of LP fees
    pub governance_lp: FixedPoint,
    /// Governance cut of zombie interest
    pub governance_zombie: FixedPoint,
}

impl Fees {
    pub fn validate(&self) -> Result<()> {
        for (name, fee) in [
            ("curve", self.curve),
            ("flat", self.flat),
            ("governance_lp", self.governance_lp),
            ("governance_zombie", self.governance_zombie),
        ] {
            if fee > FixedPoint::ONE {
                return Err(DomainError::InvalidConfig {
                    reason: format!("{name} fee {fee} exceeds 1.0"),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Static pool configuration, set once at deploy time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub base_token: Address,
    pub vault_shares_token: Address,
    pub linker_factory: Address,
    pub linker_code_hash: H256,
    pub initial_vault_share_price: FixedPoint,
    pub minimum_share_reserves: FixedPoint,
    pub minimum_transaction_amount: FixedPoint,
    /// Seconds from open to maturity
    pub position_duration: U256,
    /// Seconds per checkpoint bucket
    pub checkpoint_duration: U256,
    pub time_stretch: FixedPoint,
    pub governance: Address,
    pub fee_collector: Address,
    pub sweep_collector: Address,
    pub fees: Fees,
}

impl PoolConfig {
    /// Check the deploy-time invariants the curve math relies on
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| -> Result<()> {
            Err(DomainError::InvalidConfig { reason }.into())
        };
        if self.checkpoint_duration.is_zero() {
            return invalid("checkpoint duration must be positive".to_string());
        }
        if self.position_duration.is_zero()
            || !(self.position_duration % self.checkpoint_duration).is_zero()
        {
            return invalid(format!(
                "position duration {} must be a positive multiple of checkpoint duration {}",
                self.position_duration, self.checkpoint_duration
            ));
        }
        if self.time_stretch.is_zero() || self.time_stretch >= FixedPoint::ONE {
            return invalid(format!(
                "time stretch {} must be in (0, 1)",
                self.time_stretch
            ));
        }
        if self.initial_vault_share_price.is_zero() {
            return invalid("initial vault share price must be positive".to_string());
        }
        self.fees.validate()
    }
}

/// Reserve snapshot at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolInfo {
    pub share_reserves: FixedPoint,
    /// Signed pricing offset (zeta) applied to the share reserves
    pub share_adjustment: I256,
    pub zombie_base_proceeds: FixedPoint,
    pub zombie_share_reserves: FixedPoint,
    pub bond_reserves: FixedPoint,
    pub lp_total_supply: FixedPoint,
    pub vault_share_price: FixedPoint,
    pub longs_outstanding: FixedPoint,
    /// Weighted average maturity timestamp, scaled by 1e18
    pub long_average_maturity_time: U256,
    pub shorts_outstanding: FixedPoint,
    /// Weighted average maturity timestamp, scaled by 1e18
    pub short_average_maturity_time: U256,
    pub withdrawal_shares_ready_to_withdraw: FixedPoint,
    pub withdrawal_shares_proceeds: FixedPoint,
    pub lp_share_price: FixedPoint,
    pub long_exposure: FixedPoint,
}

impl PoolInfo {
    pub fn validate(&self) -> Result<()> {
        if self.vault_share_price.is_zero() {
            return Err(DomainError::InvalidInfo {
                reason: "vault share price must be positive".to_string(),
            }
            .into());
        }
        if self.bond_reserves.is_zero() {
            return Err(DomainError::InvalidInfo {
                reason: "bond reserves must be positive".to_string(),
            }
            .into());
        }
        calculate_effective_share_reserves(self.share_reserves, self.share_adjustment)?;
        Ok(())
    }
}

/// The engine's working object: configuration plus one reserve snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub config: PoolConfig,
    pub info: PoolInfo,
}

impl State {
    pub fn new(config: PoolConfig, info: PoolInfo) -> Self {
        Self { config, info }
    }

    /// Construct after checking both halves of the snapshot
    pub fn try_new(config: PoolConfig, info: PoolInfo) -> Result<Self> {
        config.validate()?;
        info.validate()?;
        Ok(Self { config, info })
    }

    /// A copy of this pool with replaced share and bond reserves
    pub(crate) fn with_reserves(&self, share_reserves: FixedPoint, bond_reserves: FixedPoint) -> Self {
        let mut state = self.clone();
        state.info.share_reserves = share_reserves;
        state.info.bond_reserves = bond_reserves;
        state
    }

    pub fn share_reserves(&self) -> FixedPoint {
        self.info.share_reserves
    }

    pub fn share_adjustment(&self) -> I256 {
        self.info.share_adjustment
    }

    pub fn bond_reserves(&self) -> FixedPoint {
        self.info.bond_reserves
    }

    /// Share reserves net of the share adjustment, `z - zeta`
    pub fn effective_share_reserves(&self) -> Result<FixedPoint> {
        calculate_effective_share_reserves(self.info.share_reserves, self.info.share_adjustment)
    }

    pub fn vault_share_price(&self) -> FixedPoint {
        self.info.vault_share_price
    }

    pub fn initial_vault_share_price(&self) -> FixedPoint {
        self.config.initial_vault_share_price
    }

    pub fn minimum_share_reserves(&self) -> FixedPoint {
        self.config.minimum_share_reserves
    }

    pub fn minimum_transaction_amount(&self) -> FixedPoint {
        self.config.minimum_transaction_amount
    }

    pub fn time_stretch(&self) -> FixedPoint {
        self.config.time_stretch
    }

    pub fn position_duration(&self) -> U256 {
        self.config.position_duration
    }

    pub fn checkpoint_duration(&self) -> U256 {
        self.config.checkpoint_duration
    }

    /// Position duration as a fraction of a 365-day year
    pub fn annualized_position_duration(&self) -> Result<FixedPoint> {
        Ok(FixedPoint::from_raw(self.config.position_duration)
            .div_down(FixedPoint::from_raw(U256::from(SECONDS_PER_YEAR)))?)
    }

    pub fn long_exposure(&self) -> FixedPoint {
        self.info.long_exposure
    }

    pub fn longs_outstanding(&self) -> FixedPoint {
        self.info.longs_outstanding
    }

    pub fn shorts_outstanding(&self) -> FixedPoint {
        self.info.shorts_outstanding
    }

    pub fn long_average_maturity_time(&self) -> U256 {
        self.info.long_average_maturity_time
    }

    pub fn short_average_maturity_time(&self) -> U256 {
        self.info.short_average_maturity_time
    }

    pub fn curve_fee(&self) -> FixedPoint {
        self.config.fees.curve
    }

    pub fn flat_fee(&self) -> FixedPoint {
        self.config.fees.flat
    }

    pub fn governance_lp_fee(&self) -> FixedPoint {
        self.config.fees.governance_lp
    }

    pub fn governance_zombie_fee(&self) -> FixedPoint {
        self.config.fees.governance_zombie
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;

    pub fn fixed(raw: u128) -> FixedPoint {
        FixedPoint::from_raw_u128(raw)
    }

    /// Units of 1e18, e.g. `units(5)` is 5.0
    pub fn units(whole: u128) -> FixedPoint {
        FixedPoint::from_raw_u128(whole * 1_000_000_000_000_000_000)
    }

    pub fn test_config() -> PoolConfig {
        PoolConfig {
            base_token: Address::repeat_byte(0x12),
            vault_shares_token: Address::repeat_byte(0x12),
            linker_factory: Address::repeat_byte(0x12),
            linker_code_hash: H256::zero(),
            initial_vault_share_price: units(1),
            minimum_share_reserves: fixed(100_000_000_000_000_000),
            minimum_transaction_amount: fixed(10_000_000_000_000_000),
            position_duration: U256::from(SECONDS_PER_YEAR),
            checkpoint_duration: U256::from(86_400u64),
            time_stretch: fixed(100_000_000_000_000_000),
            governance: Address::repeat_byte(0xab),
            fee_collector: Address::repeat_byte(0xfe),
            sweep_collector: Address::repeat_byte(0xfe),
            fees: Fees::default(),
        }
    }

    pub fn test_info() -> PoolInfo {
        PoolInfo {
            share_reserves: units(1_000_000),
            share_adjustment: I256::zero(),
            zombie_base_proceeds: FixedPoint::ZERO,
            zombie_share_reserves: FixedPoint::ZERO,
            bond_reserves: units(2_000_000),
            lp_total_supply: units(3_000_000),
            vault_share_price: units(1),
            longs_outstanding: FixedPoint::ZERO,
            long_average_maturity_time: U256::zero(),
            shorts_outstanding: FixedPoint::ZERO,
            short_average_maturity_time: U256::zero(),
            withdrawal_shares_ready_to_withdraw: FixedPoint::ZERO,
            withdrawal_shares_proceeds: FixedPoint::ZERO,
            lp_share_price: units(1),
            long_exposure: FixedPoint::ZERO,
        }
    }

    pub fn test_state() -> State {
        State::new(test_config(), test_info())
    }

    /// The test pool with 5% curve fee, 0.05% flat fee, 15% governance cut
    pub fn test_state_with_fees() -> State {
        let mut state = test_state();
        state.config.fees = Fees {
            curve: fixed(50_000_000_000_000_000),
            flat: fixed(500_000_000_000_000),
            governance_lp: fixed(150_000_000_000_000_000),
            governance_zombie: fixed(30_000_000_000_000_000),
        };
        state
    }
}
