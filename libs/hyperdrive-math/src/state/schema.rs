//! Versioned pool snapshots
//!
//! Pool snapshots have been published in three shapes over the life of the
//! protocol. [`PoolSnapshot`] accepts any of them, tagged by a `"version"`
//! field, and [`PoolSnapshot::migrate`] lifts each one into the current
//! [`State`].
//!
//! | Version | Changes |
//! |---------|---------|
//! | `v1` | `sharePrice`, `initialSharePrice`, single `governance` fee |
//! | `v2` | vault share price naming, split governance fees, `vaultSharesToken` |
//! | `v3` | `sweepCollector`, zombie reserves |
//!
//! Numeric fields are decimal strings of the raw scaled value. Durations and
//! timestamps may also be plain JSON integers, but only up to `u64::MAX`:
//! JSON parsers hand larger numbers over as floats, which lose precision, so
//! they are rejected. Scaled values such as a 1e18-scaled
//! `longAverageMaturityTime` must be strings.

use super::{Fees, PoolConfig, PoolInfo, State};
use crate::errors::Result;
use anyhow::Context;
use ethers_core::types::{Address, H256, I256, U256};
use fixed_point::FixedPoint;
use serde::Deserialize;
use std::path::Path;

/// Any published snapshot generation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "version")]
pub enum PoolSnapshot {
    #[serde(rename = "v1")]
    V1(SnapshotV1),
    #[serde(rename = "v2")]
    V2(SnapshotV2),
    #[serde(rename = "v3")]
    V3(SnapshotV3),
}

impl PoolSnapshot {
    /// Parse a snapshot from JSON
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse pool snapshot JSON")
    }

    /// Read and parse a snapshot file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pool snapshot {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Invalid pool snapshot {}", path.display()))
    }

    pub fn version(&self) -> u8 {
        match self {
            PoolSnapshot::V1(_) => 1,
            PoolSnapshot::V2(_) => 2,
            PoolSnapshot::V3(_) => 3,
        }
    }

    /// Convert to the current state model and validate it
    pub fn migrate(self) -> Result<State> {
        let (config, info) = match self {
            PoolSnapshot::V1(snapshot) => (snapshot.config.into(), snapshot.info.into()),
            PoolSnapshot::V2(snapshot) => (snapshot.config.into(), snapshot.info.into()),
            PoolSnapshot::V3(snapshot) => (snapshot.config.into(), snapshot.info.into()),
        };
        State::try_new(config, info)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SnapshotV1 {
    pub config: ConfigV1,
    pub info: InfoV1,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SnapshotV2 {
    pub config: ConfigV2,
    pub info: InfoV2,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SnapshotV3 {
    pub config: ConfigV3,
    pub info: InfoV3,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeesV1 {
    pub curve: FixedPoint,
    pub flat: FixedPoint,
    pub governance: FixedPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeesV2 {
    pub curve: FixedPoint,
    pub flat: FixedPoint,
    #[serde(rename = "governanceLP")]
    pub governance_lp: FixedPoint,
    #[serde(rename = "governanceZombie")]
    pub governance_zombie: FixedPoint,
}

impl From<FeesV1> for Fees {
    fn from(fees: FeesV1) -> Self {
        Fees {
            curve: fees.curve,
            flat: fees.flat,
            governance_lp: fees.governance,
            governance_zombie: fees.governance,
        }
    }
}

impl From<FeesV2> for Fees {
    fn from(fees: FeesV2) -> Self {
        Fees {
            curve: fees.curve,
            flat: fees.flat,
            governance_lp: fees.governance_lp,
            governance_zombie: fees.governance_zombie,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigV1 {
    pub base_token: Address,
    pub initial_share_price: FixedPoint,
    pub minimum_share_reserves: FixedPoint,
    #[serde(default)]
    pub minimum_transaction_amount: FixedPoint,
    #[serde(deserialize_with = "decimal::u256")]
    pub position_duration: U256,
    #[serde(deserialize_with = "decimal::u256")]
    pub checkpoint_duration: U256,
    pub time_stretch: FixedPoint,
    pub governance: Address,
    pub fee_collector: Address,
    pub fees: FeesV1,
}

impl From<ConfigV1> for PoolConfig {
    fn from(config: ConfigV1) -> Self {
        PoolConfig {
            base_token: config.base_token,
            vault_shares_token: config.base_token,
            linker_factory: Address::zero(),
            linker_code_hash: H256::zero(),
            initial_vault_share_price: config.initial_share_price,
            minimum_share_reserves: config.minimum_share_reserves,
            minimum_transaction_amount: config.minimum_transaction_amount,
            position_duration: config.position_duration,
            checkpoint_duration: config.checkpoint_duration,
            time_stretch: config.time_stretch,
            governance: config.governance,
            fee_collector: config.fee_collector,
            sweep_collector: config.fee_collector,
            fees: config.fees.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigV2 {
    pub base_token: Address,
    pub vault_shares_token: Address,
    #[serde(default)]
    pub linker_factory: Address,
    #[serde(default)]
    pub linker_code_hash: H256,
    pub initial_vault_share_price: FixedPoint,
    pub minimum_share_reserves: FixedPoint,
    pub minimum_transaction_amount: FixedPoint,
    #[serde(deserialize_with = "decimal::u256")]
    pub position_duration: U256,
    #[serde(deserialize_with = "decimal::u256")]
    pub checkpoint_duration: U256,
    pub time_stretch: FixedPoint,
    pub governance: Address,
    pub fee_collector: Address,
    pub fees: FeesV2,
}

impl From<ConfigV2> for PoolConfig {
    fn from(config: ConfigV2) -> Self {
        PoolConfig {
            base_token: config.base_token,
            vault_shares_token: config.vault_shares_token,
            linker_factory: config.linker_factory,
            linker_code_hash: config.linker_code_hash,
            initial_vault_share_price: config.initial_vault_share_price,
            minimum_share_reserves: config.minimum_share_reserves,
            minimum_transaction_amount: config.minimum_transaction_amount,
            position_duration: config.position_duration,
            checkpoint_duration: config.checkpoint_duration,
            time_stretch: config.time_stretch,
            governance: config.governance,
            fee_collector: config.fee_collector,
            sweep_collector: config.fee_collector,
            fees: config.fees.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigV3 {
    pub base_token: Address,
    pub vault_shares_token: Address,
    pub linker_factory: Address,
    pub linker_code_hash: H256,
    pub initial_vault_share_price: FixedPoint,
    pub minimum_share_reserves: FixedPoint,
    pub minimum_transaction_amount: FixedPoint,
    #[serde(deserialize_with = "decimal::u256")]
    pub position_duration: U256,
    #[serde(deserialize_with = "decimal::u256")]
    pub checkpoint_duration: U256,
    pub time_stretch: FixedPoint,
    pub governance: Address,
    pub fee_collector: Address,
    pub sweep_collector: Address,
    pub fees: FeesV2,
}

impl From<ConfigV3> for PoolConfig {
    fn from(config: ConfigV3) -> Self {
        PoolConfig {
            base_token: config.base_token,
            vault_shares_token: config.vault_shares_token,
            linker_factory: config.linker_factory,
            linker_code_hash: config.linker_code_hash,
            initial_vault_share_price: config.initial_vault_share_price,
            minimum_share_reserves: config.minimum_share_reserves,
            minimum_transaction_amount: config.minimum_transaction_amount,
            position_duration: config.position_duration,
            checkpoint_duration: config.checkpoint_duration,
            time_stretch: config.time_stretch,
            governance: config.governance,
            fee_collector: config.fee_collector,
            sweep_collector: config.sweep_collector,
            fees: config.fees.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoV1 {
    pub share_reserves: FixedPoint,
    #[serde(default, deserialize_with = "decimal::i256")]
    pub share_adjustment: I256,
    pub bond_reserves: FixedPoint,
    pub lp_total_supply: FixedPoint,
    pub share_price: FixedPoint,
    pub longs_outstanding: FixedPoint,
    #[serde(deserialize_with = "decimal::u256")]
    pub long_average_maturity_time: U256,
    pub shorts_outstanding: FixedPoint,
    #[serde(deserialize_with = "decimal::u256")]
    pub short_average_maturity_time: U256,
    pub withdrawal_shares_ready_to_withdraw: FixedPoint,
    pub withdrawal_shares_proceeds: FixedPoint,
    pub lp_share_price: FixedPoint,
    pub long_exposure: FixedPoint,
}

impl From<InfoV1> for PoolInfo {
    fn from(info: InfoV1) -> Self {
        PoolInfo {
            share_reserves: info.share_reserves,
            share_adjustment: info.share_adjustment,
            zombie_base_proceeds: FixedPoint::ZERO,
            zombie_share_reserves: FixedPoint::ZERO,
            bond_reserves: info.bond_reserves,
            lp_total_supply: info.lp_total_supply,
            vault_share_price: info.share_price,
            longs_outstanding: info.longs_outstanding,
            long_average_maturity_time: info.long_average_maturity_time,
            shorts_outstanding: info.shorts_outstanding,
            short_average_maturity_time: info.short_average_maturity_time,
            withdrawal_shares_ready_to_withdraw: info.withdrawal_shares_ready_to_withdraw,
            withdrawal_shares_proceeds: info.withdrawal_shares_proceeds,
            lp_share_price: info.lp_share_price,
            long_exposure: info.long_exposure,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoV2 {
    pub share_reserves: FixedPoint,
    #[serde(deserialize_with = "decimal::i256")]
    pub share_adjustment: I256,
    pub bond_reserves: FixedPoint,
    pub lp_total_supply: FixedPoint,
    pub vault_share_price: FixedPoint,
    pub longs_outstanding: FixedPoint,
    #[serde(deserialize_with = "decimal::u256")]
    pub long_average_maturity_time: U256,
    pub shorts_outstanding: FixedPoint,
    #[serde(deserialize_with = "decimal::u256")]
    pub short_average_maturity_time: U256,
    pub withdrawal_shares_ready_to_withdraw: FixedPoint,
    pub withdrawal_shares_proceeds: FixedPoint,
    pub lp_share_price: FixedPoint,
    pub long_exposure: FixedPoint,
}

impl From<InfoV2> for PoolInfo {
    fn from(info: InfoV2) -> Self {
        PoolInfo {
            share_reserves: info.share_reserves,
            share_adjustment: info.share_adjustment,
            zombie_base_proceeds: FixedPoint::ZERO,
            zombie_share_reserves: FixedPoint::ZERO,
            bond_reserves: info.bond_reserves,
            lp_total_supply: info.lp_total_supply,
            vault_share_price: info.vault_share_price,
            longs_outstanding: info.longs_outstanding,
            long_average_maturity_time: info.long_average_maturity_time,
            shorts_outstanding: info.shorts_outstanding,
            short_average_maturity_time: info.short_average_maturity_time,
            withdrawal_shares_ready_to_withdraw: info.withdrawal_shares_ready_to_withdraw,
            withdrawal_shares_proceeds: info.withdrawal_shares_proceeds,
            lp_share_price: info.lp_share_price,
            long_exposure: info.long_exposure,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoV3 {
    pub share_reserves: FixedPoint,
    #[serde(deserialize_with = "decimal::i256")]
    pub share_adjustment: I256,
    pub zombie_base_proceeds: FixedPoint,
    pub zombie_share_reserves: FixedPoint,
    pub bond_reserves: FixedPoint,
    pub lp_total_supply: FixedPoint,
    pub vault_share_price: FixedPoint,
    pub longs_outstanding: FixedPoint,
    #[serde(deserialize_with = "decimal::u256")]
    pub long_average_maturity_time: U256,
    pub shorts_outstanding: FixedPoint,
    #[serde(deserialize_with = "decimal::u256")]
    pub short_average_maturity_time: U256,
    pub withdrawal_shares_ready_to_withdraw: FixedPoint,
    pub withdrawal_shares_proceeds: FixedPoint,
    pub lp_share_price: FixedPoint,
    pub long_exposure: FixedPoint,
}

impl From<InfoV3> for PoolInfo {
    fn from(info: InfoV3) -> Self {
        PoolInfo {
            share_reserves: info.share_reserves,
            share_adjustment: info.share_adjustment,
            zombie_base_proceeds: info.zombie_base_proceeds,
            zombie_share_reserves: info.zombie_share_reserves,
            bond_reserves: info.bond_reserves,
            lp_total_supply: info.lp_total_supply,
            vault_share_price: info.vault_share_price,
            longs_outstanding: info.longs_outstanding,
            long_average_maturity_time: info.long_average_maturity_time,
            shorts_outstanding: info.shorts_outstanding,
            short_average_maturity_time: info.short_average_maturity_time,
            withdrawal_shares_ready_to_withdraw: info.withdrawal_shares_ready_to_withdraw,
            withdrawal_shares_proceeds: info.withdrawal_shares_proceeds,
            lp_share_price: info.lp_share_price,
            long_exposure: info.long_exposure,
        }
    }
}

/// Decimal string or integer deserializers for raw 256-bit fields
mod decimal {
    use ethers_core::types::{I256, U256};
    use serde::de::{self, Deserializer, Visitor};
    use std::fmt;

    fn float_error(v: f64) -> String {
        format!("number {v} is not a 64-bit integer; encode large values as decimal strings")
    }

    struct U256Visitor;

    impl<'de> Visitor<'de> for U256Visitor {
        type Value = U256;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a decimal string or non-negative integer")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<U256, E> {
            Ok(U256::from(v))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<U256, E> {
            Err(E::custom(float_error(v)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<U256, E> {
            if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
                return Err(E::custom(format!("invalid unsigned decimal '{v}'")));
            }
            U256::from_dec_str(v).map_err(E::custom)
        }
    }

    struct I256Visitor;

    impl<'de> Visitor<'de> for I256Visitor {
        type Value = I256;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a signed decimal string or integer")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<I256, E> {
            Ok(I256::from(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<I256, E> {
            Ok(I256::from(i128::from(v)))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<I256, E> {
            Err(E::custom(float_error(v)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<I256, E> {
            I256::from_dec_str(v).map_err(E::custom)
        }
    }

    pub fn u256<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        deserializer.deserialize_any(U256Visitor)
    }

    pub fn i256<'de, D: Deserializer<'de>>(deserializer: D) -> Result<I256, D::Error> {
        deserializer.deserialize_any(I256Visitor)
    }
}
