//! Shared fixtures for the integration tests
//!
//! The reference pool: 1M shares against 2M bonds at a unit vault share
//! price, one-year terms, daily checkpoints, and a 0.1 time stretch. Its spot
//! price is about 0.933 and its spot rate about 7.18%.

#![allow(dead_code)]

use hyperdrive_math::{
    EngineSettings, Fees, FixedPoint, HyperdriveState, PoolConfig, PoolInfo, PoolSnapshot, State,
    I256, U256,
};

pub const ONE: u128 = 1_000_000_000_000_000_000;

pub fn units(whole: u128) -> FixedPoint {
    FixedPoint::from_raw_u128(whole * ONE)
}

pub fn pool_config() -> PoolConfig {
    let token = "0x1234567890abcdef1234567890abcdef12345678".parse().unwrap();
    let collector = "0xfedcba0987654321fedcba0987654321fedcba09".parse().unwrap();
    PoolConfig {
        base_token: token,
        vault_shares_token: token,
        linker_factory: token,
        linker_code_hash: Default::default(),
        initial_vault_share_price: units(1),
        minimum_share_reserves: FixedPoint::from_raw_u128(ONE / 10),
        minimum_transaction_amount: FixedPoint::from_raw_u128(ONE / 100),
        position_duration: U256::from(60u64 * 60 * 24 * 365),
        checkpoint_duration: U256::from(86_400u64),
        time_stretch: FixedPoint::from_raw_u128(ONE / 10),
        governance: "0xabcdef1234567890abcdef1234567890abcdef12".parse().unwrap(),
        fee_collector: collector,
        sweep_collector: collector,
        fees: Fees::default(),
    }
}

pub fn pool_info() -> PoolInfo {
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

pub fn reference_state() -> State {
    State::try_new(pool_config(), pool_info()).unwrap()
}

/// A fee-free pool with no open positions and the reference timing
pub fn custom_state(
    share_reserves: FixedPoint,
    bond_reserves: FixedPoint,
    vault_share_price: FixedPoint,
    time_stretch: FixedPoint,
) -> State {
    let config = PoolConfig {
        time_stretch,
        ..pool_config()
    };
    let info = PoolInfo {
        share_reserves,
        bond_reserves,
        vault_share_price,
        lp_total_supply: share_reserves,
        ..pool_info()
    };
    State::try_new(config, info).unwrap()
}

pub fn reference_pool() -> HyperdriveState {
    HyperdriveState::new(reference_state())
}

/// The reference pool as a current-generation snapshot document
pub fn reference_snapshot_json() -> &'static str {
    r#"{
        "version": "v3",
        "config": {
            "baseToken": "0x1234567890abcdef1234567890abcdef12345678",
            "vaultSharesToken": "0x1234567890abcdef1234567890abcdef12345678",
            "linkerFactory": "0x1234567890abcdef1234567890abcdef12345678",
            "linkerCodeHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
            "initialVaultSharePrice": "1000000000000000000",
            "minimumShareReserves": "100000000000000000",
            "minimumTransactionAmount": "10000000000000000",
            "positionDuration": 31536000,
            "checkpointDuration": 86400,
            "timeStretch": "100000000000000000",
            "governance": "0xabcdef1234567890abcdef1234567890abcdef12",
            "feeCollector": "0xfedcba0987654321fedcba0987654321fedcba09",
            "sweepCollector": "0xfedcba0987654321fedcba0987654321fedcba09",
            "fees": { "curve": "0", "flat": "0", "governanceLP": "0", "governanceZombie": "0" }
        },
        "info": {
            "shareReserves": "1000000000000000000000000",
            "shareAdjustment": "0",
            "zombieBaseProceeds": "0",
            "zombieShareReserves": "0",
            "bondReserves": "2000000000000000000000000",
            "lpTotalSupply": "3000000000000000000000000",
            "vaultSharePrice": "1000000000000000000",
            "longsOutstanding": "0",
            "longAverageMaturityTime": "0",
            "shortsOutstanding": "0",
            "shortAverageMaturityTime": "0",
            "withdrawalSharesReadyToWithdraw": "0",
            "withdrawalSharesProceeds": "0",
            "lpSharePrice": "1000000000000000000",
            "longExposure": "0"
        }
    }"#
}

pub fn reference_pool_from_snapshot() -> HyperdriveState {
    let snapshot = PoolSnapshot::from_json(reference_snapshot_json()).unwrap();
    HyperdriveState::from_snapshot(snapshot, EngineSettings::default()).unwrap()
}

/// Parse a boundary result back into an integer
pub fn as_u256(value: &str) -> U256 {
    U256::from_dec_str(value).unwrap()
}
