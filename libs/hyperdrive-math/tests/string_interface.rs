//! End-to-end scenarios through the decimal-string interface
//!
//! Every amount goes in and comes out as a raw 18-decimal integer string,
//! the way host-language bindings drive the engine.

mod common;

use common::{as_u256, reference_pool, reference_pool_from_snapshot, ONE};
use hyperdrive_math::boundary;
use hyperdrive_math::{
    CheckpointSettings, DomainError, EngineSettings, FutureCheckpointPolicy, HyperdriveError,
    HyperdriveState, U256,
};
use test_log::test;

#[test]
fn test_snapshot_and_direct_construction_agree() {
    let direct = reference_pool();
    let loaded = reference_pool_from_snapshot();
    assert_eq!(direct.state(), loaded.state());
    assert_eq!(
        direct.calculate_spot_price().unwrap(),
        loaded.calculate_spot_price().unwrap()
    );
}

#[test]
fn test_spot_price_and_rate() {
    let pool = reference_pool();
    let price = as_u256(&pool.calculate_spot_price().unwrap());
    let rate = as_u256(&pool.calculate_spot_rate().unwrap());

    assert!(price > U256::from(930 * ONE / 1000) && price < U256::from(936 * ONE / 1000));
    assert!(rate > U256::from(71 * ONE / 1000) && rate < U256::from(73 * ONE / 1000));

    let max_price = as_u256(&pool.calculate_max_spot_price().unwrap());
    assert!(max_price > price && max_price <= U256::from(ONE));
}

#[test]
fn test_open_and_close_long() {
    let pool = reference_pool();
    let bonds = as_u256(&pool.calculate_open_long("500000000000000000000").unwrap());
    // Bought below par
    assert!(bonds > U256::from(500 * ONE));

    let current = "900000000000000000";
    let maturity = "900000000000000010";
    let shares = as_u256(
        &pool
            .calculate_close_long("500000000000000000000", maturity, current)
            .unwrap(),
    );
    assert!(!shares.is_zero());
    assert!(shares <= U256::from(500 * ONE));
}

#[test]
fn test_open_short_unminted_checkpoint() {
    let pool = reference_pool();
    let minted = pool
        .calculate_open_short("50000000000000000000", Some("900000000000000000"))
        .unwrap();
    let unminted = pool.calculate_open_short("50000000000000000000", None).unwrap();
    let sentinel = pool
        .calculate_open_short("50000000000000000000", Some("0"))
        .unwrap();

    assert_eq!(unminted, sentinel);
    assert!(!as_u256(&minted).is_zero());
    // A lower checkpoint price charges the interest accrued since it opened
    assert!(as_u256(&minted) > as_u256(&unminted));
}

#[test]
fn test_close_short() {
    let pool = reference_pool();
    let proceeds = pool
        .calculate_close_short(
            "50000000000000000000",
            "800000000000000000",
            "900000000000000000",
            "900000000000000010",
            "900000000000000000",
        )
        .unwrap();
    let proceeds = as_u256(&proceeds);
    assert!(proceeds > U256::from(6_250_000_000_000_000_000u128));
    assert!(proceeds < U256::from(6_260_000_000_000_000_000u128));
}

#[test]
fn test_trade_sizing() {
    let pool = reference_pool();

    let targeted = pool
        .calculate_targeted_long(
            "1000000000000000000",
            "001000000000000000",
            "10000",
            Some(20),
            Some("0000000010000000000"),
        )
        .unwrap();
    assert!(!as_u256(&targeted).is_zero());

    let max_long = pool
        .calculate_max_long("1000000000000000000", "10000", Some(20))
        .unwrap();
    assert_eq!(max_long, "1000000000000000000");

    let max_short = pool
        .calculate_max_short(
            "10000000000000000000",
            "1000000000000000000",
            "0",
            None,
            Some(20),
        )
        .unwrap();
    let max_short = as_u256(&max_short);
    assert!(max_short > U256::from(149 * ONE) && max_short < U256::from(150 * ONE));
}

#[test]
fn test_targeted_long_uses_settings_defaults() {
    let pool = reference_pool();
    let explicit = pool
        .calculate_targeted_long(
            "1000000000000000000000000",
            "50000000000000000",
            "0",
            Some(7),
            Some("100000000000000"),
        )
        .unwrap();
    let defaulted = pool
        .calculate_targeted_long("1000000000000000000000000", "50000000000000000", "0", None, None)
        .unwrap();
    assert_eq!(explicit, defaulted);

    let base = as_u256(&defaulted);
    assert!(base > U256::from(137_000 * ONE) && base < U256::from(139_000 * ONE));
}

#[test]
fn test_malformed_amounts_name_the_field() {
    let pool = reference_pool();

    let err = pool.calculate_max_long("asdf", "10000", None).unwrap_err();
    assert_eq!(err.to_string(), "Failed to convert budget string to U256");

    let err = pool.calculate_max_long("1.23", "10000", None).unwrap_err();
    assert_eq!(err.to_string(), "Failed to convert budget string to U256");

    let err = pool
        .calculate_max_long("1000000000000000000", "asdf", None)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to convert checkpoint_exposure string to I256"
    );

    let err = pool
        .calculate_max_short("10000000000000000000", "asdf", "0", None, None)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to convert open_vault_share_price string to U256"
    );

    let err = pool
        .calculate_open_short("50000000000000000000", Some(" 1"))
        .unwrap_err();
    assert!(matches!(err, HyperdriveError::Conversion { .. }));
}

#[test]
fn test_negative_checkpoint_exposure_accepted() {
    let pool = reference_pool();
    let with_negative = pool
        .calculate_max_long("1000000000000000000", "-10000", None)
        .unwrap();
    assert_eq!(with_negative, "1000000000000000000");
}

#[test]
fn test_prices_after_trades() {
    let pool = reference_pool();
    let price = as_u256(&pool.calculate_spot_price().unwrap());
    let rate = as_u256(&pool.calculate_spot_rate().unwrap());

    let price_after_long = as_u256(
        &pool
            .calculate_spot_price_after_long("1000000000000000000000", None)
            .unwrap(),
    );
    let rate_after_long = as_u256(
        &pool
            .calculate_spot_rate_after_long("1000000000000000000000", None)
            .unwrap(),
    );
    let price_after_short = as_u256(
        &pool
            .calculate_spot_price_after_short("100000000000000000000", None)
            .unwrap(),
    );

    assert!(price_after_long > price);
    assert!(rate_after_long < rate);
    assert!(price_after_short < price);
}

#[test]
fn test_checkpoints() {
    let pool = reference_pool();
    assert_eq!(pool.to_checkpoint("100").unwrap(), "0");
    assert_eq!(pool.to_checkpoint("172801").unwrap(), "172800");
    // Default policy rounds future times like any other
    assert_eq!(pool.to_checkpoint_at("172801", "0").unwrap(), "172800");

    let strict = HyperdriveState::with_settings(
        pool.state().clone(),
        EngineSettings {
            checkpoint: CheckpointSettings {
                future_policy: FutureCheckpointPolicy::Reject,
            },
            ..EngineSettings::default()
        },
    );
    let err = strict.to_checkpoint_at("172801", "0").unwrap_err();
    assert!(matches!(
        err,
        HyperdriveError::Domain(DomainError::FutureCheckpoint { .. })
    ));
}

#[test]
fn test_pool_construction_helpers() {
    let annual = as_u256(&boundary::calculate_time_stretch("50000000000000000", "31536000").unwrap());
    assert!(annual > U256::from(44 * ONE / 1000) && annual < U256::from(45 * ONE / 1000));

    let monthly = as_u256(&boundary::calculate_time_stretch("50000000000000000", "2592000").unwrap());
    assert!(!monthly.is_zero());

    assert_eq!(
        boundary::calculate_effective_share_reserves(
            "1000000000000000000000",
            "-100000000000000000000"
        )
        .unwrap(),
        "1100000000000000000000"
    );
    assert!(boundary::calculate_effective_share_reserves("100", "200").is_err());

    let bonds = as_u256(
        &boundary::calculate_initial_bond_reserves(
            "1000000000000000000000000",
            "1000000000000000000",
            "50000000000000000",
            "31536000",
            &annual.to_string(),
        )
        .unwrap(),
    );
    assert!(bonds > U256::from(1_000_000 * ONE));
}

#[test]
fn test_lp_valuation() {
    let pool = reference_pool();
    assert!(!as_u256(&pool.calculate_present_value("1000").unwrap()).is_zero());
    assert!(!as_u256(&pool.calculate_idle_share_reserves_in_base().unwrap()).is_zero());
    assert!(!as_u256(&pool.calculate_solvency().unwrap()).is_zero());
}

#[test]
fn test_fees_zero_without_fee_schedule() {
    let pool = reference_pool();
    assert_eq!(pool.open_long_curve_fee("1000000000000000000000").unwrap(), "0");
    assert_eq!(pool.open_short_curve_fee("1000000000000000000000").unwrap(), "0");
    assert_eq!(
        pool.close_long_flat_fee("1000000000000000000000", "31536000", "0")
            .unwrap(),
        "0"
    );
}
