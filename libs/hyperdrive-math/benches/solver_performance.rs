//! Performance benchmarks for the trade sizing solvers
//!
//! Each solver call re-prices the curve a handful of times per Newton step,
//! so these track the cost of a full sizing query against a mid-sized pool.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use hyperdrive_math::{FixedPoint, PoolConfig, PoolInfo, State, YieldSpace, I256, U256};

const ONE: u128 = 1_000_000_000_000_000_000;

fn units(whole: u128) -> FixedPoint {
    FixedPoint::from_raw_u128(whole * ONE)
}

fn bench_state() -> State {
    let config = PoolConfig {
        base_token: Default::default(),
        vault_shares_token: Default::default(),
        linker_factory: Default::default(),
        linker_code_hash: Default::default(),
        initial_vault_share_price: units(1),
        minimum_share_reserves: FixedPoint::from_raw_u128(ONE / 10),
        minimum_transaction_amount: FixedPoint::from_raw_u128(ONE / 100),
        position_duration: U256::from(31_536_000u64),
        checkpoint_duration: U256::from(86_400u64),
        time_stretch: FixedPoint::from_raw_u128(ONE / 10),
        governance: Default::default(),
        fee_collector: Default::default(),
        sweep_collector: Default::default(),
        fees: hyperdrive_math::Fees {
            curve: FixedPoint::from_raw_u128(ONE / 20),
            flat: FixedPoint::from_raw_u128(ONE / 2_000),
            governance_lp: FixedPoint::from_raw_u128(15 * ONE / 100),
            governance_zombie: FixedPoint::from_raw_u128(15 * ONE / 100),
        },
    };
    let info = PoolInfo {
        share_reserves: units(1_000_000),
        share_adjustment: I256::zero(),
        zombie_base_proceeds: FixedPoint::ZERO,
        zombie_share_reserves: FixedPoint::ZERO,
        bond_reserves: units(2_000_000),
        lp_total_supply: units(1_000_000),
        vault_share_price: units(1),
        longs_outstanding: FixedPoint::ZERO,
        long_average_maturity_time: U256::zero(),
        shorts_outstanding: FixedPoint::ZERO,
        short_average_maturity_time: U256::zero(),
        withdrawal_shares_ready_to_withdraw: FixedPoint::ZERO,
        withdrawal_shares_proceeds: FixedPoint::ZERO,
        lp_share_price: units(1),
        long_exposure: FixedPoint::ZERO,
    };
    State::new(config, info)
}

fn bench_curve_pricing(c: &mut Criterion) {
    let state = bench_state();

    c.bench_function("spot_price", |b| {
        b.iter(|| criterion::black_box(state.calculate_spot_price()))
    });

    c.bench_function("open_long", |b| {
        b.iter(|| criterion::black_box(state.calculate_open_long(criterion::black_box(units(10_000)))))
    });

    c.bench_function("open_short", |b| {
        b.iter(|| {
            criterion::black_box(
                state.calculate_open_short(criterion::black_box(units(10_000)), units(1)),
            )
        })
    });
}

fn bench_max_long(c: &mut Criterion) {
    let state = bench_state();
    let mut group = c.benchmark_group("max_long");
    for budget in [1_000u128, 100_000, 10_000_000] {
        group.bench_with_input(BenchmarkId::from_parameter(budget), &budget, |b, &budget| {
            b.iter(|| criterion::black_box(state.calculate_max_long(units(budget), I256::zero(), None)))
        });
    }
    group.finish();
}

fn bench_max_short(c: &mut Criterion) {
    let state = bench_state();
    let mut group = c.benchmark_group("max_short");
    for budget in [10u128, 10_000, 10_000_000] {
        group.bench_with_input(BenchmarkId::from_parameter(budget), &budget, |b, &budget| {
            b.iter(|| {
                criterion::black_box(state.calculate_max_short(
                    units(budget),
                    units(1),
                    I256::zero(),
                    None,
                    None,
                ))
            })
        });
    }
    group.finish();
}

fn bench_targeted_long(c: &mut Criterion) {
    let state = bench_state();
    c.bench_function("targeted_long_to_5_percent", |b| {
        b.iter(|| {
            criterion::black_box(state.calculate_targeted_long_with_budget(
                units(10_000_000),
                FixedPoint::from_raw_u128(ONE / 20),
                I256::zero(),
                Some(20),
                Some(FixedPoint::from_raw_u128(10_000_000_000)),
            ))
        })
    });
}

criterion_group!(
    benches,
    bench_curve_pricing,
    bench_max_long,
    bench_max_short,
    bench_targeted_long
);

criterion_main!(benches);
