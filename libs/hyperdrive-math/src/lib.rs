//! # Hyperdrive Math - Fixed-Rate AMM Pricing Engine
//!
//! ## Purpose
//!
//! Off-chain mirror of the Hyperdrive pool math. Given one snapshot of a pool
//! (configuration plus reserves), it prices the YieldSpace curve, computes the
//! proceeds and fees of opening and closing longs and shorts, values LP
//! capital, and sizes trades with Newton solvers (max long, max short, long to
//! a target rate). Results match the on-chain contracts to the wei, including
//! rounding direction.
//!
//! ## Integration Points
//!
//! - **Input Sources**: [`PoolSnapshot`] JSON (any supported schema version),
//!   or [`PoolConfig`] and [`PoolInfo`] built directly
//! - **Output Destinations**: trading bots, simulators, and host-language
//!   bindings through the decimal-string [`boundary`]
//! - **Tunables**: [`EngineSettings`] from TOML and `HYPERDRIVE_` environment
//!   variables
//! - **Arithmetic**: [`fixed_point::FixedPoint`]; every fallible step returns a
//!   typed error instead of wrapping
//!
//! ## Architecture Role
//!
//! ```text
//! boundary (strings) -> State (config + info)
//!                         |- yield_space   curve pricing and limits
//!                         |- long / short  trades, fees, solvers
//!                         |- lp            solvency and present value
//!                         `- checkpoint    time normalization
//! ```
//!
//! [`State`] is immutable; hypothetical post-trade pools are fresh copies.
//! Errors split into conversion, arithmetic and domain failures (see
//! [`HyperdriveError`]). Solvers stop at their last valid guess on domain
//! failures and report convergence through [`SolverOutcome`].
//!
//! ## Examples
//!
//! ```rust,no_run
//! use hyperdrive_math::{PoolSnapshot, YieldSpace};
//!
//! let snapshot = PoolSnapshot::from_file("pool.json")?;
//! let state = snapshot.migrate()?;
//! let spot_price = state.calculate_spot_price()?;
//! let bonds = state.calculate_open_long("1000000000000000000000".parse()?)?;
//! println!("spot {spot_price}, 1000 base buys {bonds} bonds");
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod boundary;
pub mod checkpoint;
pub mod errors;
pub mod long;
pub mod lp;
pub mod settings;
pub mod short;
pub mod solver;
pub mod state;
pub mod utils;
pub mod yield_space;

pub use boundary::HyperdriveState;
pub use checkpoint::FutureCheckpointPolicy;
pub use errors::{DomainError, HyperdriveError, IntegerKind, Result};
pub use settings::{CheckpointSettings, EngineSettings, SolverSettings};
pub use short::CHECKPOINT_NOT_MINTED;
pub use solver::{SolverOutcome, DEFAULT_ALLOWABLE_ERROR, DEFAULT_MAX_ITERATIONS};
pub use state::schema::PoolSnapshot;
pub use state::{Fees, PoolConfig, PoolInfo, State};
pub use utils::{
    calculate_effective_share_reserves, calculate_fixed_price_given_rate,
    calculate_initial_bond_reserves, calculate_rate_given_fixed_price, calculate_time_stretch,
};
pub use yield_space::YieldSpace;

pub use fixed_point::{FixedPoint, I256, U256};
