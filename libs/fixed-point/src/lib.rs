//! # Fixed-Point Arithmetic
//!
//! ## Purpose
//!
//! 256-bit decimal arithmetic scaled by 10^18 with the exact semantics of the
//! on-chain `FixedPointMath` library. Unsigned quantities (reserves, amounts,
//! prices) are [`FixedPoint`]; signed quantities (share adjustments, exposures)
//! are `ethers_core::types::I256`.
//!
//! ## Integration Points
//!
//! - **Input**: raw scaled integers as `U256`/`I256` or decimal strings
//! - **Output**: checked results as `Result<FixedPoint, FixedPointError>`
//! - **Consumers**: the `hyperdrive-math` pricing engine
//!
//! ## Architecture Role
//!
//! Foundation layer. Every operation that could overflow, underflow, or divide
//! by zero fails with a typed [`FixedPointError`]; nothing wraps or saturates
//! unless the method name says so. Rounding direction is always explicit:
//! `mul_down`/`mul_up`, `div_down`/`div_up`, or [`Rounding`] passed as data.
//!
//! ## Examples
//!
//! ```rust
//! use fixed_point::FixedPoint;
//!
//! let price = FixedPoint::from_raw_u128(950_000_000_000_000_000);
//! let amount: FixedPoint = "100000000000000000000".parse().unwrap();
//! let cost = amount.mul_up(price).unwrap();
//! assert_eq!(cost.to_string(), "95.000000000000000000");
//! ```

pub mod errors;
pub mod fixed_point;
pub mod math;

pub use errors::{FixedPointError, Result};
pub use fixed_point::{FixedPoint, Rounding};
pub use math::{exp, ln};

// Re-export the integer types so downstream crates share one version
pub use ethers_core::types::{I256, U256};
