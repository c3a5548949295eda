//! Error types for the pricing engine
//!
//! Three failure classes are kept apart so callers can tell malformed input
//! from broken arithmetic from trades that are not economically valid.
//! Solver non-convergence is not an error; see [`crate::solver::SolverOutcome`].

use ethers_core::types::U256;
use fixed_point::{FixedPoint, FixedPointError};
use std::fmt;
use thiserror::Error;

/// Integer encoding expected at the string boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerKind {
    U256,
    I256,
}

impl fmt::Display for IntegerKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IntegerKind::U256 => write!(f, "U256"),
            IntegerKind::I256 => write!(f, "I256"),
        }
    }
}

/// Top-level engine error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HyperdriveError {
    /// Malformed numeric string at the boundary
    #[error("Failed to convert {field} string to {target}")]
    Conversion { field: String, target: IntegerKind },

    /// Overflow, underflow, or division by zero inside fixed-point math
    #[error("Arithmetic error: {0}")]
    Arithmetic(#[from] FixedPointError),

    /// The requested trade or query is not valid against this pool
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl HyperdriveError {
    pub fn conversion(field: &str, target: IntegerKind) -> Self {
        Self::Conversion {
            field: field.to_string(),
            target,
        }
    }

    /// True for the economic constraint failures a solver may step back from
    pub fn is_domain(&self) -> bool {
        matches!(self, Self::Domain(_))
    }
}

/// Economic validity failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("MinimumTransactionAmount: {amount} is below the minimum transaction amount {minimum}")]
    MinimumTransactionAmount {
        amount: FixedPoint,
        minimum: FixedPoint,
    },

    /// The trade would buy or sell bonds at a negative interest rate
    #[error("NegativeInterest: {trade} would result in a negative interest rate")]
    NegativeInterest { trade: &'static str },

    #[error("Insolvent: {context}")]
    Insolvent { context: &'static str },

    #[error("InsufficientLiquidity: {context}")]
    InsufficientLiquidity { context: &'static str },

    #[error(
        "Effective share reserves must be positive: share reserves {share_reserves}, share adjustment {share_adjustment}"
    )]
    NonPositiveEffectiveShareReserves {
        share_reserves: String,
        share_adjustment: String,
    },

    #[error("Checkpoint time {time} is after the current time {now}")]
    FutureCheckpoint { time: U256, now: U256 },

    #[error("Target rate {target} is not below the current spot rate {spot_rate}")]
    UnreachableTargetRate {
        target: FixedPoint,
        spot_rate: FixedPoint,
    },

    /// A Newton step would divide by a non-positive slope
    #[error("Degenerate derivative in {context}")]
    DegenerateDerivative { context: &'static str },

    #[error("Invalid pool config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Invalid pool info: {reason}")]
    InvalidInfo { reason: String },
}

pub type Result<T> = std::result::Result<T, HyperdriveError>;
