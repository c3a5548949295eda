//! Shared Newton-Raphson plumbing
//!
//! The sizing solvers (`calculate_max_long`, `calculate_max_short`,
//! `calculate_targeted_long_with_budget`) all return their best valid guess
//! when they run out of iterations. The `*_with_diagnostics` variants return a
//! [`SolverOutcome`] so callers can tell a converged answer from a fallback.

use crate::errors::Result;
use fixed_point::FixedPoint;
use serde::{Deserialize, Serialize};

/// Iteration cap used when the caller passes `None`
pub const DEFAULT_MAX_ITERATIONS: usize = 7;

/// Residual tolerance (1e-4) used when the caller passes `None`
pub const DEFAULT_ALLOWABLE_ERROR: FixedPoint = FixedPoint::from_raw_u128(100_000_000_000_000);

/// Result of an iterative solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverOutcome {
    /// Best valid value found
    pub value: FixedPoint,
    /// Newton steps taken
    pub iterations: usize,
    /// Distance from the objective at `value`, in the solver's own units
    pub residual: FixedPoint,
    /// Whether the residual met the tolerance before the iteration cap
    pub converged: bool,
}

impl SolverOutcome {
    /// An answer that needed no iteration
    pub fn exact(value: FixedPoint) -> Self {
        Self {
            value,
            iterations: 0,
            residual: FixedPoint::ZERO,
            converged: true,
        }
    }
}

/// Map domain failures to `None` so a search can stop at its last valid
/// guess; arithmetic failures still propagate.
pub(crate) fn domain_to_none<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_domain() => Ok(None),
        Err(err) => Err(err),
    }
}

/// `|a - b|`
pub(crate) fn abs_diff(a: FixedPoint, b: FixedPoint) -> FixedPoint {
    if a > b {
        a.saturating_sub(b)
    } else {
        b.saturating_sub(a)
    }
}
