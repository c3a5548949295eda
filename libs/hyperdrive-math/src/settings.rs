//! Engine Settings Module
//!
//! Tunables that callers may want to change without touching code: solver
//! iteration caps and tolerances, and how future timestamps are checkpointed.
//! Settings load from an optional TOML file with `HYPERDRIVE_`-prefixed
//! environment variables layered on top, e.g.
//! `HYPERDRIVE_SOLVER__MAX_ITERATIONS=20`.
//!
//! Fixed-point values are written as raw 18-decimal integer strings:
//!
//! ```toml
//! [solver]
//! max_iterations = 20
//! allowable_error = "10000000000"
//!
//! [checkpoint]
//! future_policy = "reject"
//! ```

use crate::checkpoint::FutureCheckpointPolicy;
use crate::solver::{DEFAULT_ALLOWABLE_ERROR, DEFAULT_MAX_ITERATIONS};
use anyhow::{Context, Result};
use config_crate::{Config, Environment, File};
use fixed_point::FixedPoint;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "HYPERDRIVE";

/// All engine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub solver: SolverSettings,
    pub checkpoint: CheckpointSettings,
}

/// Defaults used when a solver call leaves its options unset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub max_iterations: usize,
    pub allowable_error: FixedPoint,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            allowable_error: DEFAULT_ALLOWABLE_ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointSettings {
    pub future_policy: FutureCheckpointPolicy,
}

impl EngineSettings {
    /// Load settings from `path` (if given and present) with environment
    /// overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if path.exists() {
                debug!("Loading engine settings: {:?}", path);
                builder = builder.add_source(File::from(path).required(true));
            } else {
                warn!("Engine settings file not found, using defaults: {:?}", path);
            }
        }

        // HYPERDRIVE_<SECTION>__<FIELD>
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .context("Failed to build engine settings")?;
        let settings: Self = config
            .try_deserialize()
            .context("Failed to deserialize engine settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(content).context("Failed to parse engine settings TOML")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.solver.max_iterations == 0 {
            anyhow::bail!("solver.max_iterations must be positive");
        }
        Ok(())
    }
}
