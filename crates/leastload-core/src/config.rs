//! leastload.toml configuration parser.

use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{BalancerKind, ExpiryPolicy};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeastLoadConfig {
    pub lease: LeaseConfig,
    pub simulation: SimulationConfig,
}

/// How long admitted workers stay leased, and how expiry is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaseConfig {
    /// Shortest lease, in milliseconds (inclusive).
    pub min_ms: u64,
    /// Longest lease, in milliseconds (inclusive).
    pub max_ms: u64,
    pub policy: ExpiryPolicy,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            min_ms: 1_000,
            max_ms: 10_999,
            policy: ExpiryPolicy::Owner,
        }
    }
}

impl LeaseConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.min_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "lease.min_ms must be greater than zero".to_string(),
            ));
        }
        if self.min_ms > self.max_ms {
            return Err(CoreError::InvalidConfig(format!(
                "lease.min_ms ({}) exceeds lease.max_ms ({})",
                self.min_ms, self.max_ms
            )));
        }
        Ok(())
    }

    pub fn range_ms(&self) -> RangeInclusive<u64> {
        self.min_ms..=self.max_ms
    }

    /// Draw a lease duration uniformly from the configured range.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        Duration::from_millis(rng.gen_range(self.range_ms()))
    }
}

/// Parameters for the synthetic load harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub workers: usize,
    pub requests: usize,
    /// Upper bound (exclusive) on the delay before a request is issued.
    pub max_stagger_ms: u64,
    /// Upper bound (exclusive) on how long a dispatched request runs.
    pub max_work_ms: u64,
    pub balancer: BalancerKind,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            workers: 7,
            requests: 4_000,
            max_stagger_ms: 3_000,
            max_work_ms: 5_000,
            balancer: BalancerKind::LeastLoaded,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.workers == 0 {
            return Err(CoreError::InvalidConfig(
                "simulation.workers must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl LeastLoadConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: LeastLoadConfig = toml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.lease.validate()?;
        self.simulation.validate()
    }
}
