//! Shared types used across leastload crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque unit of work routed by a balancer.
///
/// Balancers pass requests through unmodified; only workers look inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    pub kind: String,
}

impl Request {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// How the lease reaper decides which lease a fired expiry check removes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpiryPolicy {
    /// A fired check removes only the lease that scheduled it.
    #[default]
    Owner,
    /// A fired check removes the first expired lease found in id order,
    /// whichever lease scheduled it.
    FirstExpired,
}

/// Which balancing strategy a harness should run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BalancerKind {
    #[default]
    LeastLoaded,
    RoundRobin,
}

impl BalancerKind {
    pub fn label(&self) -> &'static str {
        match self {
            BalancerKind::LeastLoaded => "least-loaded",
            BalancerKind::RoundRobin => "round-robin",
        }
    }
}
