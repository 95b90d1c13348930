//! Deployment configuration and strategy selection.
//!
//! Validation lives here, in the library, so that embedding the engine
//! without the CLI still enforces the strategy-specific option contract.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DeployError, DeployResult};

/// Step-generation policy for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Stop and start every unit in one stage.
    StopStart,
    /// Replace units in place, chunk by chunk.
    Rolling,
    /// Spawn fresh units, hand off traffic via an external script, then
    /// destroy the old units — chunk by chunk.
    Atomic,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::StopStart => "stopstart",
            Strategy::Rolling => "rolling",
            Strategy::Atomic => "atomic",
        }
    }

    /// Human-readable name used in plan headers.
    pub fn display_name(&self) -> &'static str {
        match self {
            Strategy::StopStart => "Stop Start",
            Strategy::Rolling => "Rolling",
            Strategy::Atomic => "Atomic",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stopstart" => Ok(Strategy::StopStart),
            "rolling" => Ok(Strategy::Rolling),
            "atomic" => Ok(Strategy::Atomic),
            other => Err(DeployError::Config(format!(
                "unknown strategy '{other}' (expected stopstart, rolling or atomic)"
            ))),
        }
    }
}

/// Chunk sizing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Chunking {
    /// One chunk containing the full current fleet.
    #[default]
    Auto,
    /// Explicit number of units per chunk.
    Count(usize),
    /// Percentage (1-100) of the deployable fleet per chunk.
    Percent(u32),
}

/// Everything needed to construct a [`crate::Deployment`].
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    /// Service whose units are being deployed.
    pub service: String,
    pub strategy: Strategy,
    /// Release tag used when synthesizing unit names. When absent it is
    /// derived from the first discovered unit.
    pub tag: Option<String>,
    /// Desired replica count; `None` keeps the current footprint.
    pub instances: Option<usize>,
    /// Template file for spawned units; when absent the template is fetched
    /// from the cluster's `{service}@.service` placeholder.
    pub unit_file: Option<PathBuf>,
    /// Handoff script invoked once per chunk under the atomic strategy.
    pub handler: Option<PathBuf>,
    pub chunking: Chunking,
}

impl DeploymentConfig {
    /// Minimal config: redeploy the service in place.
    pub fn new(service: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            service: service.into(),
            strategy,
            tag: None,
            instances: None,
            unit_file: None,
            handler: None,
            chunking: Chunking::Auto,
        }
    }

    /// Enforce the strategy-specific option contract.
    ///
    /// Runs before any cluster call, so misconfiguration never mutates the
    /// fleet.
    pub fn validate(&self) -> DeployResult<()> {
        if self.service.is_empty() {
            return Err(DeployError::Config("service name must not be empty".into()));
        }

        match self.chunking {
            Chunking::Count(0) => {
                return Err(DeployError::Usage("chunk count must be at least 1".into()));
            }
            Chunking::Percent(p) if !(1..=100).contains(&p) => {
                return Err(DeployError::Usage(format!(
                    "chunk percent must be between 1 and 100, got {p}"
                )));
            }
            _ => {}
        }

        match self.strategy {
            Strategy::StopStart => {
                if self.chunking != Chunking::Auto {
                    return Err(DeployError::Config(
                        "stopstart deploys all units at once and takes no chunking options".into(),
                    ));
                }
                if self.instances.is_some() {
                    return Err(DeployError::Config(
                        "stopstart cannot change the instance count".into(),
                    ));
                }
                if self.tag.is_some() {
                    return Err(DeployError::Config(
                        "stopstart restarts units in place and takes no tag".into(),
                    ));
                }
                if self.unit_file.is_some() {
                    return Err(DeployError::Config(
                        "stopstart never spawns units and takes no unit file".into(),
                    ));
                }
            }
            Strategy::Rolling => {}
            Strategy::Atomic => {
                if self.handler.is_none() {
                    return Err(DeployError::Config(
                        "atomic deployments require a handler script".into(),
                    ));
                }
            }
        }

        Ok(())
    }
}
