//! The `ClusterApi` capability trait and its wire types.
//!
//! Unit names and state strings are passed through verbatim — the scheduler
//! owns the naming convention and the state vocabulary. The engine only
//! relies on the "running" sub-state projection via
//! [`UnitStateRecord::is_running`].

use serde::{Deserialize, Serialize};

use crate::error::ClusterResult;

/// A unit known to the scheduler, as reported by the cluster-wide listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitListing {
    pub name: String,
    /// Coarse lifecycle state ("inactive", "loaded", "launched", ...).
    pub current_state: String,
}

/// Fine-grained runtime state of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitStateRecord {
    pub name: String,
    /// Process-level sub-state ("running", "dead", "exited", ...).
    pub sub_state: String,
}

impl UnitStateRecord {
    /// Whether the unit's process is currently running.
    pub fn is_running(&self) -> bool {
        self.sub_state == "running"
    }
}

/// Desired lifecycle state that can be requested for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// Loaded and started.
    Launched,
    /// Stopped but still registered.
    Inactive,
}

impl DesiredState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DesiredState::Launched => "launched",
            DesiredState::Inactive => "inactive",
        }
    }
}

/// Capability interface the deployment engine requires from a scheduler.
///
/// Implementations must be safe to call strictly sequentially from a single
/// logical thread of control; the engine never issues concurrent calls.
#[allow(async_fn_in_trait)]
pub trait ClusterApi {
    /// Cluster-wide unit listing (name + coarse state).
    async fn list_units(&self) -> ClusterResult<Vec<UnitListing>>;

    /// Fine-grained running/not-running projection for all units.
    async fn list_unit_states(&self) -> ClusterResult<Vec<UnitStateRecord>>;

    /// Request a desired lifecycle state for an existing unit.
    async fn set_desired_state(&self, name: &str, state: DesiredState) -> ClusterResult<()>;

    /// Register a new unit from a template payload and launch it.
    async fn create_unit(&self, name: &str, template: &str) -> ClusterResult<()>;

    /// Permanently remove a unit from the scheduler.
    async fn destroy_unit(&self, name: &str) -> ClusterResult<()>;

    /// Fetch the raw unit file of an existing unit (used for templates).
    async fn get_unit(&self, name: &str) -> ClusterResult<String>;
}
