//! Convoy deployment engine — reconcile, plan, execute.
//!
//! Given a service name, a desired replica count, and a chunking policy,
//! the engine computes an ordered sequence of lifecycle operations (stop,
//! start, spawn, destroy, or an external handoff script) that transitions
//! the cluster from its current unit inventory to the desired one, then
//! applies that sequence step by step, waiting for each unit to converge.
//!
//! # Components
//!
//! - **`unit`** / **`step`** — Value types: units, steps, plans
//! - **`config`** — Deployment configuration, strategy selection, validation
//! - **`deployment`** — Aggregate: load → chunk → plan → describe
//! - **`executor`** — Sequential plan execution with convergence polling
//! - **`error`** — Deployment error taxonomy
//!
//! The cluster itself is only ever reached through the
//! [`convoy_cluster::ClusterApi`] capability trait.

pub mod config;
pub mod deployment;
pub mod error;
pub mod executor;
pub mod step;
pub mod unit;

mod planner;
mod reconcile;

pub use config::{Chunking, DeploymentConfig, Strategy};
pub use deployment::Deployment;
pub use error::{DeployError, DeployResult};
pub use executor::{PlanExecutor, PollConfig};
pub use step::{Plan, Step, StepAction};
pub use unit::{RequiredAction, Unit, UnitState};
