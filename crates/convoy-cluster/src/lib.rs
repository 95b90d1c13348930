//! Convoy cluster boundary — the scheduler capability interface.
//!
//! The deployment engine never talks to a scheduler directly; it consumes
//! the [`ClusterApi`] trait defined here. The crate also ships
//! [`HttpClusterClient`], a JSON/HTTP implementation for fleet-style
//! schedulers that expose a unit registry over a REST endpoint.
//!
//! # Components
//!
//! - **`api`** — The `ClusterApi` capability trait and wire types
//! - **`http`** — HTTP client implementation of `ClusterApi`
//! - **`error`** — Cluster error taxonomy

pub mod api;
pub mod error;
pub mod http;

pub use api::{ClusterApi, DesiredState, UnitListing, UnitStateRecord};
pub use error::{ClusterError, ClusterResult};
pub use http::HttpClusterClient;
