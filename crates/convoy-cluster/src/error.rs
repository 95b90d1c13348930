//! Cluster error types.

use thiserror::Error;

/// Result type alias for cluster API operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors that can occur while talking to the cluster scheduler.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("invalid cluster endpoint '{0}'")]
    Endpoint(String),

    #[error("unable to reach cluster at {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("cluster returned {status} for {path}")]
    Status { status: u16, path: String },

    #[error("failed to decode cluster response: {0}")]
    Decode(String),
}
