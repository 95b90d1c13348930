//! Deployment error types.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for deployment operations.
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors that can occur while planning or executing a deployment.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The service has no pre-existing footprint in the cluster.
    #[error("no units found for service '{0}'")]
    NoUnitsFound(String),

    /// Invalid chunking or instance arguments.
    #[error("usage error: {0}")]
    Usage(String),

    /// Invalid configuration, caught before any mutating cluster call.
    #[error("configuration error: {0}")]
    Config(String),

    /// A unit never reached the state requested of it.
    #[error("unit '{unit}' did not converge within {waited:?}")]
    ConvergenceTimeout { unit: String, waited: Duration },

    /// The atomic handler exited non-zero.
    #[error("handler '{handler}' failed with exit code {code}: {output}")]
    HandlerFailed {
        handler: String,
        code: i32,
        output: String,
    },

    /// The atomic handler could not be spawned or spoken to.
    #[error("handler '{handler}' could not be run: {source}")]
    HandlerIo {
        handler: String,
        #[source]
        source: std::io::Error,
    },

    /// The unit template file could not be read.
    #[error("failed to read unit template '{path}': {source}")]
    Template {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The scheduler rejected or failed a request.
    #[error("cluster error: {0}")]
    Cluster(#[from] convoy_cluster::ClusterError),
}
