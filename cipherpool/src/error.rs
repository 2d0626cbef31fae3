use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("missing required config value: {0}")]
    ConfigMissing(&'static str),

    #[error("pool {0} not found")]
    PoolNotFound(String),

    #[error("pool {0} already exists")]
    PoolExists(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("collector request to {url} failed: {detail}")]
    CollectorHttp {
        url: String,
        detail: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("compute job for pool {pool_id} failed")]
    ComputeSubmissionFailed {
        pool_id: String,
        #[source]
        source: BoxError,
    },

    #[error("compute job for pool {pool_id} timed out after {waited_ms} ms")]
    ComputeTimedOut { pool_id: String, waited_ms: u64 },
}
