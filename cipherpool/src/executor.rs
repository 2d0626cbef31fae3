//! Remote compute collaborator seam.
//!
//! The executor is an explicit optional dependency injected at client
//! construction: `Option<Arc<dyn RemoteExecutor>>`. Absence is the typed
//! "no executor" state that forces the local commitment path.

use crate::error::BoxError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Handle returned by a job submission.
#[derive(Clone, Debug, Deserialize)]
pub struct JobHandle {
    pub job_id: String,
}

/// Completion receipt for a submitted job.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct JobReceipt {
    /// Remote-attested commitment binding the job to its inputs. When the
    /// executor reports none, the job id stands in.
    pub job_commitment: Option<String>,
    /// Participant count as observed by the executor; overrides the local
    /// drain count when present.
    pub participant_count: Option<u64>,
}

/// Submission context forwarded alongside the payload.
#[derive(Clone, Debug)]
pub struct SubmitContext {
    pub pool_id: String,
    pub api_key: String,
}

#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn submit_job(&self, payload: &Value, ctx: &SubmitContext) -> Result<JobHandle, BoxError>;

    /// One poll attempt. `Ok(None)` means the job is still running.
    async fn poll_job(&self, job_id: &str) -> Result<Option<JobReceipt>, BoxError>;
}
