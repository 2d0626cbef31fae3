//! Compute orchestration: drain a pool, run the local or remote path, and
//! produce one signed tally.

use crate::clock::Clock;
use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::executor::{RemoteExecutor, SubmitContext};
use crate::ledger::PoolLedger;
use crate::types::{ComputeOptions, SignedResult, TallyRecord};
use cipherpool_crypto::canonical::content_hash;
use cipherpool_crypto::signer::{KeyError, Keypair};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
pub const MIN_POLL_INTERVAL_MS: u64 = 250;
pub const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// Ceiling on the remote poll loop. Overridable per call; callers wanting a
/// longer wait must say so explicitly.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 120_000;

pub(crate) async fn compute_pool(
    ledger: &PoolLedger,
    config: &PoolConfig,
    executor: Option<&Arc<dyn RemoteExecutor>>,
    clock: &Arc<dyn Clock>,
    pool_id: &str,
    options: ComputeOptions,
) -> Result<SignedResult, PoolError> {
    let pool = ledger.snapshot(pool_id)?;
    let records = ledger.drain(pool_id)?;

    let mxe_id = config.require_mxe_id()?.to_string();
    let attester_secret = config.require_attester_secret()?;

    let dry_run = options.dry_run.unwrap_or(executor.is_none());
    let summary = options.metadata.unwrap_or_default();

    let payload = json!({
        "pool_id": &pool.id,
        "mxe_id": &mxe_id,
        "mode": pool.mode,
        "participant_count": records.len() as u64,
        "metadata": &summary,
        "submitted_at": clock.now(),
    });

    let mut participant_count = records.len() as u64;
    let job_commitment = match executor {
        Some(executor) if !dry_run => {
            let api_key = config.require_api_key()?.to_string();
            let ctx = SubmitContext { pool_id: pool.id.clone(), api_key };

            let interval_ms = options
                .poll_interval_ms
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
                .clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS);
            let timeout_ms = options
                .poll_timeout_ms
                .unwrap_or(DEFAULT_POLL_TIMEOUT_MS)
                .max(interval_ms);

            let handle = executor.submit_job(&payload, &ctx).await.map_err(|source| {
                PoolError::ComputeSubmissionFailed { pool_id: pool.id.clone(), source }
            })?;
            tracing::info!(pool_id = %pool.id, job_id = %handle.job_id, "compute job submitted");

            let started = Instant::now();
            let receipt = loop {
                match executor.poll_job(&handle.job_id).await {
                    Ok(Some(receipt)) => break receipt,
                    Ok(None) => {}
                    Err(source) => {
                        return Err(PoolError::ComputeSubmissionFailed {
                            pool_id: pool.id.clone(),
                            source,
                        });
                    }
                }

                let waited_ms = started.elapsed().as_millis() as u64;
                if waited_ms >= timeout_ms {
                    return Err(PoolError::ComputeTimedOut { pool_id: pool.id.clone(), waited_ms });
                }
                tokio::time::sleep(Duration::from_millis(interval_ms)).await;
            };

            if let Some(count) = receipt.participant_count {
                participant_count = count;
            }
            receipt.job_commitment.unwrap_or(handle.job_id)
        }
        _ => {
            tracing::debug!(
                pool_id = %pool.id,
                participants = participant_count,
                "computing local commitment"
            );
            content_hash(&payload)
        }
    };

    let computed_at = clock.now();
    let checksum = content_hash(&json!({
        "pool_id": &pool.id,
        "mxe_id": &mxe_id,
        "job_commitment": &job_commitment,
        "participant_count": participant_count,
        "computed_at": computed_at,
    }));

    let tally = TallyRecord {
        pool_id: pool.id,
        mxe_id,
        job_commitment,
        participant_count,
        computed_at,
        checksum,
        summary,
    };

    let keypair = Keypair::from_secret(attester_secret).map_err(map_key_error)?;
    let tally_value = serde_json::to_value(&tally).expect("in-memory serialization");
    let envelope = keypair.sign(&tally_value);

    Ok(SignedResult {
        result: tally,
        signature: envelope.signature,
        public_key: envelope.public_key,
    })
}

fn map_key_error(err: KeyError) -> PoolError {
    match err {
        KeyError::EmptySecret => PoolError::ConfigMissing("attester_secret"),
        KeyError::MalformedSecret(detail) => PoolError::ConfigInvalid(detail),
    }
}
