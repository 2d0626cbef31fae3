//! Data model for pools, ciphertext records and signed tallies, plus the
//! field-level validation applied at the boundary before any mutation.

use crate::error::PoolError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fallback TTL applied when neither the record nor its pool carries one.
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Upper bound on any TTL: seven days.
pub const MAX_TTL_SECONDS: u64 = 604_800;

const POOL_ID_MIN: usize = 3;
const POOL_ID_MAX: usize = 128;
const DESCRIPTION_MAX: usize = 256;
const CIPHERTEXT_MIN: usize = 16;
const SENDER_PUBKEY_MIN: usize = 32;
const NONCE_MIN: usize = 16;

pub type Metadata = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolMode {
    Tally,
    Compute,
}

/// Caller-supplied pool definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolInput {
    pub id: String,
    pub mode: PoolMode,
    pub description: Option<String>,
    pub metadata: Option<Metadata>,
    /// Default TTL for records joined to this pool, in seconds.
    pub ttl_seconds: Option<u64>,
}

/// A registered pool. Immutable after creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pool {
    pub id: String,
    pub mode: PoolMode,
    pub description: Option<String>,
    pub metadata: Option<Metadata>,
    /// Set once at creation.
    pub created_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

/// One participant's contribution as submitted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CiphertextInput {
    /// Opaque encrypted payload.
    pub ciphertext: String,
    pub sender_pubkey: String,
    pub nonce: Option<String>,
    /// Defaults to the submission time when absent.
    pub timestamp: Option<DateTime<Utc>>,
    /// Falls back to the pool's TTL, then to [`DEFAULT_TTL_SECONDS`].
    pub ttl_seconds: Option<u64>,
    pub metadata: Option<Metadata>,
}

/// A stored contribution with its resolved expiry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CiphertextRecord {
    pub ciphertext: String,
    pub sender_pubkey: String,
    pub nonce: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub ttl_seconds: u64,
    pub metadata: Option<Metadata>,
    /// Computed once at insertion; never recalculated.
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
pub struct ComputeOptions {
    /// Copied into the tally summary; never part of the checksum.
    pub metadata: Option<Metadata>,
    /// Force the local commitment path even when an executor is configured.
    pub dry_run: Option<bool>,
    pub poll_interval_ms: Option<u64>,
    pub poll_timeout_ms: Option<u64>,
}

/// The computed aggregate prior to signing.
///
/// `checksum` commits to execution identity only: pool id, mxe id, job
/// commitment, participant count and computation time. `summary` can be
/// enriched later without invalidating it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TallyRecord {
    pub pool_id: String,
    pub mxe_id: String,
    pub job_commitment: String,
    pub participant_count: u64,
    pub computed_at: DateTime<Utc>,
    pub checksum: String,
    pub summary: Metadata,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedResult {
    pub result: TallyRecord,
    pub signature: String,
    pub public_key: String,
}

pub fn validate_pool_id(id: &str) -> Result<(), PoolError> {
    let len = id.chars().count();
    if len < POOL_ID_MIN || len > POOL_ID_MAX {
        return Err(PoolError::InvalidInput(format!(
            "pool id must be {POOL_ID_MIN}-{POOL_ID_MAX} characters, got {len}"
        )));
    }
    Ok(())
}

pub fn validate_ttl(ttl_seconds: u64) -> Result<(), PoolError> {
    if ttl_seconds == 0 || ttl_seconds > MAX_TTL_SECONDS {
        return Err(PoolError::InvalidInput(format!(
            "ttl_seconds must be within 1-{MAX_TTL_SECONDS}, got {ttl_seconds}"
        )));
    }
    Ok(())
}

pub fn validate_pool_input(input: &PoolInput) -> Result<(), PoolError> {
    validate_pool_id(&input.id)?;
    if let Some(description) = &input.description {
        if description.chars().count() > DESCRIPTION_MAX {
            return Err(PoolError::InvalidInput(format!(
                "description must be at most {DESCRIPTION_MAX} characters"
            )));
        }
    }
    if let Some(ttl_seconds) = input.ttl_seconds {
        validate_ttl(ttl_seconds)?;
    }
    Ok(())
}

pub fn validate_ciphertext_input(input: &CiphertextInput) -> Result<(), PoolError> {
    if input.ciphertext.len() < CIPHERTEXT_MIN {
        return Err(PoolError::InvalidInput(format!(
            "ciphertext must be at least {CIPHERTEXT_MIN} bytes"
        )));
    }
    if input.sender_pubkey.len() < SENDER_PUBKEY_MIN {
        return Err(PoolError::InvalidInput(format!(
            "sender_pubkey must be at least {SENDER_PUBKEY_MIN} bytes"
        )));
    }
    if let Some(nonce) = &input.nonce {
        if nonce.len() < NONCE_MIN {
            return Err(PoolError::InvalidInput(format!(
                "nonce must be at least {NONCE_MIN} bytes"
            )));
        }
    }
    if let Some(ttl_seconds) = input.ttl_seconds {
        validate_ttl(ttl_seconds)?;
    }
    Ok(())
}
