//! Encrypted contribution pools with signed, checksummed tallies.
//!
//! Participants contribute ciphertexts into named pools; a compute pass
//! drains each pool's surviving records and produces one signed tally,
//! either from a local content-addressed commitment (stub mode) or from a
//! remote compute job's receipt.

pub mod client;
pub mod clock;
pub mod compute;
pub mod config;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod transport;
pub mod types;
pub mod verify;

pub use client::{PoolClient, PoolClientBuilder};
pub use config::{ConfigKey, ConfigOverrides, Mode, PoolConfig};
pub use error::PoolError;
pub use types::{
    CiphertextInput, CiphertextRecord, ComputeOptions, Pool, PoolInput, PoolMode, SignedResult,
    TallyRecord,
};
pub use verify::verify_result;
