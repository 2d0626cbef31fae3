//! End-to-end stub flow: create a pool, join two ciphertexts, compute a
//! dry-run tally and verify its signature.

use base64::Engine;
use cipherpool::{
    CiphertextInput, ComputeOptions, PoolClient, PoolConfig, PoolError, PoolInput, PoolMode,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), PoolError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let config = PoolConfig {
        mxe_id: Some("mxe-demo".to_string()),
        attester_secret: Some("demo-attester-secret".to_string()),
        ..PoolConfig::default()
    };
    let client = PoolClient::builder(config).build()?;

    let pool = client
        .create_pool(PoolInput {
            id: "demo-tally".to_string(),
            mode: PoolMode::Tally,
            description: Some("demo contribution pool".to_string()),
            metadata: None,
            ttl_seconds: None,
        })
        .await?;
    tracing::info!(pool_id = %pool.id, ttl_seconds = pool.ttl_seconds, "pool created");

    let b64 = base64::engine::general_purpose::STANDARD;
    for sender in ["alice", "bob"] {
        let record = client
            .join_pool(
                &pool.id,
                CiphertextInput {
                    ciphertext: b64.encode(format!("encrypted contribution from {sender}")),
                    sender_pubkey: format!("{sender:0<32}"),
                    ..CiphertextInput::default()
                },
            )
            .await?;
        tracing::info!(sender, expires_at = %record.expires_at, "ciphertext joined");
    }

    let signed = client
        .compute_pool(
            &pool.id,
            ComputeOptions { dry_run: Some(true), ..ComputeOptions::default() },
        )
        .await?;
    tracing::info!(
        participants = signed.result.participant_count,
        commitment = %signed.result.job_commitment,
        checksum = %signed.result.checksum,
        "tally computed"
    );

    let as_value = serde_json::to_value(&signed).expect("in-memory serialization");
    let ok = client.verify_result(&as_value)?;
    tracing::info!(ok, "signature checked");

    Ok(())
}
