//! Client surface tying configuration, ledger, transport and executor
//! together.

use crate::clock::{Clock, SystemClock};
use crate::compute;
use crate::config::{ConfigKey, ConfigOverrides, Mode, PoolConfig};
use crate::error::PoolError;
use crate::executor::RemoteExecutor;
use crate::ledger::PoolLedger;
use crate::transport::{CollectorClient, CollectorExecutor};
use crate::types::{
    CiphertextInput, CiphertextRecord, ComputeOptions, Pool, PoolInput, SignedResult,
    validate_ciphertext_input, validate_pool_input,
};
use crate::verify;
use serde_json::Value;
use std::sync::Arc;

/// Entry point owning the active configuration and all pool state.
///
/// The local ledger is authoritative; in testnet mode every create/join is
/// announced to the collector first (fail-fast, before any local mutation)
/// and then recorded locally.
pub struct PoolClient {
    config: PoolConfig,
    ledger: PoolLedger,
    clock: Arc<dyn Clock>,
    transport: Option<CollectorClient>,
    executor: Option<Arc<dyn RemoteExecutor>>,
}

pub struct PoolClientBuilder {
    config: PoolConfig,
    clock: Arc<dyn Clock>,
    executor: Option<Arc<dyn RemoteExecutor>>,
}

impl PoolClientBuilder {
    fn new(config: PoolConfig) -> Self {
        Self { config, clock: Arc::new(SystemClock), executor: None }
    }

    /// Replace the wall clock, for deterministic TTL behavior.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Inject a remote executor.
    ///
    /// Without one, testnet mode falls back to the collector's own job
    /// endpoints and stub mode computes locally.
    pub fn executor(mut self, executor: Arc<dyn RemoteExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn build(self) -> Result<PoolClient, PoolError> {
        let transport = transport_for(&self.config)?;
        Ok(PoolClient {
            ledger: PoolLedger::new(self.clock.clone()),
            config: self.config,
            clock: self.clock,
            transport,
            executor: self.executor,
        })
    }
}

impl PoolClient {
    pub fn builder(config: PoolConfig) -> PoolClientBuilder {
        PoolClientBuilder::new(config)
    }

    /// Client configured from the environment.
    pub fn from_env() -> Result<Self, PoolError> {
        Self::builder(PoolConfig::from_env()?).build()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Resolve the configuration, failing `ConfigMissing` when any of the
    /// requested keys is absent.
    pub fn config_with(&self, required: &[ConfigKey]) -> Result<&PoolConfig, PoolError> {
        self.config.require(required)?;
        Ok(&self.config)
    }

    /// Merge call-site overrides into the active configuration.
    ///
    /// A mode or node change rewires the collector transport.
    pub fn configure(&mut self, overrides: ConfigOverrides) -> Result<&PoolConfig, PoolError> {
        let merged = self.config.merged(overrides)?;
        self.transport = transport_for(&merged)?;
        self.config = merged;
        Ok(&self.config)
    }

    pub async fn create_pool(&self, input: PoolInput) -> Result<Pool, PoolError> {
        if let Some(transport) = &self.transport {
            validate_pool_input(&input)?;
            let payload = serde_json::to_value(&input).expect("in-memory serialization");
            let echoed: Option<Value> = transport
                .post_json(&["pools"], Some(&payload), self.config.api_key.as_deref())
                .await?;
            if echoed.is_some() {
                tracing::debug!(pool_id = %input.id, "pool announced to collector");
            }
        }
        self.ledger.create_pool(input)
    }

    pub async fn join_pool(
        &self,
        pool_id: &str,
        input: CiphertextInput,
    ) -> Result<CiphertextRecord, PoolError> {
        if let Some(transport) = &self.transport {
            validate_ciphertext_input(&input)?;
            let payload = serde_json::to_value(&input).expect("in-memory serialization");
            let _echoed: Option<Value> = transport
                .post_json(&["pools", pool_id, "join"], Some(&payload), self.config.api_key.as_deref())
                .await?;
        }
        self.ledger.join_pool(pool_id, input)
    }

    pub fn pool_snapshot(&self, pool_id: &str) -> Result<Pool, PoolError> {
        self.ledger.snapshot(pool_id)
    }

    pub async fn compute_pool(
        &self,
        pool_id: &str,
        options: ComputeOptions,
    ) -> Result<SignedResult, PoolError> {
        let executor = self.effective_executor();
        compute::compute_pool(
            &self.ledger,
            &self.config,
            executor.as_ref(),
            &self.clock,
            pool_id,
            options,
        )
        .await
    }

    /// Verify a signed result, possibly produced by another process.
    pub fn verify_result(&self, input: &Value) -> Result<bool, PoolError> {
        verify::verify_result(input)
    }

    fn effective_executor(&self) -> Option<Arc<dyn RemoteExecutor>> {
        if let Some(executor) = &self.executor {
            return Some(executor.clone());
        }
        self.transport
            .as_ref()
            .map(|transport| {
                Arc::new(CollectorExecutor::new(transport.clone())) as Arc<dyn RemoteExecutor>
            })
    }
}

fn transport_for(config: &PoolConfig) -> Result<Option<CollectorClient>, PoolError> {
    match config.mode {
        Mode::Testnet => Ok(Some(CollectorClient::new(&config.node)?)),
        Mode::Stub => Ok(None),
    }
}
