//! HTTP transport for the collector API.

use crate::error::{BoxError, PoolError};
use crate::executor::{JobHandle, JobReceipt, RemoteExecutor, SubmitContext};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// JSON client for a collector node.
#[derive(Clone)]
pub struct CollectorClient {
    http: Client,
    base: Url,
}

impl CollectorClient {
    pub fn new(base: &str) -> Result<Self, PoolError> {
        let base = Url::parse(base)
            .map_err(|err| PoolError::ConfigInvalid(format!("collector node URL: {err}")))?;
        Ok(Self { http: Client::new(), base })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, PoolError> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                PoolError::ConfigInvalid(format!("collector node URL cannot be a base: {}", self.base))
            })?;
            path.pop_if_empty();
            path.extend(["api", "v1"]);
            path.extend(segments);
        }
        Ok(url)
    }

    /// POST a JSON payload to the collector.
    ///
    /// Non-2xx responses and transport failures surface as `CollectorHttp`
    /// with the url attached; an empty response body means "no payload"
    /// rather than an error.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        payload: Option<&Value>,
        api_key: Option<&str>,
    ) -> Result<Option<T>, PoolError> {
        let url = self.endpoint(segments)?;

        let mut request = self.http.post(url.clone());
        if let Some(payload) = payload {
            request = request.json(payload);
        }
        if let Some(api_key) = api_key {
            request = request.header("X-API-KEY", api_key);
        }

        tracing::debug!(url = %url, "collector request");
        let response = request.send().await.map_err(|err| PoolError::CollectorHttp {
            url: url.to_string(),
            detail: "failed to reach collector".to_string(),
            source: Some(Box::new(err)),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PoolError::CollectorHttp {
                url: url.to_string(),
                detail: format!("HTTP {}", status.as_u16()),
                source: None,
            });
        }

        let body = response.text().await.map_err(|err| PoolError::CollectorHttp {
            url: url.to_string(),
            detail: "failed to read response body".to_string(),
            source: Some(Box::new(err)),
        })?;
        if body.is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&body).map(Some).map_err(|err| {
            PoolError::InvalidInput(format!("malformed JSON from collector at {url}: {err}"))
        })
    }
}

/// `RemoteExecutor` backed by the collector's own job endpoints.
///
/// Used in testnet mode when no other executor is injected.
pub struct CollectorExecutor {
    client: CollectorClient,
}

impl CollectorExecutor {
    pub fn new(client: CollectorClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteExecutor for CollectorExecutor {
    async fn submit_job(&self, payload: &Value, ctx: &SubmitContext) -> Result<JobHandle, BoxError> {
        let handle: Option<JobHandle> = self
            .client
            .post_json(&["pools", &ctx.pool_id, "compute"], Some(payload), Some(&ctx.api_key))
            .await?;
        handle.ok_or_else(|| "collector returned no job handle".into())
    }

    async fn poll_job(&self, job_id: &str) -> Result<Option<JobReceipt>, BoxError> {
        // A pending job answers with an empty body.
        Ok(self.client.post_json(&["jobs", job_id, "status"], None, None).await?)
    }
}
