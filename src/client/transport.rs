//! HTTP transport backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ClientConfig;
use crate::error::Result;

use super::executor::{Outcome, Request, RequestExecutor, Response};

/// Request executor backed by a pooled reqwest client.
///
/// This is the production end of the executor chain: it performs the request
/// on the wire and converts the result back into the client's neutral
/// response type. TLS is provided by rustls.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
}

impl HttpExecutor {
    /// Create an executor with default client settings.
    pub fn new() -> Result<Self> {
        Self::from_config(&ClientConfig::default())
    }

    /// Create an executor configured from a client section.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, request: Request) -> Result<Outcome> {
        let (parts, body) = request.into_parts();
        let mut builder = self
            .client
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers);
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        let mut converted = Response::new(body.to_vec());
        *converted.status_mut() = status;
        *converted.headers_mut() = headers;
        Ok(Outcome::Response(converted))
    }
}
