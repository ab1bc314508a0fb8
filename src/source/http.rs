//! HTTP implementation of [`TrendSource`].
//!
//! Issues plain `GET`s against the configured base URL using a shared
//! [`reqwest::Client`].  Timeouts are left to the client; a timed-out
//! request surfaces as [`FetchError::Transport`] like any other network
//! failure.

use reqwest::{Client, Url};
use tracing::debug;

use super::{ServiceStatus, TrendSource, TrendingPayload};
use crate::config::Config;
use crate::error::{Endpoint, FetchError};

/// Polls the aggregation service over HTTP.
pub struct HttpSource {
    client: Client,
    status_url: Url,
    trending_url: Url,
}

impl HttpSource {
    /// Build a source from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the client cannot be constructed
    /// (e.g. the TLS backend fails to initialise).
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            status_url: config.status_url(),
            trending_url: config.trending_url(),
        })
    }

    /// `GET` one endpoint and return the body of a 2xx response.
    async fn get_body(&self, endpoint: Endpoint) -> Result<Vec<u8>, FetchError> {
        let url = match endpoint {
            Endpoint::Status => &self.status_url,
            Endpoint::Trending => &self.trending_url,
        };
        let transport = |source| FetchError::Transport { endpoint, source };

        let start = std::time::Instant::now();
        let response = self.client.get(url.clone()).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        debug!(
            %endpoint,
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "fetched endpoint"
        );
        Ok(body.to_vec())
    }
}

impl TrendSource for HttpSource {
    async fn fetch_status(&self) -> Result<ServiceStatus, FetchError> {
        let body = self.get_body(Endpoint::Status).await?;
        ServiceStatus::from_slice(&body).map_err(|source| FetchError::Decode {
            endpoint: Endpoint::Status,
            source,
        })
    }

    async fn fetch_trending(&self) -> Result<TrendingPayload, FetchError> {
        let body = self.get_body(Endpoint::Trending).await?;
        TrendingPayload::from_slice(&body).map_err(|source| FetchError::Decode {
            endpoint: Endpoint::Trending,
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
