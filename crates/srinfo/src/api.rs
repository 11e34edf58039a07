//! Paginated client for the channel and schedule endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::ACCEPT;
use reqwest::Url;
use srinfo_proto::config::ApiConfig;
use srinfo_proto::ChannelId;
use thiserror::Error;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::parser;

/// One fetched page, body untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// 1-based page number within its paginated request.
    pub page: u32,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Connect(String),
    #[error("{0}")]
    Body(String),
}

/// Plain GET. Non-success statuses are returned, not turned into errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError>;
}

/// `reqwest`-backed transport used outside of tests.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/xml")
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(HttpResponse {
                status: status.as_u16(),
                body: String::new(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        Ok(HttpResponse {
            status: status.as_u16(),
            body,
        })
    }
}

/// Stateless handle on the remote API: a base URL and a transport. Cheap to
/// clone and safe to share between tasks.
#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("base", &self.base.as_str()).finish()
    }
}

impl ApiClient {
    pub fn new(base_url: &str, transport: Arc<dyn Transport>) -> Result<Self, ApiError> {
        let invalid = |message: String| ApiError::InvalidEndpoint {
            url: base_url.to_string(),
            message,
        };
        let mut base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid("not a hierarchical URL".to_string()));
        }
        // Endpoint paths are joined relative to the base
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base, transport })
    }

    pub fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(&config.base_url, Arc::new(transport))?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Every page of the channel list, in page order.
    pub async fn fetch_channel_list(&self) -> Result<Vec<Document>, ApiError> {
        let endpoint = self.endpoint("channels", &[])?;
        info!("Fetching channel list");
        let docs = self.fetch_paginated(endpoint).await?;
        info!("Fetched channel list ({} pages)", docs.len());
        Ok(docs)
    }

    /// Every page of the schedule for each date, dates in the order given.
    pub async fn fetch_schedule(
        &self,
        channel: ChannelId,
        dates: &[NaiveDate],
    ) -> Result<Vec<Document>, ApiError> {
        info!("Fetching schedule for channel {} on {:?}", channel, dates);
        let mut docs = Vec::new();
        for date in dates {
            let endpoint = self.endpoint(
                "scheduledepisodes",
                &[
                    ("channelid", channel.to_string()),
                    ("date", date.format("%Y-%m-%d").to_string()),
                ],
            )?;
            docs.extend(self.fetch_paginated(endpoint).await?);
        }
        info!("Fetched schedule for channel {} ({} pages)", channel, docs.len());
        Ok(docs)
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| ApiError::InvalidEndpoint {
                url: format!("{}{}", self.base, path),
                message: e.to_string(),
            })?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Page 1 plain, then pages 2..=totalpages with `page=N`. The first
    /// failing page aborts the whole request.
    async fn fetch_paginated(&self, endpoint: Url) -> Result<Vec<Document>, ApiError> {
        let first = self.fetch_page(&endpoint, 1).await?;
        let pages = parser::total_pages(&first).map_err(|source| ApiError::Document {
            endpoint: endpoint.to_string(),
            source,
        })?;

        // `pages` comes from the server; grow as pages arrive
        let mut docs = vec![first];
        for page in 2..=pages {
            docs.push(self.fetch_page(&endpoint, page).await?);
        }
        Ok(docs)
    }

    async fn fetch_page(&self, endpoint: &Url, page: u32) -> Result<Document, ApiError> {
        let mut url = endpoint.clone();
        if page > 1 {
            url.query_pairs_mut().append_pair("page", &page.to_string());
        }
        debug!("GET {}", url);

        let response = self.transport.get(&url).await.map_err(|e| match e {
            TransportError::Connect(message) => ApiError::Transport {
                endpoint: endpoint.to_string(),
                page,
                message,
            },
            TransportError::Body(message) => ApiError::Body {
                endpoint: endpoint.to_string(),
                page,
                message,
            },
        })?;

        if !(200..300).contains(&response.status) {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                page,
                status: response.status,
            });
        }

        Ok(Document {
            page,
            body: response.body,
        })
    }
}
