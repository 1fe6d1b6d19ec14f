use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::model::{ActionReply, StatusReport};

use super::routes::{Method, Route, RouteScheme};
use super::wire::{self, Envelope, StatusQuery};
use super::{ActionRequest, ComposeApi};

/// Wrapper around a reqwest client bound to the backend's base URL.
pub struct HttpApi {
    client: reqwest::Client,
    base: Url,
    scheme: RouteScheme,
}

impl HttpApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base = Url::parse(config.base_url.trim())
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.base_url.clone()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ApiError::Network {
                url: config.base_url.clone(),
                source: e,
            })?;

        Ok(Self {
            client,
            base,
            scheme: config.routes,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Send `route` and decode the envelope. Error envelopes are decoded even
    /// on non-2xx responses so the backend's message reaches the user.
    async fn send(&self, route: &Route) -> Result<Envelope, ApiError> {
        let url = route.to_url(&self.base)?;
        let url_str = url.to_string();
        tracing::debug!(method = ?route.method, url = %url_str, "api request");

        let request = match route.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };

        let response = request.send().await.map_err(|e| ApiError::Network {
            url: url_str.clone(),
            source: e,
        })?;
        let code = response.status();
        let body = response.text().await.map_err(|e| ApiError::Network {
            url: url_str.clone(),
            source: e,
        })?;

        wire::decode(code.as_u16(), &url_str, &body)
    }
}

#[async_trait]
impl ComposeApi for HttpApi {
    fn scheme(&self) -> RouteScheme {
        self.scheme
    }

    async fn list_services(&self) -> Result<Vec<String>, ApiError> {
        let envelope = self.send(&self.scheme.services()).await?;
        wire::services_from(envelope)
    }

    async fn fetch_status(&self, service: Option<&str>) -> Result<StatusReport, ApiError> {
        let route = self.scheme.status(service);
        let query = match (service, self.scheme) {
            (None, _) => StatusQuery::Fleet,
            (Some(name), RouteScheme::Docker) => StatusQuery::Grouped(name),
            (Some(name), RouteScheme::Containers) => StatusQuery::Filtered(name),
        };
        let envelope = self.send(&route).await?;
        wire::report_from(envelope, query)
    }

    async fn dispatch(&self, request: &ActionRequest) -> Result<ActionReply, ApiError> {
        let route = self.scheme.action(request)?;
        tracing::info!(action = %request.action, service = ?request.service, path = %route.path(), "dispatching action");
        let envelope = self.send(&route).await?;
        wire::reply_from(envelope)
    }
}
