//! Client side of the home server's REST API.

mod http;
mod routes;
pub mod wire;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::model::{Action, ActionReply, StatusReport};

pub use http::HttpApi;
pub use routes::{Method, Route, RouteScheme};

/// One lifecycle request: a verb plus its target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionRequest {
    pub action: Action,
    /// `None` for fleet actions.
    pub service: Option<String>,
    pub compose_key: Option<String>,
}

/// Operations the dashboard needs from the backend.
#[async_trait]
pub trait ComposeApi: Send + Sync {
    fn scheme(&self) -> RouteScheme;

    /// Names of every service in the compose file.
    async fn list_services(&self) -> Result<Vec<String>, ApiError>;

    /// Status of one service, or of the whole fleet when `service` is `None`.
    async fn fetch_status(&self, service: Option<&str>) -> Result<StatusReport, ApiError>;

    /// Fire exactly one request for `request`.
    async fn dispatch(&self, request: &ActionRequest) -> Result<ActionReply, ApiError>;
}
