use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::model::Action;

use super::ActionRequest;

/// Endpoint family exposed by the backend.
///
/// `Containers` is the current REST layout (`POST /api/containers/:verb/:service`,
/// one fleet-wide status endpoint). `Docker` is the older layout keyed by
/// compose project (`GET /api/docker/:verb/:name`, status per project).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteScheme {
    #[default]
    Containers,
    Docker,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A resolved endpoint: method, unencoded path segments and query pairs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
}

impl Route {
    fn new(method: Method, segments: &[&str]) -> Self {
        Self {
            method,
            segments: segments.iter().map(|s| s.to_string()).collect(),
            query: Vec::new(),
        }
    }

    fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Human-readable path, used in logs.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// Append the route to `base`, percent-encoding each segment.
    pub fn to_url(&self, base: &Url) -> Result<Url, ApiError> {
        let mut url = base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(base.to_string()))?;
            segments.pop_if_empty();
            segments.extend(&self.segments);
        }
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }
}

impl RouteScheme {
    pub fn services(&self) -> Route {
        Route::new(Method::Get, &["api", "services"])
    }

    /// Status endpoint. Only the docker layout has a per-project variant.
    pub fn status(&self, service: Option<&str>) -> Route {
        match (self, service) {
            (RouteScheme::Docker, Some(name)) => Route::new(Method::Get, &["api", "docker", "status", name]),
            _ => Route::new(Method::Get, &["api", "containers", "status"]),
        }
    }

    /// True when each service's status comes from its own request.
    pub fn fans_out_status(&self) -> bool {
        matches!(self, RouteScheme::Docker)
    }

    pub fn action(&self, request: &ActionRequest) -> Result<Route, ApiError> {
        let verb = request.action.verb();
        if request.action.is_fleet() {
            return Ok(Route::new(Method::Get, &["api", "docker", verb]));
        }

        let service = request
            .service
            .as_deref()
            .ok_or_else(|| ApiError::InvalidUrl(format!("action '{}' needs a service", verb)))?;

        let route = match self {
            RouteScheme::Containers => Route::new(Method::Post, &["api", "containers", verb, service]),
            RouteScheme::Docker => {
                let route = Route::new(Method::Get, &["api", "docker", verb, service]);
                match &request.compose_key {
                    Some(key) => route.with_query("compose_key", key),
                    None => route,
                }
            }
        };
        Ok(route)
    }
}

impl ActionRequest {
    pub fn service(service: impl Into<String>, action: Action) -> Self {
        Self {
            action,
            service: Some(service.into()),
            compose_key: None,
        }
    }

    pub fn fleet(action: Action) -> Self {
        Self {
            action,
            service: None,
            compose_key: None,
        }
    }

    pub fn with_compose_key(mut self, key: Option<String>) -> Self {
        self.compose_key = key;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://nas.local:5000").unwrap()
    }

    #[test]
    fn containers_scheme_posts_actions() {
        let route = RouteScheme::Containers
            .action(&ActionRequest::service("immich", Action::Stop))
            .unwrap();
        assert_eq!(route.method, Method::Post);
        assert_eq!(route.path(), "/api/containers/stop/immich");
    }

    #[test]
    fn docker_scheme_carries_compose_key() {
        let request = ActionRequest::service("immich-server", Action::Restart)
            .with_compose_key(Some("immich".into()));
        let route = RouteScheme::Docker.action(&request).unwrap();
        assert_eq!(route.method, Method::Get);
        let url = route.to_url(&base()).unwrap();
        assert_eq!(url.as_str(), "http://nas.local:5000/api/docker/restart/immich-server?compose_key=immich");
    }

    #[test]
    fn fleet_actions_ignore_scheme() {
        for scheme in [RouteScheme::Containers, RouteScheme::Docker] {
            let route = scheme.action(&ActionRequest::fleet(Action::DownAll)).unwrap();
            assert_eq!(route.method, Method::Get);
            assert_eq!(route.path(), "/api/docker/down-all");
        }
    }

    #[test]
    fn service_action_without_service_is_rejected() {
        let request = ActionRequest { action: Action::Up, service: None, compose_key: None };
        assert!(RouteScheme::Containers.action(&request).is_err());
    }

    #[test]
    fn status_routes() {
        assert_eq!(RouteScheme::Containers.status(Some("immich")).path(), "/api/containers/status");
        assert_eq!(RouteScheme::Docker.status(Some("immich")).path(), "/api/docker/status/immich");
        assert_eq!(RouteScheme::Docker.status(None).path(), "/api/containers/status");
    }

    #[test]
    fn segments_are_percent_encoded() {
        let route = RouteScheme::Docker.status(Some("my app/1"));
        let url = route.to_url(&base()).unwrap();
        assert_eq!(url.path(), "/api/docker/status/my%20app%2F1");
    }

    #[test]
    fn base_path_prefix_is_kept() {
        let base = Url::parse("http://host/manager/").unwrap();
        let url = RouteScheme::Containers.services().to_url(&base).unwrap();
        assert_eq!(url.as_str(), "http://host/manager/api/services");
    }
}
