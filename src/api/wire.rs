//! JSON envelopes returned by the backend and their normalization.
//!
//! Every endpoint answers `{ "status": "success" | "error", ... }`. Status
//! endpoints carry `containers` rows shaped like `docker compose ps --format json`.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::ApiError;
use crate::model::{ActionReply, ContainerState, ContainerStatus, PortMapping, StatusReport};

#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub services: Option<Vec<String>>,
    #[serde(default)]
    pub containers: Option<Vec<WireContainer>>,
    #[serde(default)]
    pub image_updated: Option<bool>,
    #[serde(default)]
    pub was_running: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct WireContainer {
    #[serde(rename = "Service", default)]
    pub service: Option<String>,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "State", default)]
    pub state: Option<String>,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
    #[serde(rename = "Size", default)]
    pub size: Option<String>,
    #[serde(rename = "Ports", alias = "Publishers", default)]
    pub ports: Option<Vec<WirePort>>,
}

#[derive(Debug, Deserialize)]
pub struct WirePort {
    #[serde(rename = "URL", default)]
    pub url: Option<String>,
    #[serde(rename = "TargetPort", default)]
    pub target_port: u16,
    #[serde(rename = "PublishedPort", default)]
    pub published_port: u16,
    #[serde(rename = "Protocol", default)]
    pub protocol: Option<String>,
}

/// Which status endpoint produced a response, which decides how rows are keyed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusQuery<'a> {
    /// Fleet endpoint: rows keyed by their own `Service`.
    Fleet,
    /// Fleet endpoint narrowed to one service; other rows are dropped.
    Filtered(&'a str),
    /// Per-project endpoint: the matching row, or the project's first row,
    /// is keyed under the requested name.
    Grouped(&'a str),
}

pub fn parse_envelope(url: &str, body: &str) -> Result<Envelope, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Decode a response body given its HTTP status code.
///
/// A non-2xx response with an error envelope keeps the backend's message.
/// Anything else on a non-2xx code reports the code itself.
pub fn decode(code: u16, url: &str, body: &str) -> Result<Envelope, ApiError> {
    let ok = (200..300).contains(&code);
    match parse_envelope(url, body) {
        Ok(envelope) if ok => envelope.into_result(),
        Ok(envelope) if envelope.status.is_some() && !envelope.is_success() => envelope.into_result(),
        Err(e) if ok => Err(e),
        _ => Err(ApiError::Status {
            url: url.to_string(),
            code,
        }),
    }
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }

    /// Turn an `"error"` envelope into `ApiError::Backend`.
    pub fn into_result(self) -> Result<Self, ApiError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(ApiError::Backend {
            message: self
                .message
                .unwrap_or_else(|| "Backend reported an error".to_string()),
            detail: self.error,
        })
    }
}

pub fn services_from(envelope: Envelope) -> Result<Vec<String>, ApiError> {
    let envelope = envelope.into_result()?;
    let mut seen = std::collections::HashSet::new();
    Ok(envelope
        .services
        .unwrap_or_default()
        .into_iter()
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect())
}

pub fn report_from(envelope: Envelope, query: StatusQuery<'_>) -> Result<StatusReport, ApiError> {
    let envelope = envelope.into_result()?;
    let rows = envelope.containers.unwrap_or_default();
    Ok(normalize(rows, query))
}

pub fn reply_from(envelope: Envelope) -> Result<ActionReply, ApiError> {
    let envelope = envelope.into_result()?;
    Ok(ActionReply {
        message: envelope.message.unwrap_or_default(),
        image_updated: envelope.image_updated,
        was_running: envelope.was_running,
    })
}

pub fn normalize(rows: Vec<WireContainer>, query: StatusQuery<'_>) -> StatusReport {
    let statuses: Vec<ContainerStatus> = rows.into_iter().map(to_status).collect();
    let mut containers = BTreeMap::new();

    match query {
        StatusQuery::Fleet => {
            for status in statuses {
                if status.service.is_empty() {
                    continue;
                }
                // first row wins when a service is scaled
                containers.entry(status.service.clone()).or_insert(status);
            }
        }
        StatusQuery::Filtered(name) => {
            if let Some(status) = statuses.into_iter().find(|s| s.service == name) {
                containers.insert(name.to_string(), status);
            }
        }
        StatusQuery::Grouped(name) => {
            let idx = statuses.iter().position(|s| s.service == name).unwrap_or(0);
            if let Some(status) = statuses.into_iter().nth(idx) {
                containers.insert(name.to_string(), status);
            }
        }
    }

    StatusReport { containers, failures: BTreeMap::new() }
}

fn to_status(row: WireContainer) -> ContainerStatus {
    let name = row.name.unwrap_or_default();
    let service = match row.service.filter(|s| !s.is_empty()) {
        Some(s) => s,
        None => name.clone(),
    };
    let state_label = row.state.unwrap_or_default();

    ContainerStatus {
        service,
        name,
        state: ContainerState::parse(&state_label),
        state_label,
        status: row.status.unwrap_or_default(),
        size: row.size.filter(|s| !s.is_empty()),
        ports: row
            .ports
            .unwrap_or_default()
            .into_iter()
            .map(|p| PortMapping {
                url: p.url.unwrap_or_default(),
                target_port: p.target_port,
                published_port: p.published_port,
                protocol: p.protocol.unwrap_or_else(|| "tcp".to_string()),
            })
            .collect(),
    }
}
