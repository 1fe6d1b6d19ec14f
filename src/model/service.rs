use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local};

/// Runtime state of a compose container, as reported by `docker compose ps`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerState {
    Running,
    Exited,
    Paused,
    Restarting,
    Created,
    Removing,
    Dead,
    Unknown,
}

impl ContainerState {
    /// Case-insensitive parse; anything unrecognised is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "running" => ContainerState::Running,
            "exited" => ContainerState::Exited,
            "paused" => ContainerState::Paused,
            "restarting" => ContainerState::Restarting,
            "created" => ContainerState::Created,
            "removing" => ContainerState::Removing,
            "dead" => ContainerState::Dead,
            _ => ContainerState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerState::Running => "running",
            ContainerState::Exited => "exited",
            ContainerState::Paused => "paused",
            ContainerState::Restarting => "restarting",
            ContainerState::Created => "created",
            ContainerState::Removing => "removing",
            ContainerState::Dead => "dead",
            ContainerState::Unknown => "unknown",
        }
    }

    /// States docker moves through on its own; polling should continue.
    pub fn is_transitional(&self) -> bool {
        matches!(self, ContainerState::Restarting | ContainerState::Removing)
    }

    /// Stopped states, where the service counts as down.
    pub fn is_stopped(&self) -> bool {
        matches!(self, ContainerState::Exited | ContainerState::Dead | ContainerState::Created)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One published port of a container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortMapping {
    pub url: String,
    pub target_port: u16,
    pub published_port: u16,
    pub protocol: String,
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.published_port == 0 {
            write!(f, "{}/{}", self.target_port, self.protocol)
        } else {
            let host = if self.url.is_empty() { "0.0.0.0" } else { &self.url };
            write!(f, "{}:{}->{}/{}", host, self.published_port, self.target_port, self.protocol)
        }
    }
}

/// Latest snapshot of a service's container. Replaced wholesale on every poll.
#[derive(Clone, Debug, PartialEq)]
pub struct ContainerStatus {
    pub service: String,
    pub name: String,
    pub state: ContainerState,
    pub state_label: String, // raw label, shown on the badge
    pub status: String,      // e.g. "Up 2 hours"
    pub size: Option<String>,
    pub ports: Vec<PortMapping>,
}

impl ContainerStatus {
    pub fn is_running(&self) -> bool {
        self.state == ContainerState::Running
    }
}

/// What the dashboard last learned about a service.
#[derive(Clone, Debug, PartialEq)]
pub enum Observation {
    /// No status request has completed yet.
    NotFetched,
    /// The backend answered and reported no container: the service is down.
    Absent,
    Present(ContainerStatus),
    /// The last status request failed; the previous snapshot is discarded.
    Failed(String),
}

impl Observation {
    pub fn container(&self) -> Option<&ContainerStatus> {
        match self {
            Observation::Present(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.container().is_some_and(ContainerStatus::is_running)
    }

    pub fn is_down(&self) -> bool {
        match self {
            Observation::Absent => true,
            Observation::Present(c) => c.state.is_stopped(),
            _ => false,
        }
    }
}

/// Derived lifecycle of a record: `unknown -> loading -> {success, error}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Unknown,
    Loading,
    Success,
    Error,
}

/// Dashboard record for one compose service.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceRecord {
    pub service: String,
    pub observation: Observation,
    /// Outstanding operations touching this service. Loading while non-zero.
    pub in_flight: u32,
    /// Sequence number of the request behind `observation`.
    pub observed_seq: u64,
    pub updated_at: Option<DateTime<Local>>,
}

impl ServiceRecord {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            observation: Observation::NotFetched,
            in_flight: 0,
            observed_seq: 0,
            updated_at: None,
        }
    }

    pub fn loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn phase(&self) -> Phase {
        if self.loading() {
            return Phase::Loading;
        }
        match self.observation {
            Observation::NotFetched => Phase::Unknown,
            Observation::Failed(_) => Phase::Error,
            Observation::Absent | Observation::Present(_) => Phase::Success,
        }
    }
}

/// Normalized answer of a status request: service name -> container snapshot,
/// or an error message for services whose own request failed. Services in
/// neither map have no container.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatusReport {
    pub containers: BTreeMap<String, ContainerStatus>,
    pub failures: BTreeMap<String, String>,
}

impl StatusReport {
    pub fn get(&self, service: &str) -> Option<&ContainerStatus> {
        self.containers.get(service)
    }

    pub fn observation_for(&self, service: &str) -> Observation {
        if let Some(message) = self.failures.get(service) {
            return Observation::Failed(message.clone());
        }
        match self.containers.get(service) {
            Some(c) => Observation::Present(c.clone()),
            None => Observation::Absent,
        }
    }

    /// Services with a container in this report.
    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.containers.keys().map(String::as_str)
    }

    pub fn merge(&mut self, other: StatusReport) {
        self.containers.extend(other.containers);
        self.failures.extend(other.failures);
    }

    pub fn record_failure(&mut self, service: &str, message: String) {
        self.containers.remove(service);
        self.failures.insert(service.to_string(), message);
    }
}

/// Backend's answer to a lifecycle action.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionReply {
    pub message: String,
    pub image_updated: Option<bool>,
    pub was_running: Option<bool>,
}
