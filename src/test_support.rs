//! Test support utilities.
//!
//! Provides `MockApi`, a scripted in-process stand-in for the backend, and
//! helpers for building status reports without a running server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::api::{ActionRequest, ComposeApi, RouteScheme};
use crate::error::ApiError;
use crate::model::{ActionReply, ContainerState, ContainerStatus, StatusReport};

/// Records which methods were called on the mock
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    ListServices,
    FetchStatus(Option<String>),
    Dispatch(ActionRequest),
}

/// Configurable mock backend. Errors are scripted as plain messages and
/// surface as `ApiError::Backend`.
pub struct MockApi {
    pub scheme: RouteScheme,
    pub calls: Arc<Mutex<Vec<MockCall>>>,
    pub services_result: Mutex<Result<Vec<String>, String>>,
    /// Answers consumed one per status call before falling back to `status_result`
    pub status_script: Mutex<VecDeque<Result<StatusReport, String>>>,
    pub status_result: Mutex<Result<StatusReport, String>>,
    pub dispatch_result: Mutex<Result<ActionReply, String>>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self {
            scheme: RouteScheme::Containers,
            calls: Arc::new(Mutex::new(Vec::new())),
            services_result: Mutex::new(Ok(Vec::new())),
            status_script: Mutex::new(VecDeque::new()),
            status_result: Mutex::new(Ok(StatusReport::default())),
            dispatch_result: Mutex::new(Ok(ActionReply {
                message: "ok".to_string(),
                ..Default::default()
            })),
        }
    }
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scheme(mut self, scheme: RouteScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_services(self, services: &[&str]) -> Self {
        *self.services_result.lock().unwrap() = Ok(services.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_status(self, result: Result<StatusReport, String>) -> Self {
        *self.status_result.lock().unwrap() = result;
        self
    }

    pub fn with_dispatch(self, result: Result<ActionReply, String>) -> Self {
        *self.dispatch_result.lock().unwrap() = result;
        self
    }

    /// Queue a one-shot status answer.
    pub fn push_status(&self, result: Result<StatusReport, String>) {
        self.status_script.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::FetchStatus(_)))
            .count()
    }

    pub fn dispatch_calls(&self) -> Vec<ActionRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Dispatch(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn backend_error(message: String) -> ApiError {
    ApiError::Backend { message, detail: None }
}

#[async_trait]
impl ComposeApi for MockApi {
    fn scheme(&self) -> RouteScheme {
        self.scheme
    }

    async fn list_services(&self) -> Result<Vec<String>, ApiError> {
        self.record(MockCall::ListServices);
        self.services_result.lock().unwrap().clone().map_err(backend_error)
    }

    async fn fetch_status(&self, service: Option<&str>) -> Result<StatusReport, ApiError> {
        self.record(MockCall::FetchStatus(service.map(str::to_string)));
        let scripted = self.status_script.lock().unwrap().pop_front();
        let result = match scripted {
            Some(r) => r,
            None => self.status_result.lock().unwrap().clone(),
        };
        let mut report = result.map_err(backend_error)?;
        if let Some(name) = service {
            report.containers.retain(|k, _| k == name);
            report.failures.retain(|k, _| k == name);
        }
        Ok(report)
    }

    async fn dispatch(&self, request: &ActionRequest) -> Result<ActionReply, ApiError> {
        self.record(MockCall::Dispatch(request.clone()));
        self.dispatch_result.lock().unwrap().clone().map_err(backend_error)
    }
}

/// A container snapshot for `service` in `state`.
pub fn container(service: &str, state: ContainerState) -> ContainerStatus {
    ContainerStatus {
        service: service.to_string(),
        name: format!("home-server-{}-1", service),
        state,
        state_label: state.as_str().to_string(),
        status: match state {
            ContainerState::Running => "Up 2 hours".to_string(),
            ContainerState::Exited => "Exited (0) 5 minutes ago".to_string(),
            _ => String::new(),
        },
        size: None,
        ports: Vec::new(),
    }
}

/// A report holding one container per `(service, state)` pair.
pub fn report(entries: &[(&str, ContainerState)]) -> StatusReport {
    let mut report = StatusReport::default();
    for (service, state) in entries {
        report.containers.insert(service.to_string(), container(service, *state));
    }
    report
}
