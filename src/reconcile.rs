//! Status synchronization and action reconciliation.
//!
//! These are plain async functions over a [`ComposeApi`]; the monitor runs
//! them on its runtime and turns their results into store events.

use std::time::Duration;

use futures_util::future::join_all;

use crate::api::{ActionRequest, ComposeApi};
use crate::config::SyncConfig;
use crate::error::ApiError;
use crate::model::{ActionReply, Expectation, StatusReport};
use crate::store::{Sequencer, SyncOutcome};

/// How long to wait and how often to poll after an action.
#[derive(Clone, Debug)]
pub struct SyncSettings {
    pub settle_delay: Duration,
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl From<&SyncConfig> for SyncSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            settle_delay: config.settle_delay(),
            poll_interval: config.poll_interval(),
            max_polls: config.max_polls,
        }
    }
}

impl SyncSettings {
    /// No waiting at all; used by tests and `--no-wait`.
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            poll_interval: Duration::ZERO,
            max_polls: 1,
        }
    }
}

/// Outcome of loading the service list at startup.
pub struct LoadResult {
    /// Services the backend listed that were not already known.
    pub discovered: Vec<String>,
    /// Set when the listing failed; status is still fetched.
    pub list_error: Option<ApiError>,
}

/// Outcome of one dispatched action.
pub struct ActionResult {
    pub reply: Result<ActionReply, ApiError>,
    pub outcome: SyncOutcome,
    pub polls: u32,
    /// True when the final poll showed the expected state.
    pub converged: bool,
}

/// Ask the backend for its service list, returning the ones not in `known`.
pub async fn list_new_services(api: &dyn ComposeApi, known: &[String]) -> LoadResult {
    match api.list_services().await {
        Ok(listed) => LoadResult {
            discovered: listed.into_iter().filter(|s| !known.contains(s)).collect(),
            list_error: None,
        },
        Err(e) => {
            tracing::warn!("Failed to list services: {}", e);
            LoadResult {
                discovered: Vec::new(),
                list_error: Some(e),
            }
        }
    }
}

/// Fetch status for `services` as one batch.
///
/// With a fleet endpoint this is a single request. With per-project status
/// routes one request per service runs concurrently and the batch completes
/// when the slowest one does. An empty `services` always uses the fleet
/// endpoint, which is how unknown services are discovered.
pub async fn fetch_snapshot(api: &dyn ComposeApi, seq: &Sequencer, services: &[String]) -> SyncOutcome {
    let ticket = seq.next();

    if api.scheme().fans_out_status() && !services.is_empty() {
        let results = join_all(services.iter().map(|s| api.fetch_status(Some(s.as_str())))).await;
        let mut report = StatusReport::default();
        for (service, result) in services.iter().zip(results) {
            match result {
                Ok(r) => report.merge(r),
                Err(e) => {
                    tracing::warn!(service = %service, "status fetch failed: {}", e);
                    report.record_failure(service, e.user_message());
                }
            }
        }
        return SyncOutcome::Report { seq: ticket, report };
    }

    match api.fetch_status(None).await {
        Ok(report) => SyncOutcome::Report { seq: ticket, report },
        Err(e) => {
            tracing::warn!("status fetch failed: {}", e);
            SyncOutcome::Failed {
                seq: ticket,
                message: e.user_message(),
            }
        }
    }
}

/// True when every service in `services` meets `expectation` in `outcome`.
pub fn converged(outcome: &SyncOutcome, services: &[String], expectation: Expectation) -> bool {
    match outcome {
        SyncOutcome::Failed { .. } => false,
        SyncOutcome::Report { report, .. } => services
            .iter()
            .all(|s| expectation.is_met(&report.observation_for(s))),
    }
}

/// Fire `request`, then poll status for `services` until the action's
/// expected state is observed or `max_polls` runs out.
///
/// A failed request still gets one status fetch so the affected cards
/// reconcile with whatever the backend did.
pub async fn run_action(
    api: &dyn ComposeApi,
    seq: &Sequencer,
    settings: &SyncSettings,
    request: &ActionRequest,
    services: &[String],
) -> ActionResult {
    let reply = api.dispatch(request).await;

    if let Err(e) = &reply {
        tracing::warn!(action = %request.action, service = ?request.service, "action failed: {}", e);
        let outcome = fetch_snapshot(api, seq, services).await;
        return ActionResult {
            reply,
            outcome,
            polls: 1,
            converged: false,
        };
    }

    tokio::time::sleep(settings.settle_delay).await;

    let expectation = request.action.expectation();
    let max_polls = settings.max_polls.max(1);
    let mut polls = 0;
    loop {
        let outcome = fetch_snapshot(api, seq, services).await;
        polls += 1;
        let done = converged(&outcome, services, expectation);
        if done || polls >= max_polls {
            if !done {
                tracing::info!(action = %request.action, polls, "expected state not observed");
            }
            return ActionResult {
                reply,
                outcome,
                polls,
                converged: done,
            };
        }
        tokio::time::sleep(settings.poll_interval).await;
    }
}
