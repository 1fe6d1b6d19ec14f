//! Dashboard state as immutable snapshots.
//!
//! Every change goes through [`reduce`], which builds a new [`DashboardState`]
//! from the previous one. [`Store`] hands out `Arc` snapshots so a render pass
//! never observes a half-applied update.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;

use crate::model::{Observation, ServiceRecord, StatusReport};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// The single user-facing message line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, text: text.into() }
    }
}

/// Result of a status sync, stamped with the sequence number of the request
/// that produced it.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncOutcome {
    Report { seq: u64, report: StatusReport },
    Failed { seq: u64, message: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Add services not yet known, preserving order.
    ServicesListed(Vec<String>),
    /// An operation touching `services` began.
    Started { services: Vec<String> },
    /// The operation announced by a matching `Started` finished.
    Settled { services: Vec<String>, outcome: SyncOutcome },
    Notice(Notice),
    ClearNotice,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DashboardState {
    pub records: Vec<ServiceRecord>,
    pub notice: Option<Notice>,
}

impl DashboardState {
    pub fn record(&self, service: &str) -> Option<&ServiceRecord> {
        self.records.iter().find(|r| r.service == service)
    }

    pub fn service_names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.service.clone()).collect()
    }

    pub fn running_count(&self) -> usize {
        self.records.iter().filter(|r| r.observation.is_running()).count()
    }

    pub fn any_loading(&self) -> bool {
        self.records.iter().any(ServiceRecord::loading)
    }

    fn record_mut(&mut self, service: &str) -> Option<&mut ServiceRecord> {
        self.records.iter_mut().find(|r| r.service == service)
    }

    fn ensure(&mut self, service: &str) {
        if self.record(service).is_none() {
            self.records.push(ServiceRecord::new(service));
        }
    }
}

/// Pure transition function.
pub fn reduce(state: &DashboardState, event: &Event) -> DashboardState {
    let mut next = state.clone();
    match event {
        Event::ServicesListed(names) => {
            for name in names {
                if !name.is_empty() {
                    next.ensure(name);
                }
            }
        }
        Event::Started { services } => {
            for name in services {
                next.ensure(name);
                if let Some(record) = next.record_mut(name) {
                    record.in_flight += 1;
                }
            }
        }
        Event::Settled { services, outcome } => {
            if let SyncOutcome::Report { report, .. } = outcome {
                // discovery: a fleet report may name services we have not seen
                for name in report.service_names() {
                    next.ensure(name);
                }
            }
            let now = Local::now();
            for name in services {
                let Some(record) = next.record_mut(name) else { continue };
                record.in_flight = record.in_flight.saturating_sub(1);
                apply_outcome(record, outcome, now);
            }
            if let SyncOutcome::Report { report, .. } = outcome {
                // discovered services are only observed, never loading
                for name in report.service_names() {
                    if services.iter().any(|s| s == name) {
                        continue;
                    }
                    if let Some(record) = next.record_mut(name) {
                        apply_outcome(record, outcome, now);
                    }
                }
            }
        }
        Event::Notice(notice) => next.notice = Some(notice.clone()),
        Event::ClearNotice => next.notice = None,
    }
    next
}

fn apply_outcome(record: &mut ServiceRecord, outcome: &SyncOutcome, now: chrono::DateTime<Local>) {
    let (seq, observation) = match outcome {
        SyncOutcome::Report { seq, report } => (*seq, report.observation_for(&record.service)),
        SyncOutcome::Failed { seq, message } => (*seq, Observation::Failed(message.clone())),
    };
    // issued before what we already show: stale
    if seq < record.observed_seq {
        tracing::debug!(service = %record.service, seq, applied = record.observed_seq, "dropping stale status");
        return;
    }
    record.observed_seq = seq;
    record.observation = observation;
    record.updated_at = Some(now);
}

/// Owner of the current snapshot.
#[derive(Default)]
pub struct Store {
    state: Arc<DashboardState>,
}

impl Store {
    pub fn new(seed: &[String]) -> Self {
        let mut store = Self::default();
        store.dispatch(Event::ServicesListed(seed.to_vec()));
        store
    }

    pub fn dispatch(&mut self, event: Event) {
        self.state = Arc::new(reduce(&self.state, &event));
    }

    pub fn snapshot(&self) -> Arc<DashboardState> {
        Arc::clone(&self.state)
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }
}

/// Monotonic ticket source. A ticket is drawn right before a status request
/// is sent, so observations order by issue time, not arrival time.
#[derive(Debug)]
pub struct Sequencer {
    next: AtomicU64,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self { next: AtomicU64::new(1) }
    }
}

impl Sequencer {
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
