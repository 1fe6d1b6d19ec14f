use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::api::{ActionRequest, ComposeApi};
use crate::model::{Action, CardUIState};
use crate::reconcile::{self, ActionResult, SyncSettings};
use crate::store::{DashboardState, Event, Notice, Sequencer, Store};

/// Owns the dashboard state and runs backend work on a tokio runtime.
///
/// Every operation marks its services loading synchronously, then spawns a
/// task whose results come back as [`Event`]s. The UI loop drains them with
/// [`ServiceMonitor::poll_events`].
pub struct ServiceMonitor {
    api: Arc<dyn ComposeApi>,
    store: Store,
    seq: Arc<Sequencer>,
    settings: SyncSettings,
    compose_key: Option<String>,
    rt: tokio::runtime::Handle,
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    pub ui_state: CardUIState,
    pub last_refresh: Option<Instant>,
}

impl ServiceMonitor {
    pub fn new(
        api: Arc<dyn ComposeApi>,
        rt: tokio::runtime::Handle,
        settings: SyncSettings,
        seed: &[String],
        compose_key: Option<String>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut ui_state = CardUIState::default();
        ui_state.clamp(seed.len());

        Self {
            api,
            store: Store::new(seed),
            seq: Arc::new(Sequencer::default()),
            settings,
            compose_key,
            rt,
            tx,
            rx,
            ui_state,
            last_refresh: None,
        }
    }

    pub fn state(&self) -> &DashboardState {
        self.store.state()
    }

    pub fn snapshot(&self) -> Arc<DashboardState> {
        self.store.snapshot()
    }

    /// Service under the cursor, if any.
    pub fn selected_service(&self) -> Option<String> {
        self.state()
            .records
            .get(self.ui_state.selected_index)
            .map(|r| r.service.clone())
    }

    pub fn notify(&mut self, notice: Notice) {
        self.store.dispatch(Event::Notice(notice));
    }

    pub fn clear_notice(&mut self) {
        if self.state().notice.is_some() {
            self.store.dispatch(Event::ClearNotice);
        }
    }

    /// Startup: list services, then fetch status for all of them.
    pub fn load(&mut self) {
        let known = self.state().service_names();
        self.store.dispatch(Event::Started { services: known.clone() });
        self.last_refresh = Some(Instant::now());

        let api = Arc::clone(&self.api);
        let seq = Arc::clone(&self.seq);
        let tx = self.tx.clone();
        self.rt.spawn(async move {
            let listed = reconcile::list_new_services(api.as_ref(), &known).await;
            if let Some(e) = listed.list_error {
                let _ = tx.send(Event::Notice(Notice::error(format!(
                    "Could not list services: {}",
                    e.user_message()
                ))));
            }

            let mut services = known;
            if !listed.discovered.is_empty() {
                let _ = tx.send(Event::ServicesListed(listed.discovered.clone()));
                let _ = tx.send(Event::Started { services: listed.discovered.clone() });
                services.extend(listed.discovered);
            }

            let outcome = reconcile::fetch_snapshot(api.as_ref(), &seq, &services).await;
            let _ = tx.send(Event::Settled { services, outcome });
        });
    }

    /// Re-fetch status for every known service.
    pub fn refresh_all(&mut self) {
        let services = self.state().service_names();
        self.spawn_refresh(services);
    }

    /// Re-fetch status for one service.
    pub fn refresh(&mut self, service: &str) {
        self.spawn_refresh(vec![service.to_string()]);
    }

    fn spawn_refresh(&mut self, services: Vec<String>) {
        tracing::debug!(?services, "refreshing status");
        self.store.dispatch(Event::Started { services: services.clone() });
        self.last_refresh = Some(Instant::now());

        let api = Arc::clone(&self.api);
        let seq = Arc::clone(&self.seq);
        let tx = self.tx.clone();
        self.rt.spawn(async move {
            let outcome = reconcile::fetch_snapshot(api.as_ref(), &seq, &services).await;
            let _ = tx.send(Event::Settled { services, outcome });
        });
    }

    /// Run `action` against one service (non-blocking).
    pub fn dispatch(&mut self, service: &str, action: Action) {
        if action.is_fleet() {
            self.dispatch_fleet(action);
            return;
        }
        if self.state().record(service).is_some_and(|r| r.loading()) {
            self.store.dispatch(Event::Notice(Notice::info(format!(
                "{} is busy, try again in a moment",
                service
            ))));
            return;
        }

        let request = ActionRequest::service(service, action).with_compose_key(self.compose_key.clone());
        self.spawn_action(request, vec![service.to_string()], service.to_string());
    }

    /// Run a fleet-wide action: one request, then one batch re-sync of every service.
    pub fn dispatch_fleet(&mut self, action: Action) {
        if !action.is_fleet() {
            tracing::warn!(%action, "not a fleet action");
            return;
        }
        let services = self.state().service_names();
        self.spawn_action(ActionRequest::fleet(action), services, "all services".to_string());
    }

    fn spawn_action(&mut self, request: ActionRequest, services: Vec<String>, target: String) {
        tracing::info!(action = %request.action, %target, "action requested");
        self.store.dispatch(Event::Started { services: services.clone() });
        self.store
            .dispatch(Event::Notice(Notice::info(request.action.progress(&target))));

        let api = Arc::clone(&self.api);
        let seq = Arc::clone(&self.seq);
        let settings = self.settings.clone();
        let tx = self.tx.clone();
        self.rt.spawn(async move {
            let result = reconcile::run_action(api.as_ref(), &seq, &settings, &request, &services).await;
            let _ = tx.send(Event::Notice(action_notice(&request, &target, &result)));
            let _ = tx.send(Event::Settled {
                services,
                outcome: result.outcome,
            });
        });
    }

    /// Drain finished background work into the store. Returns true if
    /// anything changed.
    pub fn poll_events(&mut self) -> bool {
        let mut changed = false;
        // bounded so a burst of events cannot stall the UI loop
        for _ in 0..100 {
            match self.rx.try_recv() {
                Ok(event) => {
                    self.store.dispatch(event);
                    changed = true;
                }
                Err(_) => break,
            }
        }
        if changed {
            let total = self.state().records.len();
            self.ui_state.clamp(total);
        }
        changed
    }
}

fn action_notice(request: &ActionRequest, target: &str, result: &ActionResult) -> Notice {
    match &result.reply {
        Err(e) => Notice::error(format!(
            "{} {} failed: {}",
            request.action.label(),
            target,
            e.user_message()
        )),
        Ok(reply) => {
            let mut text = if reply.message.is_empty() {
                format!("{} {}: done", request.action.label(), target)
            } else {
                reply.message.clone()
            };
            if !result.converged {
                text.push_str(&format!(
                    " (state not confirmed after {} checks)",
                    result.polls
                ));
            }
            Notice::info(text)
        }
    }
}
