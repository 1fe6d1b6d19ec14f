use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::model::Action;
use crate::store::Notice;
use crate::view::{CardAction, CardModel};

use super::state::{PendingAction, PendingActionKind};
use super::App;

/// Result of handling a key: Quit the app, or key was consumed (needs render).
/// None means the key was not handled.
#[derive(Debug, PartialEq, Eq)]
pub enum InputResult {
    Quit,
    Consumed,
}

/// Handle a key event. Returns Some(Quit) to exit, Some(Consumed) if key was handled and
/// a render is needed, None if the key was not handled.
pub fn handle_key(app: &mut App, key_event: KeyEvent) -> Option<InputResult> {
    let KeyEvent { code, modifiers, .. } = key_event;

    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Some(InputResult::Quit);
    }

    if let Some(pa) = app.pending_action.take() {
        if matches!(code, KeyCode::Char('y') | KeyCode::Char('Y')) {
            tracing::info!(action = %pa.description, "confirmed");
            execute(app, pa.kind);
        }
        return Some(InputResult::Consumed);
    }

    match code {
        KeyCode::Char('q') => Some(InputResult::Quit),
        KeyCode::Esc => {
            app.monitor.clear_notice();
            Some(InputResult::Consumed)
        }
        KeyCode::Up | KeyCode::Char('k') => {
            let ui = &mut app.monitor.ui_state;
            if ui.selected_index > 0 {
                ui.selected_index -= 1;
                return Some(InputResult::Consumed);
            }
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            let ui = &mut app.monitor.ui_state;
            if ui.selected_index + 1 < ui.total_rows {
                ui.selected_index += 1;
                return Some(InputResult::Consumed);
            }
            None
        }
        KeyCode::Right => {
            let service = app.monitor.selected_service()?;
            app.monitor.ui_state.expanded.insert(service).then_some(InputResult::Consumed)
        }
        KeyCode::Enter => {
            let service = app.monitor.selected_service()?;
            app.monitor.ui_state.toggle_expanded(&service);
            Some(InputResult::Consumed)
        }
        KeyCode::Left => {
            let service = app.monitor.selected_service()?;
            app.monitor.ui_state.expanded.remove(&service).then_some(InputResult::Consumed)
        }
        KeyCode::Char('F') => {
            app.monitor.refresh_all();
            Some(InputResult::Consumed)
        }
        KeyCode::Char('R') => {
            request(app, PendingActionKind::Fleet(Action::RestartAll));
            Some(InputResult::Consumed)
        }
        KeyCode::Char('D') => {
            request(app, PendingActionKind::Fleet(Action::DownAll));
            Some(InputResult::Consumed)
        }
        KeyCode::Char(c) => {
            let pressed = card_action_for_key(c)?;
            press(app, pressed);
            Some(InputResult::Consumed)
        }
        _ => None,
    }
}

fn card_action_for_key(c: char) -> Option<CardAction> {
    if c == CardAction::Refresh.key() {
        return Some(CardAction::Refresh);
    }
    Action::SERVICE_ACTIONS
        .iter()
        .find(|a| a.key() == c)
        .map(|&a| CardAction::Run(a))
}

/// Press a button on the selected card, honoring its enablement.
fn press(app: &mut App, pressed: CardAction) {
    let ui = &app.monitor.ui_state;
    let Some(record) = app.monitor.state().records.get(ui.selected_index) else {
        return;
    };
    let card = CardModel::from_record(record, ui.expanded.contains(&record.service));
    let service = card.service.clone();

    if !card.allows(pressed) {
        let reason = if card.loading { "busy" } else { "not available" };
        app.monitor.notify(Notice::info(format!(
            "{} is {} for {}",
            pressed.label(),
            reason,
            service
        )));
        return;
    }

    match pressed {
        CardAction::Refresh => app.monitor.refresh(&service),
        CardAction::Run(action) => request(app, PendingActionKind::Service(service, action)),
    }
}

/// Run now, or ask first when the action is destructive.
fn request(app: &mut App, kind: PendingActionKind) {
    let action = match &kind {
        PendingActionKind::Service(_, action) | PendingActionKind::Fleet(action) => *action,
    };
    if app.options.confirm_destructive && action.is_destructive() {
        app.pending_action = Some(PendingAction::new(kind));
    } else {
        execute(app, kind);
    }
}

fn execute(app: &mut App, kind: PendingActionKind) {
    match kind {
        PendingActionKind::Service(service, action) => app.monitor.dispatch(&service, action),
        PendingActionKind::Fleet(action) => app.monitor.dispatch_fleet(action),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::api::ActionRequest;
    use crate::app::AppOptions;
    use crate::model::ContainerState;
    use crate::monitor::ServiceMonitor;
    use crate::reconcile::SyncSettings;
    use crate::test_support::{MockApi, report};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap()
    }

    /// App over a loaded dashboard: immich running, jellyfin exited.
    fn loaded_app(api: Arc<MockApi>, rt: &tokio::runtime::Runtime, confirm: bool) -> App {
        let monitor = ServiceMonitor::new(
            api,
            rt.handle().clone(),
            SyncSettings::immediate(),
            &["immich".to_string(), "jellyfin".to_string()],
            None,
        );
        let mut app = App::new(
            monitor,
            AppOptions {
                api_url: "http://localhost:5000".into(),
                confirm_destructive: confirm,
                refresh_interval: None,
            },
        );
        app.monitor.refresh_all();
        settle(&mut app);
        app
    }

    fn api() -> Arc<MockApi> {
        Arc::new(MockApi::new().with_status(Ok(report(&[
            ("immich", ContainerState::Running),
            ("jellyfin", ContainerState::Exited),
        ]))))
    }

    fn settle(app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            app.poll_events();
            if !app.monitor.state().any_loading() || Instant::now() > deadline {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn q_and_ctrl_c_quit() {
        let rt = runtime();
        let mut app = loaded_app(api(), &rt, true);
        assert_eq!(handle_key(&mut app, key(KeyCode::Char('q'))), Some(InputResult::Quit));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(&mut app, ctrl_c), Some(InputResult::Quit));
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let rt = runtime();
        let mut app = loaded_app(api(), &rt, true);
        assert_eq!(handle_key(&mut app, key(KeyCode::Up)), None);
        assert_eq!(handle_key(&mut app, key(KeyCode::Down)), Some(InputResult::Consumed));
        assert_eq!(handle_key(&mut app, key(KeyCode::Down)), None);
        assert_eq!(app.monitor.selected_service().as_deref(), Some("jellyfin"));
    }

    #[test]
    fn expand_and_collapse_selected_card() {
        let rt = runtime();
        let mut app = loaded_app(api(), &rt, true);
        handle_key(&mut app, key(KeyCode::Right));
        assert!(app.monitor.ui_state.expanded.contains("immich"));
        assert_eq!(handle_key(&mut app, key(KeyCode::Left)), Some(InputResult::Consumed));
        assert!(app.monitor.ui_state.expanded.is_empty());
        assert_eq!(handle_key(&mut app, key(KeyCode::Left)), None);

        handle_key(&mut app, key(KeyCode::Enter));
        assert!(app.monitor.ui_state.expanded.contains("immich"));
        handle_key(&mut app, key(KeyCode::Enter));
        assert!(app.monitor.ui_state.expanded.is_empty());
    }

    #[test]
    fn stop_dispatches_without_confirmation() {
        let rt = runtime();
        let api = api();
        let mut app = loaded_app(api.clone(), &rt, true);

        handle_key(&mut app, key(KeyCode::Char('t')));
        assert!(app.pending_action.is_none());
        assert!(app.monitor.state().record("immich").unwrap().loading());
        settle(&mut app);
        assert_eq!(api.dispatch_calls(), vec![ActionRequest::service("immich", Action::Stop)]);
    }

    #[test]
    fn down_waits_for_confirmation() {
        let rt = runtime();
        let api = api();
        let mut app = loaded_app(api.clone(), &rt, true);

        handle_key(&mut app, key(KeyCode::Char('d')));
        let pending = app.pending_action.as_ref().unwrap();
        assert_eq!(pending.kind, PendingActionKind::Service("immich".into(), Action::Down));

        // any other key cancels
        handle_key(&mut app, key(KeyCode::Char('n')));
        assert!(app.pending_action.is_none());
        assert!(api.dispatch_calls().is_empty());

        handle_key(&mut app, key(KeyCode::Char('d')));
        handle_key(&mut app, key(KeyCode::Char('y')));
        settle(&mut app);
        assert_eq!(api.dispatch_calls(), vec![ActionRequest::service("immich", Action::Down)]);
    }

    #[test]
    fn confirmation_can_be_disabled() {
        let rt = runtime();
        let api = api();
        let mut app = loaded_app(api.clone(), &rt, false);

        handle_key(&mut app, key(KeyCode::Char('R')));
        assert!(app.pending_action.is_none());
        settle(&mut app);
        assert_eq!(api.dispatch_calls(), vec![ActionRequest::fleet(Action::RestartAll)]);
    }

    #[test]
    fn disabled_button_explains_instead_of_dispatching() {
        let rt = runtime();
        let api = api();
        let mut app = loaded_app(api.clone(), &rt, true);

        // immich is already running
        handle_key(&mut app, key(KeyCode::Char('s')));
        assert!(api.dispatch_calls().is_empty());
        let notice = app.monitor.state().notice.clone().unwrap();
        assert_eq!(notice.text, "Start is not available for immich");

        // jellyfin is exited, so start works there
        handle_key(&mut app, key(KeyCode::Down));
        handle_key(&mut app, key(KeyCode::Char('s')));
        settle(&mut app);
        assert_eq!(api.dispatch_calls(), vec![ActionRequest::service("jellyfin", Action::Start)]);
    }

    #[test]
    fn escape_clears_notice() {
        let rt = runtime();
        let mut app = loaded_app(api(), &rt, true);
        app.monitor.notify(Notice::info("hello"));
        handle_key(&mut app, key(KeyCode::Esc));
        assert!(app.monitor.state().notice.is_none());
    }

    #[test]
    fn refresh_keys_fetch_status() {
        let rt = runtime();
        let api = api();
        let mut app = loaded_app(api.clone(), &rt, true);
        let before = api.status_calls();

        handle_key(&mut app, key(KeyCode::Char('f')));
        settle(&mut app);
        handle_key(&mut app, key(KeyCode::Char('F')));
        settle(&mut app);
        assert_eq!(api.status_calls(), before + 2);
    }
}
