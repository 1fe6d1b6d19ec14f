use std::time::{Duration, Instant};

use crate::model::Action;

/// How long a confirmation prompt waits for `y`.
pub const CONFIRM_TIMEOUT: Duration = Duration::from_secs(5);

/// Pending destructive action awaiting confirmation.
#[derive(Debug)]
pub struct PendingAction {
    pub description: String,
    pub kind: PendingActionKind,
    pub expires: Instant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingActionKind {
    Service(String, Action),
    Fleet(Action),
}

impl PendingAction {
    pub fn new(kind: PendingActionKind) -> Self {
        let description = match &kind {
            PendingActionKind::Service(service, action) => format!("{} {}?", action.label(), service),
            PendingActionKind::Fleet(action) => format!("{} services?", action.label()),
        };
        Self {
            description,
            kind,
            expires: Instant::now() + CONFIRM_TIMEOUT,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.expires
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptions_name_the_target() {
        let pa = PendingAction::new(PendingActionKind::Service("immich".into(), Action::Down));
        assert_eq!(pa.description, "Down immich?");
        let pa = PendingAction::new(PendingActionKind::Fleet(Action::RestartAll));
        assert_eq!(pa.description, "Restart all services?");
    }

    #[test]
    fn expires_after_timeout() {
        let pa = PendingAction::new(PendingActionKind::Fleet(Action::DownAll));
        assert!(!pa.is_expired(Instant::now()));
        assert!(pa.is_expired(Instant::now() + CONFIRM_TIMEOUT + Duration::from_millis(1)));
    }
}
