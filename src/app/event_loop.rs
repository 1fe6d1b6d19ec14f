use std::time::{Duration, Instant};

use super::App;

impl App {
    /// Drain finished background work into the store.
    pub fn poll_events(&mut self) -> bool {
        self.monitor.poll_events()
    }

    /// Periodic full refresh. Skipped while any sync is still outstanding.
    pub fn auto_refresh(&mut self, now: Instant) -> bool {
        let Some(interval) = self.options.refresh_interval else {
            return false;
        };
        if self.monitor.state().any_loading() || self.monitor.state().records.is_empty() {
            return false;
        }
        let due = self
            .monitor
            .last_refresh
            .is_none_or(|last| now.duration_since(last) >= interval);
        if due {
            tracing::debug!("periodic refresh");
            self.monitor.refresh_all();
        }
        due
    }

    /// True once per second so the header clock keeps moving.
    pub fn tick_clock(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_clock) < Duration::from_secs(1) {
            return false;
        }
        self.last_clock = now;
        true
    }

    /// Expire pending confirmation if timed out.
    pub fn expire_pending_action(&mut self) -> bool {
        if self
            .pending_action
            .as_ref()
            .is_some_and(|pa| pa.is_expired(Instant::now()))
        {
            self.pending_action = None;
            return true;
        }
        false
    }
}
