use std::fmt;

use super::service::Observation;

/// Lifecycle transition the backend can perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Up,
    Down,
    Start,
    Stop,
    Restart,
    Pull,
    RestartAll,
    DownAll,
}

/// Condition a status poll must observe before an action counts as finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expectation {
    Running,
    /// Running where a container exists; services without one stay down.
    Restarted,
    Stopped,
    Settled,
}

impl Action {
    pub const SERVICE_ACTIONS: [Action; 6] = [
        Action::Up,
        Action::Start,
        Action::Stop,
        Action::Restart,
        Action::Pull,
        Action::Down,
    ];

    /// Verb as it appears in the URL path.
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Up => "up",
            Action::Down => "down",
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Restart => "restart",
            Action::Pull => "pull",
            Action::RestartAll => "restart-all",
            Action::DownAll => "down-all",
        }
    }

    pub fn from_verb(verb: &str) -> Option<Self> {
        match verb {
            "up" => Some(Action::Up),
            "down" => Some(Action::Down),
            "start" => Some(Action::Start),
            "stop" => Some(Action::Stop),
            "restart" => Some(Action::Restart),
            "pull" => Some(Action::Pull),
            "restart-all" => Some(Action::RestartAll),
            "down-all" => Some(Action::DownAll),
            _ => None,
        }
    }

    /// Fleet actions target every service with a single request.
    pub fn is_fleet(&self) -> bool {
        matches!(self, Action::RestartAll | Action::DownAll)
    }

    /// Actions that remove containers or replace images ask for confirmation.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Action::Down | Action::Pull | Action::RestartAll | Action::DownAll)
    }

    pub fn expectation(&self) -> Expectation {
        match self {
            Action::Up | Action::Start | Action::Restart => Expectation::Running,
            Action::RestartAll => Expectation::Restarted,
            Action::Stop | Action::Down | Action::DownAll => Expectation::Stopped,
            Action::Pull => Expectation::Settled,
        }
    }

    /// Button caption on a card.
    pub fn label(&self) -> &'static str {
        match self {
            Action::Up => "Up",
            Action::Down => "Down",
            Action::Start => "Start",
            Action::Stop => "Stop",
            Action::Restart => "Restart",
            Action::Pull => "Pull",
            Action::RestartAll => "Restart all",
            Action::DownAll => "Down all",
        }
    }

    /// Dashboard key bound to the action.
    pub fn key(&self) -> char {
        match self {
            Action::Up => 'u',
            Action::Down => 'd',
            Action::Start => 's',
            Action::Stop => 't',
            Action::Restart => 'r',
            Action::Pull => 'p',
            Action::RestartAll => 'R',
            Action::DownAll => 'D',
        }
    }

    /// Progress text for the notice banner, e.g. "Stopping immich...".
    pub fn progress(&self, target: &str) -> String {
        let gerund = match self {
            Action::Up => "Bringing up",
            Action::Down => "Taking down",
            Action::Start => "Starting",
            Action::Stop => "Stopping",
            Action::Restart | Action::RestartAll => "Restarting",
            Action::Pull => "Pulling",
            Action::DownAll => "Taking down",
        };
        format!("{} {}...", gerund, target)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

impl Expectation {
    pub fn is_met(&self, observation: &Observation) -> bool {
        match observation {
            Observation::NotFetched | Observation::Failed(_) => false,
            Observation::Absent => !matches!(self, Expectation::Running),
            Observation::Present(c) => {
                if c.state.is_transitional() {
                    return false;
                }
                match self {
                    Expectation::Running | Expectation::Restarted => c.is_running(),
                    Expectation::Stopped => c.state.is_stopped(),
                    Expectation::Settled => true,
                }
            }
        }
    }
}
