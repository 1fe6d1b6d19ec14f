// Re-export all model types from submodules.

pub use action::{Action, Expectation};
pub use service::{
    ActionReply, ContainerState, ContainerStatus, Observation, Phase, PortMapping,
    ServiceRecord, StatusReport,
};
pub use ui::CardUIState;

mod action;
mod service;
mod ui;
