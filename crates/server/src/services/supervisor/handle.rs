use tokio::sync::watch;

use super::state::SupervisorState;

/// Read-only view of the supervisor's connection state
#[derive(Clone)]
pub struct SupervisorHandle {
    state: watch::Receiver<SupervisorState>,
}

impl SupervisorHandle {
    pub(super) fn new(state: watch::Receiver<SupervisorState>) -> Self {
        Self { state }
    }

    /// Current state
    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }
}
