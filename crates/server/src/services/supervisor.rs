mod handle;
mod runner;
mod state;

pub use handle::SupervisorHandle;
pub use runner::ConnectionSupervisor;
pub use state::{SupervisorEvent, SupervisorState};
