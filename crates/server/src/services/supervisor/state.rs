/// Broker connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// Start dialing the broker
    Dial,
    /// Channel open, queues declared, consumer registered
    Established,
    /// Any step of the setup sequence failed
    SetupFailed,
    /// Broker reported the connection as lost
    ConnectionLost,
}

impl SupervisorState {
    /// 状态转移；不适用的事件保持当前状态
    pub fn next(self, event: SupervisorEvent) -> Self {
        match (self, event) {
            (Self::Disconnected, SupervisorEvent::Dial) => Self::Connecting,
            (Self::Connecting, SupervisorEvent::Established) => Self::Connected,
            (Self::Connecting, SupervisorEvent::SetupFailed) => Self::Disconnected,
            (Self::Connected, SupervisorEvent::ConnectionLost) => Self::Disconnected,
            (state, _) => state,
        }
    }
}
