//! Link state transitions.
//!
//! The transition table is decoupled from the transport: any event source
//! can push [`LinkEvent`]s and the state advances the same way.

/// Physical link state. Single instance, owned by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// No usable link
    #[default]
    Down,
    /// Interface up, no address yet
    Starting,
    /// Address acquired, link usable
    Up,
}

/// Details reported once an address is acquired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReport {
    /// Acquired local address
    pub address: String,
    /// Hardware address of the interface
    pub mac: String,
    /// Full duplex negotiated
    pub full_duplex: bool,
    /// Negotiated link speed in Mbps
    pub speed_mbps: u32,
}

/// Events pushed by the link monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Interface brought up, no carrier yet
    Started,
    /// Carrier detected
    Connected,
    /// Address acquired, link usable from here on
    AddressAcquired(LinkReport),
    /// Carrier lost
    Disconnected,
    /// Interface stopped
    Stopped,
    /// Unrecognized event code from the transport
    Unknown(u32),
}

impl LinkState {
    /// Apply one event and return the next state.
    pub fn apply(self, event: &LinkEvent) -> LinkState {
        match (self, event) {
            (_, LinkEvent::Started) => LinkState::Starting,
            (_, LinkEvent::AddressAcquired(_)) => LinkState::Up,
            (_, LinkEvent::Disconnected | LinkEvent::Stopped) => LinkState::Down,
            (state, _) => state,
        }
    }

    pub fn is_up(self) -> bool {
        matches!(self, LinkState::Up)
    }
}
