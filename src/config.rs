//! Device configuration.

use crate::link::LinkConfig;
use crate::session::SessionConfig;
use std::time::Duration;

/// Default port for the firmware-update service.
pub const UPDATE_PORT: u16 = 8266;

/// Top-level configuration for the gate controller.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Device identity. The same literal serves as advertised hostname,
    /// broker client id, and update-service name.
    pub identity: String,
    /// Link supervision settings.
    pub link: LinkConfig,
    /// Broker session settings.
    pub session: SessionConfig,
    /// GPIO line driving the gate relay.
    pub gate_line: u32,
    /// Duration of the actuation pulse.
    pub pulse: Duration,
    /// Settle delay after setup before entering the control loop.
    pub ready_delay: Duration,
    /// Port the firmware-update service is reachable on.
    pub update_port: u16,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            identity: "gatekeeper".into(),
            link: LinkConfig::default(),
            session: SessionConfig::default(),
            gate_line: 15,
            pulse: Duration::from_millis(750),
            ready_delay: Duration::from_millis(1500),
            update_port: UPDATE_PORT,
        }
    }
}
