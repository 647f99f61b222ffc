//! Inbound command decoding and dispatch.

use crate::actuator::{ActuatorDriver, OutputLine};
use crate::system::Restart;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A gate command, decoded from the first payload byte only. Remaining
/// bytes are logged but never parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `'0'`: hold the line low, gate contact open
    ReleaseLow,
    /// `'1'`: pulse the line high, simulating a button press
    PulseToggle,
    /// `'9'`: restart the whole process
    Restart,
    /// Anything else: logged and ignored
    Unknown(u8),
}

impl Command {
    /// Decode a raw payload. Empty payloads carry no command.
    pub fn decode(payload: &[u8]) -> Option<Command> {
        payload.first().map(|byte| match byte {
            b'0' => Command::ReleaseLow,
            b'1' => Command::PulseToggle,
            b'9' => Command::Restart,
            other => Command::Unknown(*other),
        })
    }
}

/// Turns subscribed-topic messages into actuator actions.
pub struct CommandInterpreter<L: OutputLine> {
    actuator: ActuatorDriver<L>,
    restart: Arc<dyn Restart>,
    pulse: Duration,
}

impl<L: OutputLine> CommandInterpreter<L> {
    pub fn new(actuator: ActuatorDriver<L>, restart: Arc<dyn Restart>, pulse: Duration) -> Self {
        Self {
            actuator,
            restart,
            pulse,
        }
    }

    /// Handle one inbound message on the command topic.
    ///
    /// The pulse path blocks the control task for the full pulse duration;
    /// nothing else is serviced meanwhile.
    pub async fn on_message(&mut self, topic: &str, payload: &[u8]) {
        info!("New message [{}] {}", topic, String::from_utf8_lossy(payload));

        let Some(command) = Command::decode(payload) else {
            warn!("Empty payload, ignoring");
            return;
        };

        match command {
            Command::ReleaseLow => {
                info!("Command 0 - line low");
                if let Err(e) = self.actuator.set_low() {
                    warn!("Actuator write failed: {:#}", e);
                }
            }
            Command::PulseToggle => {
                info!("Command 1 - pulse high/low");
                if let Err(e) = self.actuator.pulse_high(self.pulse).await {
                    warn!("Actuator pulse failed: {:#}", e);
                }
            }
            Command::Restart => {
                info!("Command 9 - restart");
                self.restart.restart();
            }
            Command::Unknown(byte) => {
                warn!("Unknown command: {}", byte as char);
            }
        }
    }
}
