//! Open-loop driver for the gate relay line.

use anyhow::Result;
use std::time::Duration;
use tokio::time::sleep;

/// A single digital output line, two logic levels.
pub trait OutputLine: Send {
    fn set_high(&mut self) -> Result<()>;
    fn set_low(&mut self) -> Result<()>;
}

/// Drives the gate relay: hold low, or pulse high for a fixed duration.
/// There is no feedback sensing of the actual gate position.
pub struct ActuatorDriver<L: OutputLine> {
    line: L,
}

impl<L: OutputLine> ActuatorDriver<L> {
    pub fn new(line: L) -> Self {
        Self { line }
    }

    /// Drive the line low and leave it there.
    pub fn set_low(&mut self) -> Result<()> {
        self.line.set_low()
    }

    /// Pulse the line high for `duration`, then low again.
    ///
    /// Synchronous for the full duration: the control task services nothing
    /// else while the pulse is in flight.
    pub async fn pulse_high(&mut self, duration: Duration) -> Result<()> {
        self.line.set_high()?;
        sleep(duration).await;
        self.line.set_low()
    }
}
