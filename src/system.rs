//! Process restart seam.
//!
//! Restart is the remedy of last resort: no session teardown, no actuator
//! reset. The service manager is expected to bring the process back up.

use tracing::warn;

/// Requests an immediate, unconditional process restart.
pub trait Restart: Send + Sync {
    fn restart(&self);
}

/// Restarts by exiting with a non-zero status so the supervising service
/// manager relaunches the unit.
pub struct ProcessRestart;

impl Restart for ProcessRestart {
    fn restart(&self) {
        warn!("Restarting...");
        std::process::exit(1);
    }
}
