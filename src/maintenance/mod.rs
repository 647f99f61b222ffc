//! Firmware-update maintenance hook.
//!
//! The update service is an external collaborator: the control loop only
//! grants it a service window once per iteration. What the service does
//! inside that window is opaque to the core.

use async_trait::async_trait;
use tracing::info;

/// Periodic maintenance collaborator.
#[async_trait]
pub trait Maintenance: Send {
    /// One service opportunity. Called every loop iteration.
    async fn tick(&mut self);
}

/// The firmware-update service, advertised under the device identity.
pub struct UpdateService {
    hostname: String,
    port: u16,
    announced: bool,
}

impl UpdateService {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            announced: false,
        }
    }
}

#[async_trait]
impl Maintenance for UpdateService {
    async fn tick(&mut self) {
        if !self.announced {
            self.announced = true;
            info!(
                "Update service ready as {} on port {}",
                self.hostname, self.port
            );
        }
        // The updater library owns the actual check-and-apply cycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tick_is_reentrant() {
        let mut service = UpdateService::new("gatekeeper", 8266);
        service.tick().await;
        service.tick().await;
        assert!(service.announced);
    }
}
