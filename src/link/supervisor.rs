//! Blocks startup until the network link is usable.

use super::state::{LinkEvent, LinkReport, LinkState};
use crate::system::Restart;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};

/// Source of link events, push model.
#[async_trait]
pub trait LinkEvents: Send {
    /// Advertise the device identity as hostname on the local network.
    fn advertise_hostname(&self, name: &str) -> Result<()>;

    /// Wait for the next link event. `None` means the source is gone.
    async fn next_event(&mut self) -> Option<LinkEvent>;
}

/// Link supervision settings.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Interface to monitor.
    pub interface: String,
    /// One-second ticks to wait for an address before restarting.
    pub wait_ticks: u32,
    /// Tick granularity.
    pub tick: Duration,
    /// Settle delay before monitoring starts.
    pub settle: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            interface: "eth0".into(),
            wait_ticks: 30,
            tick: Duration::from_secs(1),
            settle: Duration::from_millis(100),
        }
    }
}

/// Owns the link state and the startup wait.
///
/// The only failure path is budget exhaustion, and its only remedy is a
/// process restart. There is no retry-without-restart.
pub struct LinkSupervisor<S: LinkEvents> {
    config: LinkConfig,
    identity: String,
    source: S,
    state: LinkState,
    restart: Arc<dyn Restart>,
}

impl<S: LinkEvents> LinkSupervisor<S> {
    pub fn new(
        config: LinkConfig,
        identity: impl Into<String>,
        source: S,
        restart: Arc<dyn Restart>,
    ) -> Self {
        Self {
            config,
            identity: identity.into(),
            source,
            state: LinkState::Down,
            restart,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Block until the link reports an acquired address.
    ///
    /// Waits in ticks up to the configured budget; on exhaustion the process
    /// is restarted. Returns only after logging the link report.
    pub async fn establish(&mut self) -> Result<LinkReport> {
        sleep(self.config.settle).await;
        info!("Connecting network on {}", self.config.interface);

        let mut remaining = self.config.wait_ticks;
        let mut deadline = Instant::now() + self.config.tick;

        loop {
            tokio::select! {
                event = self.source.next_event() => {
                    let Some(event) = event else {
                        return Err(anyhow!("link monitor closed"));
                    };
                    if let Some(report) = self.handle(event) {
                        info!(
                            "Link up: mac={} addr={} {} {} Mbps",
                            report.mac,
                            report.address,
                            if report.full_duplex { "FDX" } else { "HDX" },
                            report.speed_mbps
                        );
                        return Ok(report);
                    }
                }
                // Budget burns at tick cadence no matter how chatty the source is
                _ = sleep_until(deadline) => {
                    remaining -= 1;
                    if remaining == 0 {
                        warn!(
                            "Connection failed after {} ticks, restarting",
                            self.config.wait_ticks
                        );
                        self.restart.restart();
                        return Err(anyhow!("link wait budget exhausted"));
                    }
                    debug!("Waiting for link ({} ticks left)", remaining);
                    deadline += self.config.tick;
                }
            }
        }
    }

    /// Advance the state machine for one event. Returns the link report once
    /// an address is acquired.
    fn handle(&mut self, event: LinkEvent) -> Option<LinkReport> {
        match &event {
            LinkEvent::Started => {
                debug!("Link started");
                if let Err(e) = self.source.advertise_hostname(&self.identity) {
                    warn!("Failed to advertise hostname: {:#}", e);
                }
            }
            LinkEvent::Connected => debug!("Link connected"),
            LinkEvent::Disconnected => warn!("Link disconnected"),
            LinkEvent::Stopped => warn!("Link stopped"),
            LinkEvent::Unknown(code) => debug!("Unhandled link event: {}", code),
            LinkEvent::AddressAcquired(_) => {}
        }

        self.state = self.state.apply(&event);
        match event {
            LinkEvent::AddressAcquired(report) => Some(report),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct ScriptedEvents {
        rx: mpsc::UnboundedReceiver<LinkEvent>,
        hostnames: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl LinkEvents for ScriptedEvents {
        fn advertise_hostname(&self, name: &str) -> Result<()> {
            self.hostnames.lock().unwrap().push(name.to_string());
            Ok(())
        }

        async fn next_event(&mut self) -> Option<LinkEvent> {
            self.rx.recv().await
        }
    }

    #[derive(Default)]
    struct CountingRestart(AtomicU32);

    impl Restart for CountingRestart {
        fn restart(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn report() -> LinkReport {
        LinkReport {
            address: "192.168.1.40".into(),
            mac: "aa:bb:cc:dd:ee:ff".into(),
            full_duplex: true,
            speed_mbps: 100,
        }
    }

    fn supervisor(
        rx: mpsc::UnboundedReceiver<LinkEvent>,
    ) -> (
        LinkSupervisor<ScriptedEvents>,
        Arc<Mutex<Vec<String>>>,
        Arc<CountingRestart>,
    ) {
        let hostnames = Arc::new(Mutex::new(Vec::new()));
        let restart = Arc::new(CountingRestart::default());
        let source = ScriptedEvents {
            rx,
            hostnames: hostnames.clone(),
        };
        let supervisor = LinkSupervisor::new(
            LinkConfig::default(),
            "gatekeeper",
            source,
            restart.clone(),
        );
        (supervisor, hostnames, restart)
    }

    #[tokio::test(start_paused = true)]
    async fn test_establish_within_budget() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (mut supervisor, hostnames, restart) = supervisor(rx);

        tokio::spawn(async move {
            tx.send(LinkEvent::Started).unwrap();
            tx.send(LinkEvent::Connected).unwrap();
            sleep(Duration::from_secs(5)).await;
            tx.send(LinkEvent::AddressAcquired(report())).unwrap();
            // Keep the sender alive so the source never closes
            std::future::pending::<()>().await;
        });

        let acquired = supervisor.establish().await.unwrap();
        assert_eq!(acquired, report());
        assert!(supervisor.state().is_up());
        assert_eq!(restart.0.load(Ordering::SeqCst), 0);
        assert_eq!(*hostnames.lock().unwrap(), ["gatekeeper"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_restarts_once() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (mut supervisor, _hostnames, restart) = supervisor(rx);

        let start = Instant::now();
        let result = supervisor.establish().await;

        assert!(result.is_err());
        assert_eq!(restart.0.load(Ordering::SeqCst), 1);
        // Exactly 30 one-second ticks, plus the settle delay
        assert_eq!(
            start.elapsed(),
            Duration::from_secs(30) + LinkConfig::default().settle
        );
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_loss_recorded_but_not_fatal() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (mut supervisor, _hostnames, restart) = supervisor(rx);

        tokio::spawn(async move {
            tx.send(LinkEvent::Started).unwrap();
            tx.send(LinkEvent::AddressAcquired(report())).unwrap();
            std::future::pending::<()>().await;
        });

        supervisor.establish().await.unwrap();

        // Loss after establishment only updates the recorded state
        supervisor.handle(LinkEvent::Disconnected);
        assert_eq!(supervisor.state(), LinkState::Down);
        assert_eq!(restart.0.load(Ordering::SeqCst), 0);
    }
}
