//! Session supervision with a bounded per-call reconnect budget.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// A message delivered on a subscribed topic.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Bytes,
}

/// The broker connection seam. Only connect, subscribe and poll are exposed.
#[async_trait]
pub trait BrokerLink: Send {
    fn is_connected(&self) -> bool;

    /// One connect attempt against the bound broker endpoint.
    async fn connect(&mut self) -> Result<()>;

    /// Subscribe to a topic on the current session.
    async fn subscribe(&mut self, topic: &str) -> Result<()>;

    /// Service the connection and return the next inbound message, if any.
    async fn poll(&mut self) -> Result<Option<InboundMessage>>;
}

/// Session supervision settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Broker host.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// The one topic commands arrive on.
    pub topic: String,
    /// Connect attempts per `ensure_session` call.
    pub attempts: u32,
    /// Pause after each failed attempt.
    pub retry_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "mosquitto.moerman.online".into(),
            port: 1883,
            topic: "control/gate".into(),
            attempts: 5,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Owns the single broker session for the lifetime of the process.
pub struct SessionSupervisor<B: BrokerLink> {
    config: SessionConfig,
    link: B,
}

impl<B: BrokerLink> SessionSupervisor<B> {
    pub fn new(config: SessionConfig, link: B) -> Self {
        Self { config, link }
    }

    /// One-time session setup: a first connect pass and the single
    /// subscription. The subscription is not reissued on later reconnects.
    pub async fn setup(&mut self) {
        let _ = self.ensure_session().await;
        match self.link.subscribe(&self.config.topic).await {
            Ok(()) => info!("Subscribed to topic {}", self.config.topic),
            Err(e) => warn!("Subscribe to {} failed: {:#}", self.config.topic, e),
        }
    }

    /// Make sure the session is alive. Idempotent; called every iteration.
    ///
    /// Already-connected calls return immediately without I/O. Otherwise up
    /// to `attempts` connects are made, `retry_delay` apart. `false` means
    /// this call gave up; the next call starts a fresh budget.
    pub async fn ensure_session(&mut self) -> bool {
        if self.link.is_connected() {
            debug!("Broker session alive");
            return true;
        }

        info!("Setup MQTT...");
        for attempt in 1..=self.config.attempts {
            match self.link.connect().await {
                Ok(()) => {
                    info!("Connected to broker (attempt {})", attempt);
                    return true;
                }
                Err(e) => {
                    warn!("Connect attempt {} failed: {:#}", attempt, e);
                    sleep(self.config.retry_delay).await;
                }
            }
        }
        warn!("Broker unreachable after {} attempts", self.config.attempts);
        false
    }

    /// Service the session and fetch the next inbound message. Transport
    /// errors drop the session; the next `ensure_session` call recovers it.
    pub async fn poll(&mut self) -> Option<InboundMessage> {
        match self.link.poll().await {
            Ok(message) => message,
            Err(e) => {
                warn!("Session dropped: {:#}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::VecDeque;
    use tokio::time::Instant;

    #[derive(Default)]
    struct ScriptedBroker {
        connected: bool,
        /// Outcome of each connect attempt, oldest first; exhausted = fail.
        connect_script: VecDeque<bool>,
        connect_calls: u32,
        subscriptions: Vec<String>,
    }

    #[async_trait]
    impl BrokerLink for ScriptedBroker {
        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn connect(&mut self) -> Result<()> {
            self.connect_calls += 1;
            if self.connect_script.pop_front().unwrap_or(false) {
                self.connected = true;
                Ok(())
            } else {
                Err(anyhow!("connection refused"))
            }
        }

        async fn subscribe(&mut self, topic: &str) -> Result<()> {
            self.subscriptions.push(topic.to_string());
            Ok(())
        }

        async fn poll(&mut self) -> Result<Option<InboundMessage>> {
            Ok(None)
        }
    }

    fn supervisor(script: &[bool]) -> SessionSupervisor<ScriptedBroker> {
        let broker = ScriptedBroker {
            connect_script: script.iter().copied().collect(),
            ..Default::default()
        };
        SessionSupervisor::new(SessionConfig::default(), broker)
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent_while_connected() {
        let mut supervisor = supervisor(&[]);
        supervisor.link.connected = true;

        assert!(supervisor.ensure_session().await);
        assert!(supervisor.ensure_session().await);
        assert_eq!(supervisor.link.connect_calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_bounded_and_spaced() {
        let mut supervisor = supervisor(&[]);

        let start = Instant::now();
        assert!(!supervisor.ensure_session().await);

        assert_eq!(supervisor.link.connect_calls, 5);
        // Five failed attempts, 2 s pause after each
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_stops_the_budget() {
        let mut supervisor = supervisor(&[false, false, true]);

        let start = Instant::now();
        assert!(supervisor.ensure_session().await);

        assert_eq!(supervisor.link.connect_calls, 3);
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_resumes_on_next_call() {
        let mut supervisor = supervisor(&[]);
        assert!(!supervisor.ensure_session().await);

        // A later iteration calls again with a fresh budget
        supervisor.link.connect_script = VecDeque::from([true]);
        assert!(supervisor.ensure_session().await);
        assert_eq!(supervisor.link.connect_calls, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscription_issued_once() {
        let mut supervisor = supervisor(&[true]);
        supervisor.setup().await;
        assert_eq!(supervisor.link.subscriptions, ["control/gate"]);

        // Session drops and recovers: no automatic resubscription
        supervisor.link.connected = false;
        supervisor.link.connect_script = VecDeque::from([true]);
        assert!(supervisor.ensure_session().await);
        assert_eq!(supervisor.link.subscriptions.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_subscribes_even_if_connect_fails() {
        let mut supervisor = supervisor(&[]);
        supervisor.setup().await;

        // The subscription request is still issued once; the broker layer
        // owns queueing it until a session exists
        assert_eq!(supervisor.link.subscriptions, ["control/gate"]);
    }
}
