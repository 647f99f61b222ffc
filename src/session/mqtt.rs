//! rumqttc-backed broker session.

use super::supervisor::{BrokerLink, InboundMessage};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::time::timeout;

const KEEP_ALIVE: Duration = Duration::from_secs(15);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long one `poll` call services the event loop before yielding back
/// to the control loop.
const POLL_WINDOW: Duration = Duration::from_millis(100);

/// The single MQTT session, created once at boot and reused for the whole
/// process lifetime. Protocol version is fixed at 3.1.1.
pub struct MqttSession {
    client: AsyncClient,
    events: EventLoop,
    connected: bool,
}

impl MqttSession {
    /// Bind the session to the broker endpoint. No I/O happens here; the
    /// first `connect` call dials out.
    pub fn new(client_id: &str, host: &str, port: u16) -> Self {
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(KEEP_ALIVE);

        let (client, events) = AsyncClient::new(options, 10);
        Self {
            client,
            events,
            connected: false,
        }
    }

    fn track(&mut self, event: &Event) {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) if ack.code == ConnectReturnCode::Success => {
                self.connected = true;
            }
            Event::Incoming(Packet::Disconnect) => self.connected = false,
            _ => {}
        }
    }
}

#[async_trait]
impl BrokerLink for MqttSession {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> Result<()> {
        // rumqttc dials lazily: drive the event loop until CONNACK
        let attempt = async {
            loop {
                let event = self.events.poll().await.context("broker connect")?;
                self.track(&event);
                if let Event::Incoming(Packet::ConnAck(ack)) = &event {
                    if ack.code == ConnectReturnCode::Success {
                        return Ok(());
                    }
                    bail!("broker refused session: {:?}", ack.code);
                }
            }
        };

        match timeout(CONNECT_TIMEOUT, attempt).await {
            Ok(result) => result,
            Err(_) => bail!("broker connect timed out"),
        }
    }

    async fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.client
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .context("subscribe")
    }

    async fn poll(&mut self) -> Result<Option<InboundMessage>> {
        if !self.connected {
            // Reconnecting is the supervisor's job, not the poll path's
            return Ok(None);
        }

        let polled = timeout(POLL_WINDOW, self.events.poll()).await;
        match polled {
            // Quiet window, nothing pending
            Err(_) => Ok(None),
            Ok(Ok(event)) => {
                self.track(&event);
                if let Event::Incoming(Packet::Publish(publish)) = event {
                    return Ok(Some(InboundMessage {
                        topic: publish.topic,
                        payload: publish.payload,
                    }));
                }
                Ok(None)
            }
            Ok(Err(e)) => {
                self.connected = false;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_starts_disconnected() {
        let session = MqttSession::new("gatekeeper", "127.0.0.1", 1883);
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_poll_while_disconnected_is_inert() {
        let mut session = MqttSession::new("gatekeeper", "127.0.0.1", 1883);
        // No session: poll must not attempt any reconnection I/O
        let polled = session.poll().await.unwrap();
        assert!(polled.is_none());
    }
}
