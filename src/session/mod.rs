//! Broker session supervision
//!
//! This module handles:
//! - The single, process-lifetime MQTT session
//! - Bounded per-call reconnects, unbounded across loop iterations
//! - Inbound message delivery from the subscribed topic

mod mqtt;
mod supervisor;

pub use mqtt::MqttSession;
pub use supervisor::{BrokerLink, InboundMessage, SessionConfig, SessionSupervisor};
