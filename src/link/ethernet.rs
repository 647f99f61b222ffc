//! Wired link monitor backed by Linux sysfs.
//!
//! Polls `/sys/class/net/<iface>/` at the tick cadence and synthesizes
//! [`LinkEvent`]s from carrier and address changes.

use super::state::{LinkEvent, LinkReport};
use super::supervisor::LinkEvents;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::net::{IpAddr, UdpSocket};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;

const HOSTNAME_PATH: &str = "/proc/sys/kernel/hostname";

/// Monitors one wired interface.
pub struct EthernetMonitor {
    interface: String,
    poll: Duration,
    started: bool,
    carrier_seen: bool,
    addressed: bool,
}

impl EthernetMonitor {
    pub fn new(interface: impl Into<String>, poll: Duration) -> Self {
        Self {
            interface: interface.into(),
            poll,
            started: false,
            carrier_seen: false,
            addressed: false,
        }
    }

    fn sys(&self, leaf: &str) -> PathBuf {
        PathBuf::from(format!("/sys/class/net/{}/{}", self.interface, leaf))
    }

    fn carrier(&self) -> bool {
        // Reads fail with EINVAL while the interface is administratively down
        fs::read_to_string(self.sys("carrier"))
            .map(|raw| raw.trim() == "1")
            .unwrap_or(false)
    }

    fn report(&self) -> Option<LinkReport> {
        let address = local_address()?;
        let mac = fs::read_to_string(self.sys("address")).ok()?.trim().to_string();
        let speed_mbps = fs::read_to_string(self.sys("speed"))
            .map(|raw| parse_speed(&raw))
            .unwrap_or(0);
        let full_duplex = fs::read_to_string(self.sys("duplex"))
            .map(|raw| parse_duplex(&raw))
            .unwrap_or(false);

        Some(LinkReport {
            address: address.to_string(),
            mac,
            full_duplex,
            speed_mbps,
        })
    }
}

#[async_trait]
impl LinkEvents for EthernetMonitor {
    fn advertise_hostname(&self, name: &str) -> Result<()> {
        fs::write(HOSTNAME_PATH, name).context("set hostname")
    }

    async fn next_event(&mut self) -> Option<LinkEvent> {
        if !self.started {
            self.started = true;
            return Some(LinkEvent::Started);
        }

        loop {
            let carrier = self.carrier();
            if carrier && !self.carrier_seen {
                self.carrier_seen = true;
                return Some(LinkEvent::Connected);
            }
            if !carrier && self.carrier_seen {
                self.carrier_seen = false;
                self.addressed = false;
                return Some(LinkEvent::Disconnected);
            }
            if carrier && !self.addressed {
                if let Some(report) = self.report() {
                    self.addressed = true;
                    return Some(LinkEvent::AddressAcquired(report));
                }
            }
            sleep(self.poll).await;
        }
    }
}

/// Source address the kernel would route external traffic from.
/// `connect` on a UDP socket only selects the route; nothing is sent.
fn local_address() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("1.1.1.1:80").ok()?;
    Some(socket.local_addr().ok()?.ip())
}

fn parse_speed(raw: &str) -> u32 {
    raw.trim().parse().unwrap_or(0)
}

fn parse_duplex(raw: &str) -> bool {
    raw.trim() == "full"
}
