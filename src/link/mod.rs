//! Network link supervision
//!
//! This module handles:
//! - Link state tracking driven by transport events
//! - The blocking startup wait with a restart budget
//! - The sysfs-backed Ethernet monitor

mod ethernet;
mod state;
mod supervisor;

pub use ethernet::EthernetMonitor;
pub use state::{LinkEvent, LinkReport, LinkState};
pub use supervisor::{LinkConfig, LinkEvents, LinkSupervisor};
