//! Gate command handling
//!
//! This module handles:
//! - Decoding inbound payloads into gate commands
//! - Dispatching commands to the actuator or the restart seam

mod interpreter;

pub use interpreter::{Command, CommandInterpreter};
