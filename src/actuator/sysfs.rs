//! Relay line driven through the Linux sysfs GPIO interface.

use super::driver::OutputLine;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

const EXPORT_PATH: &str = "/sys/class/gpio/export";

/// One exported sysfs GPIO output.
pub struct SysfsLine {
    value_path: PathBuf,
}

impl SysfsLine {
    /// Export the line and configure it as an output. Configuring the
    /// direction drives the line low.
    pub fn open(line: u32) -> Result<Self> {
        let dir = PathBuf::from(format!("/sys/class/gpio/gpio{}", line));
        if !dir.exists() {
            fs::write(EXPORT_PATH, line.to_string())
                .with_context(|| format!("export gpio{}", line))?;
        }
        fs::write(dir.join("direction"), "out")
            .with_context(|| format!("configure gpio{} as output", line))?;

        Ok(Self {
            value_path: dir.join("value"),
        })
    }

    fn write(&self, value: &str) -> Result<()> {
        fs::write(&self.value_path, value).context("gpio value write")
    }
}

impl OutputLine for SysfsLine {
    fn set_high(&mut self) -> Result<()> {
        self.write("1")
    }

    fn set_low(&mut self) -> Result<()> {
        self.write("0")
    }
}
