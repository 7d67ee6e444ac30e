//! Run configuration.
//!
//! A `RunConfig` says where an image goes, where execution starts and which
//! host services are installed. It can be read from a JSON file; the CLI
//! overrides individual fields from its flags.

use crate::cpu::{Cpu, MemoryError, TrapTable};
use serde::{Serialize, Deserialize};
use std::path::Path;
use thiserror::Error;

/// Standard load address of CP/M transient programs.
pub const CPM_LOAD_ADDRESS: u16 = 0x0100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Where the image is copied.
    pub load_address: u16,
    /// Initial PC; defaults to `load_address`.
    pub entry_point: Option<u16>,
    /// Install the CP/M warm-boot and BDOS traps.
    pub cpm: bool,
    /// Initial SP; left at zero when unset.
    pub stack_pointer: Option<u16>,
    /// Upper bound on executed instructions.
    pub max_steps: Option<u64>,
}

impl RunConfig {
    /// Defaults for a CP/M `.COM` program.
    pub fn cpm() -> Self {
        Self {
            load_address: CPM_LOAD_ADDRESS,
            cpm: true,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&text)
    }

    pub fn entry(&self) -> u16 {
        self.entry_point.unwrap_or(self.load_address)
    }

    /// Build a CPU with `image` loaded and PC/SP set from this config.
    pub fn build_cpu(&self, image: &[u8]) -> Result<Cpu, MemoryError> {
        let traps = if self.cpm { TrapTable::cpm() } else { TrapTable::new() };
        let mut cpu = Cpu::with_traps(traps);
        cpu.load_program(self.load_address, image)?;
        cpu.regs.pc = self.entry();
        if let Some(sp) = self.stack_pointer {
            cpu.regs.sp = sp;
        }
        Ok(cpu)
    }
}

/// Parse an address given as decimal or `0x`-prefixed hex.
pub fn parse_address(text: &str) -> Result<u16, ConfigError> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => text.parse::<u16>(),
    };
    parsed.map_err(|_| ConfigError::InvalidAddress(text.to_string()))
}

/// Errors that can occur while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {message}")]
    IoError { path: String, message: String },

    #[error("invalid config: {0}")]
    ParseError(String),

    #[error("invalid address '{0}' (expected 0..65535 or 0x0000..0xFFFF)")]
    InvalidAddress(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("256"), Ok(0x0100));
        assert_eq!(parse_address("0x0100"), Ok(0x0100));
        assert_eq!(parse_address("0XFFFF"), Ok(0xFFFF));
        assert!(parse_address("0x10000").is_err());
        assert!(parse_address("65536").is_err());
        assert!(parse_address("start").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = RunConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.entry(), 0);
    }

    #[test]
    fn test_partial_json() {
        let config = RunConfig::from_json_str(r#"{"load_address": 256, "cpm": true}"#).unwrap();

        assert_eq!(config.load_address, 0x0100);
        assert!(config.cpm);
        assert_eq!(config.entry(), 0x0100);
        assert_eq!(config.max_steps, None);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(RunConfig::from_json_str("{"), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_build_cpu() {
        let config = RunConfig {
            entry_point: Some(0x0102),
            stack_pointer: Some(0xF000),
            ..RunConfig::cpm()
        };

        let cpu = config.build_cpu(&[0x00, 0x00, 0x76]).unwrap();

        assert_eq!(cpu.regs.pc, 0x0102);
        assert_eq!(cpu.regs.sp, 0xF000);
        assert_eq!(cpu.mem.read(0x0102), 0x76);
        assert_eq!(cpu.program_end(), 0x0103);
        assert!(cpu.traps().get(0x0005).is_some());
    }
}
