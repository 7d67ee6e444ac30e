//! # i8080
//!
//! An interpreter for the Intel 8080 microprocessor.
//!
//! The whole instruction set is modeled with the 8080's flag semantics,
//! including auxiliary carry, DAA and the undocumented opcode aliases.
//! Jumps and calls to registered addresses can be trapped into host code,
//! which is how CP/M test programs print through BDOS without an OS.

pub mod cpu;
pub mod asm;
pub mod config;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, Memory, Registers, Flags, Instruction, TrapTable, TrapAction};
pub use asm::{disassemble, disassemble_instruction, load_image, ImageError};
pub use config::{RunConfig, ConfigError, parse_address};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
