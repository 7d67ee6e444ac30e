//! TUI debugger for the 8080 interpreter.
//!
//! Provides an interactive terminal-based debugger with:
//! - Registers and flags
//! - Hex memory view with PC and SP highlighted
//! - Step/run/breakpoint controls
//! - Disassembly around PC
//! - Console output of the CP/M traps

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
