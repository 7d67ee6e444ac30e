//! Intel 8080 CPU emulation.
//!
//! - 64 KiB flat byte-addressed memory
//! - seven 8-bit registers, SP and PC, five condition flags
//! - the full 256-entry opcode map, including undocumented aliases
//! - host traps on jump/call targets (CP/M BDOS)

pub mod memory;
pub mod registers;
pub mod alu;
pub mod decode;
pub mod control;
pub mod execute;
pub mod traps;
mod ops;

pub use memory::{Memory, MemoryError, MEMORY_SIZE};
pub use registers::{Flags, Pair, Reg, Registers, StackPair};
pub use alu::AluOp;
pub use decode::{Instruction, Opcode, Operand, OPCODE_TABLE};
pub use control::Condition;
pub use execute::{Cpu, CpuError, CpuState, Diagnostic, MAX_DIAGNOSTICS};
pub use traps::{TrapAction, TrapHandler, TrapTable};
