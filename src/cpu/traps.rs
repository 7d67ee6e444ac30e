//! Host traps on jump and call targets.
//!
//! A trap replaces a taken JMP/CALL (and their conditional forms) to a
//! registered address with a host function. The CP/M table intercepts the
//! warm-boot vector and the BDOS entry so CP/M test programs can run
//! without an operating system underneath.

use crate::cpu::memory::MEMORY_SIZE;
use crate::cpu::Cpu;
use std::collections::BTreeMap;

/// What the interpreter does once a trap handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapAction {
    /// Continue with the instruction after the jump or call.
    Resume,
    /// End the run.
    Stop,
}

pub type TrapHandler = fn(&mut Cpu) -> TrapAction;

/// CP/M warm boot vector.
pub const WARM_BOOT: u16 = 0x0000;
/// CP/M BDOS entry point.
pub const BDOS_ENTRY: u16 = 0x0005;

/// BDOS console output: print the character in E.
pub const BDOS_CONSOLE_OUTPUT: u8 = 2;
/// BDOS print string: print from DE up to a `$` terminator.
pub const BDOS_PRINT_STRING: u8 = 9;

/// Trap handlers keyed by target address.
#[derive(Clone, Default)]
pub struct TrapTable {
    handlers: BTreeMap<u16, TrapHandler>,
}

impl TrapTable {
    /// An empty table: every transfer goes to memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table for CP/M programs loaded at 0x0100.
    pub fn cpm() -> Self {
        let mut table = Self::new();
        table.register(WARM_BOOT, warm_boot);
        table.register(BDOS_ENTRY, bdos);
        table
    }

    /// Install `handler` at `address`, returning any handler it replaces.
    pub fn register(&mut self, address: u16, handler: TrapHandler) -> Option<TrapHandler> {
        self.handlers.insert(address, handler)
    }

    pub fn remove(&mut self, address: u16) -> Option<TrapHandler> {
        self.handlers.remove(&address)
    }

    pub fn get(&self, address: u16) -> Option<TrapHandler> {
        self.handlers.get(&address).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Trapped addresses in ascending order.
    pub fn addresses(&self) -> impl Iterator<Item = u16> + '_ {
        self.handlers.keys().copied()
    }
}

impl std::fmt::Debug for TrapTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries(self.addresses().map(|a| format!("{:04X}", a)))
            .finish()
    }
}

/// A program jumping back to 0x0000 is done.
pub fn warm_boot(_cpu: &mut Cpu) -> TrapAction {
    TrapAction::Stop
}

/// Minimal BDOS: console output and print string. Other functions are
/// logged and ignored.
pub fn bdos(cpu: &mut Cpu) -> TrapAction {
    tracing::debug!(function = cpu.regs.c, de = %format_args!("{:04X}", cpu.regs.de()), "BDOS call");
    match cpu.regs.c {
        BDOS_CONSOLE_OUTPUT => {
            let byte = cpu.regs.e;
            cpu.console_write(byte);
        }
        BDOS_PRINT_STRING => print_string(cpu),
        function => {
            tracing::debug!(function, "unsupported BDOS function");
        }
    }
    TrapAction::Resume
}

fn print_string(cpu: &mut Cpu) {
    let mut addr = cpu.regs.de();
    for _ in 0..MEMORY_SIZE {
        let byte = cpu.mem.read(addr);
        if byte == b'$' {
            return;
        }
        cpu.console_write(byte);
        addr = addr.wrapping_add(1);
    }
    tracing::warn!(start = %format_args!("{:04X}", cpu.regs.de()), "unterminated BDOS string");
}
