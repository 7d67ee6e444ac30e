//! CPU execution engine for the 8080.
//!
//! Implements the fetch-decode-execute cycle. Instruction behaviors live in
//! [`crate::cpu::ops`] and are reached through the opcode table.

use crate::cpu::{Memory, Registers};
use crate::cpu::decode::{self, Instruction};
use crate::cpu::memory::{MemoryError, MEMORY_SIZE};
use crate::cpu::registers::Reg;
use crate::cpu::traps::TrapTable;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Unimplemented-opcode reports kept until the host takes them.
pub const MAX_DIAGNOSTICS: usize = 64;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU executed HLT.
    Halted,
    /// A trap handler ended the run.
    Stopped,
}

/// An opcode the interpreter does not implement, reported when executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub address: u16,
    pub opcode: u8,
}

/// The 8080 CPU together with its memory.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers and flags.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Interrupt enable flip-flop (EI/DI). Nothing consumes it.
    pub interrupts_enabled: bool,
    /// Instruction count.
    pub steps: u64,
    /// One past the last byte of the loaded images, if any were loaded.
    loaded_end: Option<u32>,
    #[serde(skip)]
    pub(crate) traps: TrapTable,
    /// Bytes written to the console by trap handlers.
    #[serde(skip)]
    console: Vec<u8>,
    #[serde(skip)]
    diagnostics: Vec<Diagnostic>,
    /// Unimplemented opcodes executed, including reports no longer kept.
    #[serde(skip)]
    unimplemented_count: u64,
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a new CPU with zeroed state and no traps.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Running,
            interrupts_enabled: false,
            steps: 0,
            loaded_end: None,
            traps: TrapTable::new(),
            console: Vec::new(),
            diagnostics: Vec::new(),
            unimplemented_count: 0,
            last_instr: None,
        }
    }

    /// Create a CPU that consults `traps` on jump and call targets.
    pub fn with_traps(traps: TrapTable) -> Self {
        Self { traps, ..Self::new() }
    }

    /// Reset the CPU to initial state. Installed traps are kept.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.interrupts_enabled = false;
        self.steps = 0;
        self.loaded_end = None;
        self.console.clear();
        self.diagnostics.clear();
        self.unimplemented_count = 0;
        self.last_instr = None;
    }

    /// Copy a program image into memory at `base`.
    ///
    /// Does not move the program counter. `run` stops once PC leaves the
    /// loaded region.
    pub fn load_program(&mut self, base: u16, image: &[u8]) -> Result<(), MemoryError> {
        self.mem.load(base, image)?;
        let end = base as u32 + image.len() as u32;
        self.loaded_end = Some(self.loaded_end.map_or(end, |prev| prev.max(end)));
        Ok(())
    }

    /// One past the last populated address (the whole space if nothing was loaded).
    pub fn program_end(&self) -> u32 {
        self.loaded_end.unwrap_or(MEMORY_SIZE as u32)
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or an error if the CPU is
    /// not running.
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        let instr = decode::decode(&self.mem, self.regs.pc);
        let info = instr.info();
        tracing::trace!(
            address = %format_args!("{:04X}", instr.address),
            opcode = %format_args!("{:02X}", instr.opcode),
            mnemonic = info.mnemonic,
            "execute"
        );

        self.regs.advance_pc();
        (info.execute)(self, instr.opcode);

        self.steps += 1;
        self.last_instr = Some(instr);

        Ok(instr)
    }

    /// Run until halt, a stopping trap, or PC leaving the loaded program.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let start_steps = self.steps;

        while self.is_running() && self.pc_in_program() {
            self.step()?;
        }

        Ok(self.steps - start_steps)
    }

    /// Run for at most `max_steps` instructions.
    pub fn run_limited(&mut self, max_steps: u64) -> Result<u64, CpuError> {
        let start_steps = self.steps;
        let limit = self.steps + max_steps;

        while self.is_running() && self.pc_in_program() && self.steps < limit {
            self.step()?;
        }

        Ok(self.steps - start_steps)
    }

    fn pc_in_program(&self) -> bool {
        (self.regs.pc as u32) < self.program_end()
    }

    /// Read the byte at PC and advance PC.
    pub(crate) fn fetch_byte(&mut self) -> u8 {
        let addr = self.regs.advance_pc();
        self.mem.read(addr)
    }

    /// Read a little-endian word at PC and advance PC past it.
    pub(crate) fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch_byte();
        let hi = self.fetch_byte();
        u16::from_le_bytes([lo, hi])
    }

    /// Read a register operand; `M` reads memory at HL.
    pub fn reg(&self, reg: Reg) -> u8 {
        match reg {
            Reg::B => self.regs.b,
            Reg::C => self.regs.c,
            Reg::D => self.regs.d,
            Reg::E => self.regs.e,
            Reg::H => self.regs.h,
            Reg::L => self.regs.l,
            Reg::M => self.mem.read(self.regs.hl()),
            Reg::A => self.regs.a,
        }
    }

    /// Write a register operand; `M` writes memory at HL.
    pub fn set_reg(&mut self, reg: Reg, value: u8) {
        match reg {
            Reg::B => self.regs.b = value,
            Reg::C => self.regs.c = value,
            Reg::D => self.regs.d = value,
            Reg::E => self.regs.e = value,
            Reg::H => self.regs.h = value,
            Reg::L => self.regs.l = value,
            Reg::M => self.mem.write(self.regs.hl(), value),
            Reg::A => self.regs.a = value,
        }
    }

    pub(crate) fn halt(&mut self) {
        tracing::info!(pc = %format_args!("{:04X}", self.regs.pc), steps = self.steps, "halted");
        self.state = CpuState::Halted;
    }

    pub(crate) fn stop(&mut self) {
        tracing::info!(pc = %format_args!("{:04X}", self.regs.pc), steps = self.steps, "stopped by trap");
        self.state = CpuState::Stopped;
    }

    pub(crate) fn report_unimplemented(&mut self, address: u16, opcode: u8) {
        tracing::warn!(
            address = %format_args!("{:04X}", address),
            opcode = %format_args!("{:02X}", opcode),
            "unimplemented instruction"
        );
        self.unimplemented_count += 1;
        if self.diagnostics.len() < MAX_DIAGNOSTICS {
            self.diagnostics.push(Diagnostic { address, opcode });
        }
    }

    /// The installed trap table.
    pub fn traps(&self) -> &TrapTable {
        &self.traps
    }

    /// Mutable access to the trap table, for registering host handlers.
    pub fn traps_mut(&mut self) -> &mut TrapTable {
        &mut self.traps
    }

    /// Append a byte to the console stream.
    pub fn console_write(&mut self, byte: u8) {
        self.console.push(byte);
    }

    /// Console bytes not yet taken by the host.
    pub fn console(&self) -> &[u8] {
        &self.console
    }

    /// Drain the console stream.
    pub fn take_console(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.console)
    }

    /// Unimplemented-opcode reports not yet taken by the host, at most
    /// `MAX_DIAGNOSTICS` of them.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Total unimplemented opcodes executed since the last reset.
    pub fn unimplemented_count(&self) -> u64 {
        self.unimplemented_count
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("steps", &self.steps)
            .field("regs", &self.regs)
            .field("traps", &self.traps)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("memory error: {0}")]
    MemoryError(#[from] MemoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::Operand;

    fn cpu_with(program: &[u8]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_program(0, program).unwrap();
        cpu
    }

    #[test]
    fn test_cpu_halt() {
        let mut cpu = cpu_with(&[0x76]);

        let executed = cpu.run().unwrap();

        assert_eq!(executed, 1);
        assert!(cpu.is_halted());
        assert_eq!(cpu.regs.pc, 1);
    }

    #[test]
    fn test_step_after_halt_is_an_error() {
        let mut cpu = cpu_with(&[0x76]);
        cpu.run().unwrap();

        assert_eq!(cpu.step(), Err(CpuError::NotRunning(CpuState::Halted)));
        assert_eq!(cpu.run(), Ok(0));
    }

    #[test]
    fn test_nop_then_halt() {
        let mut cpu = cpu_with(&[0x00, 0x00, 0x00, 0x76]);

        assert_eq!(cpu.run().unwrap(), 4);
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_run_stops_at_end_of_program() {
        let mut cpu = cpu_with(&[0x00, 0x3C]);

        assert_eq!(cpu.run().unwrap(), 2);
        assert!(cpu.is_running());
        assert_eq!(cpu.regs.pc, 2);
        assert_eq!(cpu.regs.a, 1);
    }

    #[test]
    fn test_run_limited() {
        let mut cpu = cpu_with(&[0xC3, 0x00, 0x00]); // JMP 0000

        assert_eq!(cpu.run_limited(10).unwrap(), 10);
        assert!(cpu.is_running());
        assert_eq!(cpu.steps, 10);
    }

    #[test]
    fn test_step_returns_decoded_instruction() {
        let mut cpu = cpu_with(&[0x3E, 0x42]); // MVI A,42

        let instr = cpu.step().unwrap();

        assert_eq!(instr.address, 0);
        assert_eq!(instr.opcode, 0x3E);
        assert_eq!(instr.operand, Operand::Byte(0x42));
        assert_eq!(cpu.last_instruction(), Some(instr));
        assert_eq!(cpu.regs.pc, 2);
    }

    #[test]
    fn test_fetch_wraps_at_top_of_memory() {
        let mut cpu = Cpu::new();
        cpu.mem.write(0xFFFF, 0x3E); // MVI A,
        cpu.mem.write(0x0000, 0x99);
        cpu.regs.pc = 0xFFFF;

        cpu.step().unwrap();

        assert_eq!(cpu.regs.a, 0x99);
        assert_eq!(cpu.regs.pc, 0x0001);
    }

    #[test]
    fn test_memory_register_uses_hl() {
        let mut cpu = Cpu::new();
        cpu.regs.set_hl(0x2000);
        cpu.set_reg(Reg::M, 0x5A);

        assert_eq!(cpu.mem.read(0x2000), 0x5A);
        assert_eq!(cpu.reg(Reg::M), 0x5A);
    }

    #[test]
    fn test_io_reports_and_continues() {
        let mut cpu = cpu_with(&[0xDB, 0x10, 0xD3, 0x20, 0x3C]); // IN 10, OUT 20, INR A

        assert_eq!(cpu.run().unwrap(), 3);
        assert_eq!(cpu.regs.a, 1);
        assert_eq!(
            cpu.take_diagnostics(),
            vec![Diagnostic { address: 0, opcode: 0xDB }, Diagnostic { address: 2, opcode: 0xD3 }]
        );
        assert!(cpu.diagnostics().is_empty());
    }

    #[test]
    fn test_io_loop_keeps_bounded_reports() {
        let mut cpu = cpu_with(&[0xD3, 0x10, 0xC3, 0x00, 0x00]); // OUT 10; JMP 0000

        cpu.run_limited(20_000).unwrap();

        assert_eq!(cpu.unimplemented_count(), 10_000);
        assert_eq!(cpu.diagnostics().len(), MAX_DIAGNOSTICS);
        assert_eq!(cpu.diagnostics()[0], Diagnostic { address: 0, opcode: 0xD3 });

        cpu.take_diagnostics();
        cpu.run_limited(2).unwrap();
        assert_eq!(cpu.diagnostics().len(), 1);
        assert_eq!(cpu.unimplemented_count(), 10_001);
    }

    #[test]
    fn test_load_extends_program_end() {
        let mut cpu = Cpu::new();
        assert_eq!(cpu.program_end(), 0x10000);

        cpu.load_program(0x0100, &[0; 16]).unwrap();
        cpu.load_program(0x0000, &[0; 8]).unwrap();
        assert_eq!(cpu.program_end(), 0x0110);

        assert!(cpu.load_program(0xFFF0, &[0; 32]).is_err());
        assert_eq!(cpu.program_end(), 0x0110);
    }

    #[test]
    fn test_reset_keeps_traps() {
        let mut cpu = Cpu::with_traps(TrapTable::cpm());
        cpu.load_program(0, &[0x76]).unwrap();
        cpu.run().unwrap();

        cpu.reset();

        assert!(cpu.is_running());
        assert_eq!(cpu.steps, 0);
        assert_eq!(cpu.mem.read(0), 0);
        assert!(!cpu.traps().is_empty());
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut cpu = cpu_with(&[0x3E, 0x12, 0x76]);
        cpu.run().unwrap();

        let json = serde_json::to_string(&cpu.regs).unwrap();
        let regs: Registers = serde_json::from_str(&json).unwrap();
        assert_eq!(regs, cpu.regs);
    }
}
