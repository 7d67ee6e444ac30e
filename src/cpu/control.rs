//! Stack and control transfer.
//!
//! The stack grows downward in main memory: a push decrements SP and then
//! stores, a pop loads and then increments. Words go high byte first, so SP
//! ends up pointing at the low byte.
//!
//! Jumps and calls always consume their two operand bytes, taken or not.
//! A taken transfer to an address present in the trap table runs the
//! trap handler instead.

use crate::cpu::registers::Flags;
use crate::cpu::traps::TrapAction;
use crate::cpu::Cpu;
use serde::{Serialize, Deserialize};

/// Branch conditions, in the order of their 3-bit encoding (bits 5..3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    NotZero,
    Zero,
    NoCarry,
    Carry,
    ParityOdd,
    ParityEven,
    Plus,
    Minus,
}

impl Condition {
    pub const ALL: [Condition; 8] = [
        Condition::NotZero, Condition::Zero,
        Condition::NoCarry, Condition::Carry,
        Condition::ParityOdd, Condition::ParityEven,
        Condition::Plus, Condition::Minus,
    ];

    #[inline]
    pub fn from_opcode(opcode: u8) -> Self {
        Self::ALL[((opcode >> 3) & 0b111) as usize]
    }

    pub fn holds(self, flags: &Flags) -> bool {
        match self {
            Condition::NotZero => !flags.zero,
            Condition::Zero => flags.zero,
            Condition::NoCarry => !flags.carry,
            Condition::Carry => flags.carry,
            Condition::ParityOdd => !flags.parity,
            Condition::ParityEven => flags.parity,
            Condition::Plus => !flags.sign,
            Condition::Minus => flags.sign,
        }
    }
}

impl Cpu {
    pub fn push_byte(&mut self, value: u8) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.mem.write(self.regs.sp, value);
    }

    pub fn pop_byte(&mut self) -> u8 {
        let value = self.mem.read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        value
    }

    /// Push high byte then low byte.
    pub fn push_word(&mut self, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.push_byte(hi);
        self.push_byte(lo);
    }

    pub fn pop_word(&mut self) -> u16 {
        let lo = self.pop_byte();
        let hi = self.pop_byte();
        u16::from_be_bytes([hi, lo])
    }

    /// JMP / Jcc. The address operand is consumed either way.
    pub fn jump(&mut self, taken: bool) {
        let target = self.fetch_word();
        if taken && !self.trap(target) {
            self.regs.pc = target;
        }
    }

    /// CALL / Ccc. Pushes the address of the next instruction when taken.
    /// A trapped call pushes nothing.
    pub fn call(&mut self, taken: bool) {
        let target = self.fetch_word();
        if !taken || self.trap(target) {
            return;
        }

        let return_address = self.regs.pc;
        self.push_word(return_address);
        self.regs.pc = target;
    }

    /// RET / Rcc.
    pub fn ret(&mut self, taken: bool) {
        if taken {
            self.regs.pc = self.pop_word();
        }
    }

    /// RST n: call the fixed vector `n * 8`.
    pub fn restart(&mut self, vector: u8) {
        let return_address = self.regs.pc;
        self.push_word(return_address);
        self.regs.pc = u16::from(vector & 0b111) << 3;
    }

    /// Run the trap registered at `target`, if any. Returns true when a
    /// handler ran in place of the transfer.
    fn trap(&mut self, target: u16) -> bool {
        let Some(handler) = self.traps.get(target) else {
            return false;
        };

        tracing::debug!(address = %format_args!("{:04X}", target), "trap");
        match handler(self) {
            TrapAction::Resume => {}
            TrapAction::Stop => self.stop(),
        }
        true
    }
}
