//! 8080 register and flag file.
//!
//! The 8080 has seven 8-bit registers (B, C, D, E, H, L and the accumulator A),
//! a 16-bit program counter and stack pointer, and five condition flags.
//! B/C, D/E and H/L pair up into 16-bit views; H/L also addresses the
//! memory-indirect pseudo-register M, which is resolved by the CPU since it
//! needs memory.

use serde::{Serialize, Deserialize};

/// An 8-bit register operand, in the order of its 3-bit opcode encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reg {
    B,
    C,
    D,
    E,
    H,
    L,
    /// Memory at the address held in HL.
    M,
    A,
}

impl Reg {
    /// All operands in encoding order.
    pub const ALL: [Reg; 8] = [Reg::B, Reg::C, Reg::D, Reg::E, Reg::H, Reg::L, Reg::M, Reg::A];

    /// Decode from the low three bits of `bits`.
    #[inline]
    pub fn from_bits(bits: u8) -> Self {
        Self::ALL[(bits & 0b111) as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            Reg::B => "B",
            Reg::C => "C",
            Reg::D => "D",
            Reg::E => "E",
            Reg::H => "H",
            Reg::L => "L",
            Reg::M => "M",
            Reg::A => "A",
        }
    }
}

/// A 16-bit register pair as encoded in LXI/INX/DCX/DAD (bits 5..4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pair {
    BC,
    DE,
    HL,
    SP,
}

impl Pair {
    #[inline]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Pair::BC,
            1 => Pair::DE,
            2 => Pair::HL,
            _ => Pair::SP,
        }
    }
}

/// A 16-bit register pair as encoded in PUSH/POP, where SP is replaced by PSW.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackPair {
    BC,
    DE,
    HL,
    /// Accumulator (high byte) and packed flags (low byte).
    PSW,
}

impl StackPair {
    #[inline]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => StackPair::BC,
            1 => StackPair::DE,
            2 => StackPair::HL,
            _ => StackPair::PSW,
        }
    }
}

/// The five 8080 condition flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flags {
    /// Bit 7 of the last result.
    pub sign: bool,
    /// Last result was zero.
    pub zero: bool,
    /// Carry out of bit 3 (used by DAA).
    pub aux_carry: bool,
    /// Last result had an even number of set bits.
    pub parity: bool,
    /// Carry out of bit 7 (or borrow, for subtraction).
    pub carry: bool,
}

impl Flags {
    pub const SIGN: u8 = 0b1000_0000;
    pub const ZERO: u8 = 0b0100_0000;
    pub const AUX_CARRY: u8 = 0b0001_0000;
    pub const PARITY: u8 = 0b0000_0100;
    /// Bit 1 always reads as one.
    pub const ALWAYS_ONE: u8 = 0b0000_0010;
    pub const CARRY: u8 = 0b0000_0001;

    /// Pack into the PSW low byte.
    pub fn to_byte(self) -> u8 {
        let mut byte = Self::ALWAYS_ONE;
        if self.sign { byte |= Self::SIGN; }
        if self.zero { byte |= Self::ZERO; }
        if self.aux_carry { byte |= Self::AUX_CARRY; }
        if self.parity { byte |= Self::PARITY; }
        if self.carry { byte |= Self::CARRY; }
        byte
    }

    /// Unpack a PSW low byte. Bits 1, 3 and 5 are ignored.
    pub fn from_byte(byte: u8) -> Self {
        Self {
            sign: byte & Self::SIGN != 0,
            zero: byte & Self::ZERO != 0,
            aux_carry: byte & Self::AUX_CARRY != 0,
            parity: byte & Self::PARITY != 0,
            carry: byte & Self::CARRY != 0,
        }
    }

    /// Set sign, zero and parity from a result byte.
    #[inline]
    pub fn set_szp(&mut self, value: u8) {
        self.sign = value & 0x80 != 0;
        self.zero = value == 0;
        self.parity = parity(value);
    }
}

/// True iff `value` has an even number of set bits.
#[inline]
pub fn parity(value: u8) -> bool {
    value.count_ones() % 2 == 0
}

/// The 8080 register file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    /// Accumulator.
    pub a: u8,
    /// Program counter.
    pub pc: u16,
    /// Stack pointer.
    pub sp: u16,
    pub flags: Flags,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers and flags to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }

    pub fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }

    pub fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }

    pub fn set_bc(&mut self, value: u16) {
        [self.b, self.c] = value.to_be_bytes();
    }

    pub fn set_de(&mut self, value: u16) {
        [self.d, self.e] = value.to_be_bytes();
    }

    pub fn set_hl(&mut self, value: u16) {
        [self.h, self.l] = value.to_be_bytes();
    }

    /// Accumulator and packed flags as one word.
    pub fn psw(&self) -> u16 {
        u16::from_be_bytes([self.a, self.flags.to_byte()])
    }

    pub fn set_psw(&mut self, value: u16) {
        let [a, flags] = value.to_be_bytes();
        self.a = a;
        self.flags = Flags::from_byte(flags);
    }

    pub fn pair(&self, pair: Pair) -> u16 {
        match pair {
            Pair::BC => self.bc(),
            Pair::DE => self.de(),
            Pair::HL => self.hl(),
            Pair::SP => self.sp,
        }
    }

    pub fn set_pair(&mut self, pair: Pair, value: u16) {
        match pair {
            Pair::BC => self.set_bc(value),
            Pair::DE => self.set_de(value),
            Pair::HL => self.set_hl(value),
            Pair::SP => self.sp = value,
        }
    }

    pub fn stack_pair(&self, pair: StackPair) -> u16 {
        match pair {
            StackPair::BC => self.bc(),
            StackPair::DE => self.de(),
            StackPair::HL => self.hl(),
            StackPair::PSW => self.psw(),
        }
    }

    pub fn set_stack_pair(&mut self, pair: StackPair, value: u16) {
        match pair {
            StackPair::BC => self.set_bc(value),
            StackPair::DE => self.set_de(value),
            StackPair::HL => self.set_hl(value),
            StackPair::PSW => self.set_psw(value),
        }
    }

    /// Increment the program counter by 1, wrapping.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }
}
