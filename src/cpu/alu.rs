//! Arithmetic/logic unit.
//!
//! Pure functions computing 8080 results and condition flags. None of them
//! touch the machine: each takes its operands plus the flag set it reads
//! and updates, and returns the result. Carry and borrow variants are
//! separate functions rather than flags on a shared one.

use crate::cpu::registers::Flags;
use serde::{Serialize, Deserialize};

/// Accumulator operations encoded in bits 5..3 of the `10xxxsss` register
/// group and the `11xxx110` immediate group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbb,
    And,
    Xor,
    Or,
    Cmp,
}

impl AluOp {
    pub const ALL: [AluOp; 8] = [
        AluOp::Add, AluOp::Adc, AluOp::Sub, AluOp::Sbb,
        AluOp::And, AluOp::Xor, AluOp::Or, AluOp::Cmp,
    ];

    /// Decode from bits 5..3 of an opcode.
    #[inline]
    pub fn from_opcode(opcode: u8) -> Self {
        Self::ALL[((opcode >> 3) & 0b111) as usize]
    }

    /// Apply to the accumulator, returning its new value.
    /// `Cmp` returns the accumulator unchanged.
    pub fn apply(self, flags: &mut Flags, acc: u8, operand: u8) -> u8 {
        match self {
            AluOp::Add => add(flags, acc, operand),
            AluOp::Adc => adc(flags, acc, operand),
            AluOp::Sub => sub(flags, acc, operand),
            AluOp::Sbb => sbb(flags, acc, operand),
            AluOp::And => and(flags, acc, operand),
            AluOp::Xor => xor(flags, acc, operand),
            AluOp::Or => or(flags, acc, operand),
            AluOp::Cmp => {
                cmp(flags, acc, operand);
                acc
            }
        }
    }
}

fn add_with_carry(flags: &mut Flags, acc: u8, operand: u8, carry_in: bool) -> u8 {
    let cin = carry_in as u16;
    let sum = acc as u16 + operand as u16 + cin;
    let result = sum as u8;

    flags.aux_carry = (acc & 0x0F) as u16 + (operand & 0x0F) as u16 + cin > 0x0F;
    flags.carry = sum > 0xFF;
    flags.set_szp(result);
    result
}

// Computed as acc + !operand + 1 (- borrow); carry is the inverted carry out.
fn sub_with_borrow(flags: &mut Flags, acc: u8, operand: u8, borrow_in: bool) -> u8 {
    let result = add_with_carry(flags, acc, !operand, !borrow_in);
    flags.carry = !flags.carry;
    result
}

/// ADD: `acc + operand`.
pub fn add(flags: &mut Flags, acc: u8, operand: u8) -> u8 {
    add_with_carry(flags, acc, operand, false)
}

/// ADC: `acc + operand + carry`.
pub fn adc(flags: &mut Flags, acc: u8, operand: u8) -> u8 {
    let carry = flags.carry;
    add_with_carry(flags, acc, operand, carry)
}

/// SUB: `acc - operand`. Carry is set on borrow.
pub fn sub(flags: &mut Flags, acc: u8, operand: u8) -> u8 {
    sub_with_borrow(flags, acc, operand, false)
}

/// SBB: `acc - operand - carry`.
pub fn sbb(flags: &mut Flags, acc: u8, operand: u8) -> u8 {
    let borrow = flags.carry;
    sub_with_borrow(flags, acc, operand, borrow)
}

/// CMP: flags of `acc - operand`, result discarded.
pub fn cmp(flags: &mut Flags, acc: u8, operand: u8) {
    sub_with_borrow(flags, acc, operand, false);
}

/// ANA: bitwise and. Aux carry takes bit 3 of `acc | operand`, as on the 8080.
pub fn and(flags: &mut Flags, acc: u8, operand: u8) -> u8 {
    let result = acc & operand;
    flags.carry = false;
    flags.aux_carry = (acc | operand) & 0x08 != 0;
    flags.set_szp(result);
    result
}

/// ORA: bitwise or. Clears carry and aux carry.
pub fn or(flags: &mut Flags, acc: u8, operand: u8) -> u8 {
    let result = acc | operand;
    flags.carry = false;
    flags.aux_carry = false;
    flags.set_szp(result);
    result
}

/// XRA: bitwise exclusive or. Clears carry and aux carry.
pub fn xor(flags: &mut Flags, acc: u8, operand: u8) -> u8 {
    let result = acc ^ operand;
    flags.carry = false;
    flags.aux_carry = false;
    flags.set_szp(result);
    result
}

/// INR: increment; carry is left alone.
pub fn inr(flags: &mut Flags, value: u8) -> u8 {
    let result = value.wrapping_add(1);
    flags.aux_carry = result & 0x0F == 0;
    flags.set_szp(result);
    result
}

/// DCR: decrement; carry is left alone. Aux carry is set unless bit 3 borrowed.
pub fn dcr(flags: &mut Flags, value: u8) -> u8 {
    let result = value.wrapping_sub(1);
    flags.aux_carry = result & 0x0F != 0x0F;
    flags.set_szp(result);
    result
}

/// DAD: 16-bit add into HL. Only carry changes.
pub fn dad(flags: &mut Flags, hl: u16, operand: u16) -> u16 {
    let (result, carry) = hl.overflowing_add(operand);
    flags.carry = carry;
    result
}

/// RLC: rotate left; bit 7 goes to carry and bit 0.
pub fn rlc(flags: &mut Flags, acc: u8) -> u8 {
    flags.carry = acc & 0x80 != 0;
    acc.rotate_left(1)
}

/// RRC: rotate right; bit 0 goes to carry and bit 7.
pub fn rrc(flags: &mut Flags, acc: u8) -> u8 {
    flags.carry = acc & 0x01 != 0;
    acc.rotate_right(1)
}

/// RAL: rotate left through carry.
pub fn ral(flags: &mut Flags, acc: u8) -> u8 {
    let carry_in = flags.carry as u8;
    flags.carry = acc & 0x80 != 0;
    (acc << 1) | carry_in
}

/// RAR: rotate right through carry.
pub fn rar(flags: &mut Flags, acc: u8) -> u8 {
    let carry_in = flags.carry as u8;
    flags.carry = acc & 0x01 != 0;
    (acc >> 1) | (carry_in << 7)
}

/// DAA: decimal-adjust the accumulator after a BCD addition.
///
/// The low and high corrections are independent; the high one inspects the
/// accumulator after the low one has been applied. A set carry is never cleared.
pub fn daa(flags: &mut Flags, acc: u8) -> u8 {
    let mut result = acc;

    if result & 0x0F > 9 || flags.aux_carry {
        result = result.wrapping_add(0x06);
        flags.aux_carry = true;
    } else {
        flags.aux_carry = false;
    }

    if result >> 4 > 9 || flags.carry {
        let (adjusted, carry) = result.overflowing_add(0x60);
        result = adjusted;
        flags.carry |= carry;
    }

    flags.set_szp(result);
    result
}
