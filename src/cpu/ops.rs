//! Instruction handlers.
//!
//! Each handler has the [`Handler`](crate::cpu::decode::Handler) signature and
//! is referenced from the opcode table. PC already points past the opcode
//! byte when a handler runs; handlers fetch their own operand bytes.

use crate::cpu::alu::{self, AluOp};
use crate::cpu::control::Condition;
use crate::cpu::decode::lookup;
use crate::cpu::registers::{Pair, Reg, StackPair};
use crate::cpu::Cpu;

// ==================== Special ====================

pub(crate) fn nop(_cpu: &mut Cpu, _op: u8) {}

pub(crate) fn hlt(cpu: &mut Cpu, _op: u8) {
    cpu.halt();
}

/// Consumes the operand bytes and reports the opcode.
pub(crate) fn unimplemented(cpu: &mut Cpu, op: u8) {
    let address = cpu.regs.pc.wrapping_sub(1);
    for _ in 1..lookup(op).size {
        cpu.fetch_byte();
    }
    cpu.report_unimplemented(address, op);
}

pub(crate) fn ei(cpu: &mut Cpu, _op: u8) {
    cpu.interrupts_enabled = true;
}

pub(crate) fn di(cpu: &mut Cpu, _op: u8) {
    cpu.interrupts_enabled = false;
}

// ==================== Data Transfer ====================

pub(crate) fn mov(cpu: &mut Cpu, op: u8) {
    let value = cpu.reg(Reg::from_bits(op));
    cpu.set_reg(Reg::from_bits(op >> 3), value);
}

pub(crate) fn mvi(cpu: &mut Cpu, op: u8) {
    let value = cpu.fetch_byte();
    cpu.set_reg(Reg::from_bits(op >> 3), value);
}

pub(crate) fn lxi(cpu: &mut Cpu, op: u8) {
    let value = cpu.fetch_word();
    cpu.regs.set_pair(Pair::from_bits(op >> 4), value);
}

// STAX/LDAX only exist for BC (bit 4 clear) and DE.
fn indirect_address(cpu: &Cpu, op: u8) -> u16 {
    if op & 0x10 == 0 { cpu.regs.bc() } else { cpu.regs.de() }
}

pub(crate) fn stax(cpu: &mut Cpu, op: u8) {
    let addr = indirect_address(cpu, op);
    cpu.mem.write(addr, cpu.regs.a);
}

pub(crate) fn ldax(cpu: &mut Cpu, op: u8) {
    let addr = indirect_address(cpu, op);
    cpu.regs.a = cpu.mem.read(addr);
}

pub(crate) fn sta(cpu: &mut Cpu, _op: u8) {
    let addr = cpu.fetch_word();
    cpu.mem.write(addr, cpu.regs.a);
}

pub(crate) fn lda(cpu: &mut Cpu, _op: u8) {
    let addr = cpu.fetch_word();
    cpu.regs.a = cpu.mem.read(addr);
}

pub(crate) fn shld(cpu: &mut Cpu, _op: u8) {
    let addr = cpu.fetch_word();
    cpu.mem.write_word(addr, cpu.regs.hl());
}

pub(crate) fn lhld(cpu: &mut Cpu, _op: u8) {
    let addr = cpu.fetch_word();
    let value = cpu.mem.read_word(addr);
    cpu.regs.set_hl(value);
}

pub(crate) fn xchg(cpu: &mut Cpu, _op: u8) {
    let de = cpu.regs.de();
    let hl = cpu.regs.hl();
    cpu.regs.set_de(hl);
    cpu.regs.set_hl(de);
}

// ==================== Arithmetic / Logic ====================

pub(crate) fn alu_reg(cpu: &mut Cpu, op: u8) {
    let operand = cpu.reg(Reg::from_bits(op));
    accumulate(cpu, AluOp::from_opcode(op), operand);
}

pub(crate) fn alu_imm(cpu: &mut Cpu, op: u8) {
    let operand = cpu.fetch_byte();
    accumulate(cpu, AluOp::from_opcode(op), operand);
}

fn accumulate(cpu: &mut Cpu, alu_op: AluOp, operand: u8) {
    cpu.regs.a = alu_op.apply(&mut cpu.regs.flags, cpu.regs.a, operand);
}

pub(crate) fn inr(cpu: &mut Cpu, op: u8) {
    let reg = Reg::from_bits(op >> 3);
    let value = cpu.reg(reg);
    let value = alu::inr(&mut cpu.regs.flags, value);
    cpu.set_reg(reg, value);
}

pub(crate) fn dcr(cpu: &mut Cpu, op: u8) {
    let reg = Reg::from_bits(op >> 3);
    let value = cpu.reg(reg);
    let value = alu::dcr(&mut cpu.regs.flags, value);
    cpu.set_reg(reg, value);
}

/// Pair increments never touch flags.
pub(crate) fn inx(cpu: &mut Cpu, op: u8) {
    let pair = Pair::from_bits(op >> 4);
    let value = cpu.regs.pair(pair).wrapping_add(1);
    cpu.regs.set_pair(pair, value);
}

pub(crate) fn dcx(cpu: &mut Cpu, op: u8) {
    let pair = Pair::from_bits(op >> 4);
    let value = cpu.regs.pair(pair).wrapping_sub(1);
    cpu.regs.set_pair(pair, value);
}

pub(crate) fn dad(cpu: &mut Cpu, op: u8) {
    let operand = cpu.regs.pair(Pair::from_bits(op >> 4));
    let hl = cpu.regs.hl();
    let value = alu::dad(&mut cpu.regs.flags, hl, operand);
    cpu.regs.set_hl(value);
}

pub(crate) fn daa(cpu: &mut Cpu, _op: u8) {
    cpu.regs.a = alu::daa(&mut cpu.regs.flags, cpu.regs.a);
}

pub(crate) fn cma(cpu: &mut Cpu, _op: u8) {
    cpu.regs.a = !cpu.regs.a;
}

pub(crate) fn stc(cpu: &mut Cpu, _op: u8) {
    cpu.regs.flags.carry = true;
}

pub(crate) fn cmc(cpu: &mut Cpu, _op: u8) {
    cpu.regs.flags.carry = !cpu.regs.flags.carry;
}

// ==================== Rotate ====================

pub(crate) fn rlc(cpu: &mut Cpu, _op: u8) {
    cpu.regs.a = alu::rlc(&mut cpu.regs.flags, cpu.regs.a);
}

pub(crate) fn rrc(cpu: &mut Cpu, _op: u8) {
    cpu.regs.a = alu::rrc(&mut cpu.regs.flags, cpu.regs.a);
}

pub(crate) fn ral(cpu: &mut Cpu, _op: u8) {
    cpu.regs.a = alu::ral(&mut cpu.regs.flags, cpu.regs.a);
}

pub(crate) fn rar(cpu: &mut Cpu, _op: u8) {
    cpu.regs.a = alu::rar(&mut cpu.regs.flags, cpu.regs.a);
}

// ==================== Stack ====================

pub(crate) fn push(cpu: &mut Cpu, op: u8) {
    let value = cpu.regs.stack_pair(StackPair::from_bits(op >> 4));
    cpu.push_word(value);
}

pub(crate) fn pop(cpu: &mut Cpu, op: u8) {
    let value = cpu.pop_word();
    cpu.regs.set_stack_pair(StackPair::from_bits(op >> 4), value);
}

/// Exchange HL with the word on top of the stack.
pub(crate) fn xthl(cpu: &mut Cpu, _op: u8) {
    let sp = cpu.regs.sp;
    let top = cpu.mem.read_word(sp);
    cpu.mem.write_word(sp, cpu.regs.hl());
    cpu.regs.set_hl(top);
}

pub(crate) fn sphl(cpu: &mut Cpu, _op: u8) {
    cpu.regs.sp = cpu.regs.hl();
}

// ==================== Control Flow ====================

pub(crate) fn jmp(cpu: &mut Cpu, _op: u8) {
    cpu.jump(true);
}

pub(crate) fn jmp_cond(cpu: &mut Cpu, op: u8) {
    let taken = Condition::from_opcode(op).holds(&cpu.regs.flags);
    cpu.jump(taken);
}

pub(crate) fn call(cpu: &mut Cpu, _op: u8) {
    cpu.call(true);
}

pub(crate) fn call_cond(cpu: &mut Cpu, op: u8) {
    let taken = Condition::from_opcode(op).holds(&cpu.regs.flags);
    cpu.call(taken);
}

pub(crate) fn ret(cpu: &mut Cpu, _op: u8) {
    cpu.ret(true);
}

pub(crate) fn ret_cond(cpu: &mut Cpu, op: u8) {
    let taken = Condition::from_opcode(op).holds(&cpu.regs.flags);
    cpu.ret(taken);
}

pub(crate) fn rst(cpu: &mut Cpu, op: u8) {
    cpu.restart((op >> 3) & 0b111);
}

pub(crate) fn pchl(cpu: &mut Cpu, _op: u8) {
    cpu.regs.pc = cpu.regs.hl();
}

#[cfg(test)]
mod tests {
    use crate::cpu::registers::Flags;
    use crate::cpu::Cpu;

    /// Load `program` at 0 and run it to the end of the image.
    fn run(program: &[u8], setup: impl FnOnce(&mut Cpu)) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_program(0, program).unwrap();
        setup(&mut cpu);
        cpu.run().unwrap();
        cpu
    }

    #[test]
    fn test_adc_c_reference() {
        let cpu = run(&[0x89], |cpu| {
            cpu.regs.c = 0x3D;
            cpu.regs.a = 0x42;
            cpu.regs.flags.carry = true;
        });

        assert_eq!(cpu.regs.a, 0x80);
        assert!(cpu.regs.flags.aux_carry);
        assert!(!cpu.regs.flags.carry);
        assert!(cpu.regs.flags.sign);
        assert!(!cpu.regs.flags.zero);
        assert!(!cpu.regs.flags.parity);
    }

    #[test]
    fn test_add_d() {
        let cpu = run(&[0x82], |cpu| {
            cpu.regs.d = 0x2E;
            cpu.regs.a = 0x6C;
        });

        assert_eq!(cpu.regs.a, 0x9A);
        assert!(cpu.regs.flags.sign);
        assert!(cpu.regs.flags.parity);
    }

    #[test]
    fn test_sub_a_and_sbb_l() {
        let cpu = run(&[0x97], |cpu| cpu.regs.a = 0x3E);
        assert_eq!(cpu.regs.a, 0);
        assert!(cpu.regs.flags.zero);
        assert!(!cpu.regs.flags.carry);

        let cpu = run(&[0x9D], |cpu| {
            cpu.regs.l = 0x02;
            cpu.regs.a = 0x04;
            cpu.regs.flags.carry = true;
        });
        assert_eq!(cpu.regs.a, 0x01);
    }

    #[test]
    fn test_ana_ora_xra() {
        let cpu = run(&[0xA1], |cpu| {
            cpu.regs.a = 0xFC;
            cpu.regs.c = 0x0F;
        });
        assert_eq!(cpu.regs.a, 0x0C);

        let cpu = run(&[0xB1], |cpu| {
            cpu.regs.a = 0x33;
            cpu.regs.c = 0x0F;
        });
        assert_eq!(cpu.regs.a, 0x3F);

        let cpu = run(&[0xA8], |cpu| {
            cpu.regs.a = 0x5C;
            cpu.regs.b = 0x78;
        });
        assert_eq!(cpu.regs.a, 0x24);
    }

    #[test]
    fn test_immediate_alu_consumes_operand() {
        // ADI 10, SUI 05, CPI 0B, ANI 0F, ORI 30, XRI 01
        let cpu = run(&[0xC6, 0x10, 0xD6, 0x05, 0xFE, 0x0B, 0xE6, 0x0F, 0xF6, 0x30, 0xEE, 0x01], |cpu| {
            cpu.regs.a = 0x00;
        });

        assert_eq!(cpu.regs.a, 0x3A);
        assert_eq!(cpu.regs.pc, 12);
    }

    #[test]
    fn test_aci_sbi_use_carry() {
        let cpu = run(&[0xCE, 0x01], |cpu| cpu.regs.flags.carry = true);
        assert_eq!(cpu.regs.a, 0x02);

        let cpu = run(&[0xDE, 0x01], |cpu| {
            cpu.regs.a = 0x05;
            cpu.regs.flags.carry = true;
        });
        assert_eq!(cpu.regs.a, 0x03);
    }

    #[test]
    fn test_cmp_m() {
        let cpu = run(&[0xBE], |cpu| {
            cpu.regs.set_hl(0x3000);
            cpu.mem.write(0x3000, 0x20);
            cpu.regs.a = 0x10;
        });

        assert_eq!(cpu.regs.a, 0x10);
        assert!(cpu.regs.flags.carry);
    }

    #[test]
    fn test_mov_between_registers_and_memory() {
        // MOV B,A; MOV M,B; MOV C,M
        let cpu = run(&[0x47, 0x70, 0x4E], |cpu| {
            cpu.regs.a = 0x77;
            cpu.regs.set_hl(0x4000);
        });

        assert_eq!(cpu.regs.b, 0x77);
        assert_eq!(cpu.mem.read(0x4000), 0x77);
        assert_eq!(cpu.regs.c, 0x77);
    }

    #[test]
    fn test_mvi_and_lxi() {
        // LXI H,2000; MVI M,AB; LXI SP,F000; MVI E,01
        let cpu = run(&[0x21, 0x00, 0x20, 0x36, 0xAB, 0x31, 0x00, 0xF0, 0x1E, 0x01], |_| {});

        assert_eq!(cpu.regs.hl(), 0x2000);
        assert_eq!(cpu.mem.read(0x2000), 0xAB);
        assert_eq!(cpu.regs.sp, 0xF000);
        assert_eq!(cpu.regs.e, 0x01);
    }

    #[test]
    fn test_direct_addressing() {
        // STA 3000; LDA 3001; SHLD 3002; LHLD 3004
        let cpu = run(&[0x32, 0x00, 0x30, 0x3A, 0x01, 0x30, 0x22, 0x02, 0x30, 0x2A, 0x04, 0x30], |cpu| {
            cpu.regs.a = 0x11;
            cpu.regs.set_hl(0xBEEF);
            cpu.mem.write(0x3001, 0x22);
            cpu.mem.write_word(0x3004, 0x1234);
        });

        assert_eq!(cpu.mem.read(0x3000), 0x11);
        assert_eq!(cpu.regs.a, 0x22);
        assert_eq!(cpu.mem.read(0x3002), 0xEF);
        assert_eq!(cpu.mem.read(0x3003), 0xBE);
        assert_eq!(cpu.regs.hl(), 0x1234);
    }

    #[test]
    fn test_stax_ldax() {
        // STAX B; LDAX D
        let cpu = run(&[0x02, 0x1A], |cpu| {
            cpu.regs.a = 0x5A;
            cpu.regs.set_bc(0x1000);
            cpu.regs.set_de(0x1100);
            cpu.mem.write(0x1100, 0xA5);
        });

        assert_eq!(cpu.mem.read(0x1000), 0x5A);
        assert_eq!(cpu.regs.a, 0xA5);
    }

    #[test]
    fn test_inr_dcr_memory() {
        // INR M; DCR B
        let cpu = run(&[0x34, 0x05], |cpu| {
            cpu.regs.set_hl(0x2000);
            cpu.mem.write(0x2000, 0x0F);
            cpu.regs.b = 0x01;
        });

        assert_eq!(cpu.mem.read(0x2000), 0x10);
        assert_eq!(cpu.regs.b, 0x00);
        assert!(cpu.regs.flags.zero);
    }

    #[test]
    fn test_inx_dcx_never_touch_flags() {
        let flags = Flags { sign: true, zero: false, aux_carry: true, parity: false, carry: true };

        let cpu = run(&[0x2B], |cpu| {
            cpu.regs.set_hl(0x9800);
            cpu.regs.flags = flags;
        });
        assert_eq!(cpu.regs.hl(), 0x97FF);
        assert_eq!(cpu.regs.flags, flags);

        // INX B wrapping, DCX SP wrapping
        let cpu = run(&[0x03, 0x3B], |cpu| {
            cpu.regs.set_bc(0xFFFF);
            cpu.regs.sp = 0x0000;
            cpu.regs.flags = Flags::default();
        });
        assert_eq!(cpu.regs.bc(), 0x0000);
        assert_eq!(cpu.regs.sp, 0xFFFF);
        assert_eq!(cpu.regs.flags, Flags::default());
    }

    #[test]
    fn test_dad_h() {
        let cpu = run(&[0x29], |cpu| cpu.regs.set_hl(0xFFFF));

        assert_eq!(cpu.regs.hl(), 0xFFFE);
        assert!(cpu.regs.flags.carry);
        assert!(!cpu.regs.flags.zero);
        assert!(!cpu.regs.flags.sign);
    }

    #[test]
    fn test_dad_sp() {
        let cpu = run(&[0x39], |cpu| {
            cpu.regs.set_hl(0x1000);
            cpu.regs.sp = 0x0234;
        });

        assert_eq!(cpu.regs.hl(), 0x1234);
        assert!(!cpu.regs.flags.carry);
    }

    #[test]
    fn test_daa_reference() {
        let cpu = run(&[0x27], |cpu| cpu.regs.a = 0x9B);

        assert_eq!(cpu.regs.a, 0x01);
        assert!(cpu.regs.flags.carry);
        assert!(cpu.regs.flags.aux_carry);
    }

    #[test]
    fn test_cma_stc_cmc() {
        let cpu = run(&[0x2F, 0x37, 0x3F, 0x3F], |cpu| cpu.regs.a = 0x51);

        assert_eq!(cpu.regs.a, 0xAE);
        assert!(cpu.regs.flags.carry);
    }

    #[test]
    fn test_rotate_instructions() {
        let cpu = run(&[0x07], |cpu| cpu.regs.a = 0xF2);
        assert_eq!(cpu.regs.a, 0xE5);
        assert!(cpu.regs.flags.carry);

        let cpu = run(&[0x1F], |cpu| {
            cpu.regs.a = 0x6A;
            cpu.regs.flags.carry = true;
        });
        assert_eq!(cpu.regs.a, 0xB5);
        assert!(!cpu.regs.flags.carry);
    }

    #[test]
    fn test_push_pop_psw() {
        // PUSH PSW; POP B
        let cpu = run(&[0xF5, 0xC1], |cpu| {
            cpu.regs.sp = 0x2000;
            cpu.regs.a = 0x42;
            cpu.regs.flags = Flags { sign: true, zero: false, aux_carry: false, parity: true, carry: true };
        });

        assert_eq!(cpu.regs.b, 0x42);
        assert_eq!(cpu.regs.c, 0b1000_0111);
        assert_eq!(cpu.regs.sp, 0x2000);
    }

    #[test]
    fn test_pop_psw_restores_flags() {
        // POP PSW
        let cpu = run(&[0xF1], |cpu| {
            cpu.regs.sp = 0x2000;
            cpu.mem.write_word(0x2000, 0x9941);
        });

        assert_eq!(cpu.regs.a, 0x99);
        assert!(cpu.regs.flags.zero);
        assert!(cpu.regs.flags.carry);
        assert!(!cpu.regs.flags.sign);
        assert_eq!(cpu.regs.sp, 0x2002);
    }

    #[test]
    fn test_xthl_sphl_xchg_pchl() {
        // XTHL
        let cpu = run(&[0xE3], |cpu| {
            cpu.regs.sp = 0x10AD;
            cpu.mem.write_word(0x10AD, 0x0DF0);
            cpu.regs.set_hl(0x0B3C);
        });
        assert_eq!(cpu.regs.hl(), 0x0DF0);
        assert_eq!(cpu.mem.read_word(0x10AD), 0x0B3C);
        assert_eq!(cpu.regs.sp, 0x10AD);

        // SPHL; XCHG
        let cpu = run(&[0xF9, 0xEB], |cpu| {
            cpu.regs.set_hl(0x506C);
            cpu.regs.set_de(0x1234);
        });
        assert_eq!(cpu.regs.sp, 0x506C);
        assert_eq!(cpu.regs.de(), 0x506C);
        assert_eq!(cpu.regs.hl(), 0x1234);

        // PCHL
        let cpu = run(&[0xE9], |cpu| cpu.regs.set_hl(0x413E));
        assert_eq!(cpu.regs.pc, 0x413E);
    }

    #[test]
    fn test_ei_di() {
        let cpu = run(&[0xFB], |_| {});
        assert!(cpu.interrupts_enabled);

        let cpu = run(&[0xFB, 0xF3], |_| {});
        assert!(!cpu.interrupts_enabled);
    }

    #[test]
    fn test_undocumented_aliases() {
        // *NOP at 0x08; *JMP 0x0100
        let cpu = run(&[0x08, 0xCB, 0x00, 0x01], |_| {});
        assert_eq!(cpu.regs.pc, 0x0100);
        assert!(cpu.diagnostics().is_empty());

        // *CALL 0x0100
        let cpu = run(&[0xDD, 0x00, 0x01], |cpu| cpu.regs.sp = 0x2000);
        assert_eq!(cpu.regs.pc, 0x0100);
        assert_eq!(cpu.mem.read_word(0x1FFE), 0x0003);

        // *RET
        let cpu = run(&[0xD9], |cpu| {
            cpu.regs.sp = 0x2000;
            cpu.mem.write_word(0x2000, 0x0400);
        });
        assert_eq!(cpu.regs.pc, 0x0400);
    }
}
