//! Instruction decoder for the 8080.
//!
//! A single 256-entry table maps every opcode byte to its mnemonic, its
//! size in bytes (opcode plus 0–2 operand bytes) and the handler that
//! executes it. Execution, tracing and disassembly all read this table.
//!
//! Every byte value has a defined behavior. The undocumented aliases act
//! like the documented instruction they shadow and are marked with `*`.
//! `IN` and `OUT` are the only stubs: they consume their port operand and
//! are reported as unimplemented.

use crate::cpu::memory::Memory;
use crate::cpu::ops;
use crate::cpu::Cpu;
use serde::{Serialize, Deserialize};

/// Executes one instruction. Receives the opcode byte so that grouped
/// instructions can pull their register fields out of it.
pub type Handler = fn(&mut Cpu, u8);

/// Static description of one opcode.
#[derive(Debug, Clone, Copy)]
pub struct Opcode {
    /// Mnemonic including register operands, e.g. `"MOV B,C"` or `"MVI A"`.
    pub mnemonic: &'static str,
    /// Total size in bytes, 1–3.
    pub size: u8,
    /// The handler; it consumes its own operand bytes.
    pub execute: Handler,
    /// False for the I/O stubs.
    pub implemented: bool,
}

const fn op(mnemonic: &'static str, size: u8, execute: Handler) -> Opcode {
    Opcode { mnemonic, size, execute, implemented: true }
}

const fn stub(mnemonic: &'static str, size: u8) -> Opcode {
    Opcode { mnemonic, size, execute: ops::unimplemented, implemented: false }
}

/// The opcode table, indexed by opcode byte.
pub static OPCODE_TABLE: [Opcode; 256] = [
    /* 00 */ op("NOP", 1, ops::nop),
    /* 01 */ op("LXI B", 3, ops::lxi),
    /* 02 */ op("STAX B", 1, ops::stax),
    /* 03 */ op("INX B", 1, ops::inx),
    /* 04 */ op("INR B", 1, ops::inr),
    /* 05 */ op("DCR B", 1, ops::dcr),
    /* 06 */ op("MVI B", 2, ops::mvi),
    /* 07 */ op("RLC", 1, ops::rlc),
    /* 08 */ op("*NOP", 1, ops::nop),
    /* 09 */ op("DAD B", 1, ops::dad),
    /* 0A */ op("LDAX B", 1, ops::ldax),
    /* 0B */ op("DCX B", 1, ops::dcx),
    /* 0C */ op("INR C", 1, ops::inr),
    /* 0D */ op("DCR C", 1, ops::dcr),
    /* 0E */ op("MVI C", 2, ops::mvi),
    /* 0F */ op("RRC", 1, ops::rrc),
    /* 10 */ op("*NOP", 1, ops::nop),
    /* 11 */ op("LXI D", 3, ops::lxi),
    /* 12 */ op("STAX D", 1, ops::stax),
    /* 13 */ op("INX D", 1, ops::inx),
    /* 14 */ op("INR D", 1, ops::inr),
    /* 15 */ op("DCR D", 1, ops::dcr),
    /* 16 */ op("MVI D", 2, ops::mvi),
    /* 17 */ op("RAL", 1, ops::ral),
    /* 18 */ op("*NOP", 1, ops::nop),
    /* 19 */ op("DAD D", 1, ops::dad),
    /* 1A */ op("LDAX D", 1, ops::ldax),
    /* 1B */ op("DCX D", 1, ops::dcx),
    /* 1C */ op("INR E", 1, ops::inr),
    /* 1D */ op("DCR E", 1, ops::dcr),
    /* 1E */ op("MVI E", 2, ops::mvi),
    /* 1F */ op("RAR", 1, ops::rar),
    /* 20 */ op("*NOP", 1, ops::nop),
    /* 21 */ op("LXI H", 3, ops::lxi),
    /* 22 */ op("SHLD", 3, ops::shld),
    /* 23 */ op("INX H", 1, ops::inx),
    /* 24 */ op("INR H", 1, ops::inr),
    /* 25 */ op("DCR H", 1, ops::dcr),
    /* 26 */ op("MVI H", 2, ops::mvi),
    /* 27 */ op("DAA", 1, ops::daa),
    /* 28 */ op("*NOP", 1, ops::nop),
    /* 29 */ op("DAD H", 1, ops::dad),
    /* 2A */ op("LHLD", 3, ops::lhld),
    /* 2B */ op("DCX H", 1, ops::dcx),
    /* 2C */ op("INR L", 1, ops::inr),
    /* 2D */ op("DCR L", 1, ops::dcr),
    /* 2E */ op("MVI L", 2, ops::mvi),
    /* 2F */ op("CMA", 1, ops::cma),
    /* 30 */ op("*NOP", 1, ops::nop),
    /* 31 */ op("LXI SP", 3, ops::lxi),
    /* 32 */ op("STA", 3, ops::sta),
    /* 33 */ op("INX SP", 1, ops::inx),
    /* 34 */ op("INR M", 1, ops::inr),
    /* 35 */ op("DCR M", 1, ops::dcr),
    /* 36 */ op("MVI M", 2, ops::mvi),
    /* 37 */ op("STC", 1, ops::stc),
    /* 38 */ op("*NOP", 1, ops::nop),
    /* 39 */ op("DAD SP", 1, ops::dad),
    /* 3A */ op("LDA", 3, ops::lda),
    /* 3B */ op("DCX SP", 1, ops::dcx),
    /* 3C */ op("INR A", 1, ops::inr),
    /* 3D */ op("DCR A", 1, ops::dcr),
    /* 3E */ op("MVI A", 2, ops::mvi),
    /* 3F */ op("CMC", 1, ops::cmc),
    /* 40 */ op("MOV B,B", 1, ops::mov),
    /* 41 */ op("MOV B,C", 1, ops::mov),
    /* 42 */ op("MOV B,D", 1, ops::mov),
    /* 43 */ op("MOV B,E", 1, ops::mov),
    /* 44 */ op("MOV B,H", 1, ops::mov),
    /* 45 */ op("MOV B,L", 1, ops::mov),
    /* 46 */ op("MOV B,M", 1, ops::mov),
    /* 47 */ op("MOV B,A", 1, ops::mov),
    /* 48 */ op("MOV C,B", 1, ops::mov),
    /* 49 */ op("MOV C,C", 1, ops::mov),
    /* 4A */ op("MOV C,D", 1, ops::mov),
    /* 4B */ op("MOV C,E", 1, ops::mov),
    /* 4C */ op("MOV C,H", 1, ops::mov),
    /* 4D */ op("MOV C,L", 1, ops::mov),
    /* 4E */ op("MOV C,M", 1, ops::mov),
    /* 4F */ op("MOV C,A", 1, ops::mov),
    /* 50 */ op("MOV D,B", 1, ops::mov),
    /* 51 */ op("MOV D,C", 1, ops::mov),
    /* 52 */ op("MOV D,D", 1, ops::mov),
    /* 53 */ op("MOV D,E", 1, ops::mov),
    /* 54 */ op("MOV D,H", 1, ops::mov),
    /* 55 */ op("MOV D,L", 1, ops::mov),
    /* 56 */ op("MOV D,M", 1, ops::mov),
    /* 57 */ op("MOV D,A", 1, ops::mov),
    /* 58 */ op("MOV E,B", 1, ops::mov),
    /* 59 */ op("MOV E,C", 1, ops::mov),
    /* 5A */ op("MOV E,D", 1, ops::mov),
    /* 5B */ op("MOV E,E", 1, ops::mov),
    /* 5C */ op("MOV E,H", 1, ops::mov),
    /* 5D */ op("MOV E,L", 1, ops::mov),
    /* 5E */ op("MOV E,M", 1, ops::mov),
    /* 5F */ op("MOV E,A", 1, ops::mov),
    /* 60 */ op("MOV H,B", 1, ops::mov),
    /* 61 */ op("MOV H,C", 1, ops::mov),
    /* 62 */ op("MOV H,D", 1, ops::mov),
    /* 63 */ op("MOV H,E", 1, ops::mov),
    /* 64 */ op("MOV H,H", 1, ops::mov),
    /* 65 */ op("MOV H,L", 1, ops::mov),
    /* 66 */ op("MOV H,M", 1, ops::mov),
    /* 67 */ op("MOV H,A", 1, ops::mov),
    /* 68 */ op("MOV L,B", 1, ops::mov),
    /* 69 */ op("MOV L,C", 1, ops::mov),
    /* 6A */ op("MOV L,D", 1, ops::mov),
    /* 6B */ op("MOV L,E", 1, ops::mov),
    /* 6C */ op("MOV L,H", 1, ops::mov),
    /* 6D */ op("MOV L,L", 1, ops::mov),
    /* 6E */ op("MOV L,M", 1, ops::mov),
    /* 6F */ op("MOV L,A", 1, ops::mov),
    /* 70 */ op("MOV M,B", 1, ops::mov),
    /* 71 */ op("MOV M,C", 1, ops::mov),
    /* 72 */ op("MOV M,D", 1, ops::mov),
    /* 73 */ op("MOV M,E", 1, ops::mov),
    /* 74 */ op("MOV M,H", 1, ops::mov),
    /* 75 */ op("MOV M,L", 1, ops::mov),
    /* 76 */ op("HLT", 1, ops::hlt),
    /* 77 */ op("MOV M,A", 1, ops::mov),
    /* 78 */ op("MOV A,B", 1, ops::mov),
    /* 79 */ op("MOV A,C", 1, ops::mov),
    /* 7A */ op("MOV A,D", 1, ops::mov),
    /* 7B */ op("MOV A,E", 1, ops::mov),
    /* 7C */ op("MOV A,H", 1, ops::mov),
    /* 7D */ op("MOV A,L", 1, ops::mov),
    /* 7E */ op("MOV A,M", 1, ops::mov),
    /* 7F */ op("MOV A,A", 1, ops::mov),
    /* 80 */ op("ADD B", 1, ops::alu_reg),
    /* 81 */ op("ADD C", 1, ops::alu_reg),
    /* 82 */ op("ADD D", 1, ops::alu_reg),
    /* 83 */ op("ADD E", 1, ops::alu_reg),
    /* 84 */ op("ADD H", 1, ops::alu_reg),
    /* 85 */ op("ADD L", 1, ops::alu_reg),
    /* 86 */ op("ADD M", 1, ops::alu_reg),
    /* 87 */ op("ADD A", 1, ops::alu_reg),
    /* 88 */ op("ADC B", 1, ops::alu_reg),
    /* 89 */ op("ADC C", 1, ops::alu_reg),
    /* 8A */ op("ADC D", 1, ops::alu_reg),
    /* 8B */ op("ADC E", 1, ops::alu_reg),
    /* 8C */ op("ADC H", 1, ops::alu_reg),
    /* 8D */ op("ADC L", 1, ops::alu_reg),
    /* 8E */ op("ADC M", 1, ops::alu_reg),
    /* 8F */ op("ADC A", 1, ops::alu_reg),
    /* 90 */ op("SUB B", 1, ops::alu_reg),
    /* 91 */ op("SUB C", 1, ops::alu_reg),
    /* 92 */ op("SUB D", 1, ops::alu_reg),
    /* 93 */ op("SUB E", 1, ops::alu_reg),
    /* 94 */ op("SUB H", 1, ops::alu_reg),
    /* 95 */ op("SUB L", 1, ops::alu_reg),
    /* 96 */ op("SUB M", 1, ops::alu_reg),
    /* 97 */ op("SUB A", 1, ops::alu_reg),
    /* 98 */ op("SBB B", 1, ops::alu_reg),
    /* 99 */ op("SBB C", 1, ops::alu_reg),
    /* 9A */ op("SBB D", 1, ops::alu_reg),
    /* 9B */ op("SBB E", 1, ops::alu_reg),
    /* 9C */ op("SBB H", 1, ops::alu_reg),
    /* 9D */ op("SBB L", 1, ops::alu_reg),
    /* 9E */ op("SBB M", 1, ops::alu_reg),
    /* 9F */ op("SBB A", 1, ops::alu_reg),
    /* A0 */ op("ANA B", 1, ops::alu_reg),
    /* A1 */ op("ANA C", 1, ops::alu_reg),
    /* A2 */ op("ANA D", 1, ops::alu_reg),
    /* A3 */ op("ANA E", 1, ops::alu_reg),
    /* A4 */ op("ANA H", 1, ops::alu_reg),
    /* A5 */ op("ANA L", 1, ops::alu_reg),
    /* A6 */ op("ANA M", 1, ops::alu_reg),
    /* A7 */ op("ANA A", 1, ops::alu_reg),
    /* A8 */ op("XRA B", 1, ops::alu_reg),
    /* A9 */ op("XRA C", 1, ops::alu_reg),
    /* AA */ op("XRA D", 1, ops::alu_reg),
    /* AB */ op("XRA E", 1, ops::alu_reg),
    /* AC */ op("XRA H", 1, ops::alu_reg),
    /* AD */ op("XRA L", 1, ops::alu_reg),
    /* AE */ op("XRA M", 1, ops::alu_reg),
    /* AF */ op("XRA A", 1, ops::alu_reg),
    /* B0 */ op("ORA B", 1, ops::alu_reg),
    /* B1 */ op("ORA C", 1, ops::alu_reg),
    /* B2 */ op("ORA D", 1, ops::alu_reg),
    /* B3 */ op("ORA E", 1, ops::alu_reg),
    /* B4 */ op("ORA H", 1, ops::alu_reg),
    /* B5 */ op("ORA L", 1, ops::alu_reg),
    /* B6 */ op("ORA M", 1, ops::alu_reg),
    /* B7 */ op("ORA A", 1, ops::alu_reg),
    /* B8 */ op("CMP B", 1, ops::alu_reg),
    /* B9 */ op("CMP C", 1, ops::alu_reg),
    /* BA */ op("CMP D", 1, ops::alu_reg),
    /* BB */ op("CMP E", 1, ops::alu_reg),
    /* BC */ op("CMP H", 1, ops::alu_reg),
    /* BD */ op("CMP L", 1, ops::alu_reg),
    /* BE */ op("CMP M", 1, ops::alu_reg),
    /* BF */ op("CMP A", 1, ops::alu_reg),
    /* C0 */ op("RNZ", 1, ops::ret_cond),
    /* C1 */ op("POP B", 1, ops::pop),
    /* C2 */ op("JNZ", 3, ops::jmp_cond),
    /* C3 */ op("JMP", 3, ops::jmp),
    /* C4 */ op("CNZ", 3, ops::call_cond),
    /* C5 */ op("PUSH B", 1, ops::push),
    /* C6 */ op("ADI", 2, ops::alu_imm),
    /* C7 */ op("RST 0", 1, ops::rst),
    /* C8 */ op("RZ", 1, ops::ret_cond),
    /* C9 */ op("RET", 1, ops::ret),
    /* CA */ op("JZ", 3, ops::jmp_cond),
    /* CB */ op("*JMP", 3, ops::jmp),
    /* CC */ op("CZ", 3, ops::call_cond),
    /* CD */ op("CALL", 3, ops::call),
    /* CE */ op("ACI", 2, ops::alu_imm),
    /* CF */ op("RST 1", 1, ops::rst),
    /* D0 */ op("RNC", 1, ops::ret_cond),
    /* D1 */ op("POP D", 1, ops::pop),
    /* D2 */ op("JNC", 3, ops::jmp_cond),
    /* D3 */ stub("OUT", 2),
    /* D4 */ op("CNC", 3, ops::call_cond),
    /* D5 */ op("PUSH D", 1, ops::push),
    /* D6 */ op("SUI", 2, ops::alu_imm),
    /* D7 */ op("RST 2", 1, ops::rst),
    /* D8 */ op("RC", 1, ops::ret_cond),
    /* D9 */ op("*RET", 1, ops::ret),
    /* DA */ op("JC", 3, ops::jmp_cond),
    /* DB */ stub("IN", 2),
    /* DC */ op("CC", 3, ops::call_cond),
    /* DD */ op("*CALL", 3, ops::call),
    /* DE */ op("SBI", 2, ops::alu_imm),
    /* DF */ op("RST 3", 1, ops::rst),
    /* E0 */ op("RPO", 1, ops::ret_cond),
    /* E1 */ op("POP H", 1, ops::pop),
    /* E2 */ op("JPO", 3, ops::jmp_cond),
    /* E3 */ op("XTHL", 1, ops::xthl),
    /* E4 */ op("CPO", 3, ops::call_cond),
    /* E5 */ op("PUSH H", 1, ops::push),
    /* E6 */ op("ANI", 2, ops::alu_imm),
    /* E7 */ op("RST 4", 1, ops::rst),
    /* E8 */ op("RPE", 1, ops::ret_cond),
    /* E9 */ op("PCHL", 1, ops::pchl),
    /* EA */ op("JPE", 3, ops::jmp_cond),
    /* EB */ op("XCHG", 1, ops::xchg),
    /* EC */ op("CPE", 3, ops::call_cond),
    /* ED */ op("*CALL", 3, ops::call),
    /* EE */ op("XRI", 2, ops::alu_imm),
    /* EF */ op("RST 5", 1, ops::rst),
    /* F0 */ op("RP", 1, ops::ret_cond),
    /* F1 */ op("POP PSW", 1, ops::pop),
    /* F2 */ op("JP", 3, ops::jmp_cond),
    /* F3 */ op("DI", 1, ops::di),
    /* F4 */ op("CP", 3, ops::call_cond),
    /* F5 */ op("PUSH PSW", 1, ops::push),
    /* F6 */ op("ORI", 2, ops::alu_imm),
    /* F7 */ op("RST 6", 1, ops::rst),
    /* F8 */ op("RM", 1, ops::ret_cond),
    /* F9 */ op("SPHL", 1, ops::sphl),
    /* FA */ op("JM", 3, ops::jmp_cond),
    /* FB */ op("EI", 1, ops::ei),
    /* FC */ op("CM", 3, ops::call_cond),
    /* FD */ op("*CALL", 3, ops::call),
    /* FE */ op("CPI", 2, ops::alu_imm),
    /* FF */ op("RST 7", 1, ops::rst),
];

/// Look up the table entry for an opcode byte.
#[inline]
pub fn lookup(opcode: u8) -> &'static Opcode {
    &OPCODE_TABLE[opcode as usize]
}

/// Immediate operand of a decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    None,
    Byte(u8),
    Word(u16),
}

/// A decoded instruction at a given address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub address: u16,
    pub opcode: u8,
    pub operand: Operand,
}

impl Instruction {
    /// The table entry for this instruction.
    pub fn info(&self) -> &'static Opcode {
        lookup(self.opcode)
    }

    pub fn mnemonic(&self) -> &'static str {
        self.info().mnemonic
    }

    pub fn size(&self) -> u8 {
        self.info().size
    }

    /// Raw bytes of the instruction, opcode first.
    pub fn bytes(&self) -> Vec<u8> {
        let mut bytes = vec![self.opcode];
        match self.operand {
            Operand::None => {}
            Operand::Byte(b) => bytes.push(b),
            Operand::Word(w) => bytes.extend_from_slice(&w.to_le_bytes()),
        }
        bytes
    }
}

/// Decode the instruction at `address` without executing it.
/// Operand bytes past `0xFFFF` wrap to the bottom of memory.
pub fn decode(mem: &Memory, address: u16) -> Instruction {
    let opcode = mem.read(address);
    let operand = match lookup(opcode).size {
        2 => Operand::Byte(mem.read(address.wrapping_add(1))),
        3 => Operand::Word(mem.read_word(address.wrapping_add(1))),
        _ => Operand::None,
    };

    Instruction { address, opcode, operand }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_byte_has_an_entry() {
        for (opcode, entry) in OPCODE_TABLE.iter().enumerate() {
            assert!((1..=3).contains(&entry.size), "bad size for {:02X}", opcode);
            assert!(!entry.mnemonic.is_empty());
        }
    }

    #[test]
    fn test_only_io_is_unimplemented() {
        let stubs: Vec<usize> = (0..256).filter(|&op| !OPCODE_TABLE[op].implemented).collect();
        assert_eq!(stubs, vec![0xD3, 0xDB]);
    }

    #[test]
    fn test_documented_count() {
        let documented = OPCODE_TABLE.iter().filter(|e| !e.mnemonic.starts_with('*')).count();
        assert_eq!(documented, 244);
    }

    #[test]
    fn test_table_spot_checks() {
        assert_eq!(lookup(0x00).mnemonic, "NOP");
        assert_eq!(lookup(0x76).mnemonic, "HLT");
        assert_eq!(lookup(0x41).mnemonic, "MOV B,C");
        assert_eq!(lookup(0x89).mnemonic, "ADC C");
        assert_eq!(lookup(0xF5).mnemonic, "PUSH PSW");
        assert_eq!(lookup(0xFE).mnemonic, "CPI");
        assert_eq!(lookup(0xCB).mnemonic, "*JMP");
        assert_eq!(lookup(0x31).size, 3);
        assert_eq!(lookup(0x3E).size, 2);
        assert_eq!(lookup(0xCD).size, 3);
    }

    #[test]
    fn test_decode_operands() {
        let mut mem = Memory::new();
        mem.load(0x0100, &[0x21, 0x34, 0x12, 0x3E, 0x7F, 0x00]).unwrap();

        let lxi = decode(&mem, 0x0100);
        assert_eq!(lxi.operand, Operand::Word(0x1234));
        assert_eq!(lxi.bytes(), vec![0x21, 0x34, 0x12]);

        let mvi = decode(&mem, 0x0103);
        assert_eq!(mvi.operand, Operand::Byte(0x7F));

        let nop = decode(&mem, 0x0105);
        assert_eq!(nop.operand, Operand::None);
        assert_eq!(nop.size(), 1);
    }

    #[test]
    fn test_decode_wraps_operand() {
        let mut mem = Memory::new();
        mem.write(0xFFFF, 0xC3);
        mem.write(0x0000, 0x00);
        mem.write(0x0001, 0x20);

        assert_eq!(decode(&mem, 0xFFFF).operand, Operand::Word(0x2000));
    }
}
