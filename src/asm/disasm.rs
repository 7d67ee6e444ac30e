//! Disassembler for 8080 programs.
//!
//! Renders decoded instructions in Intel syntax with `$`-prefixed hex
//! immediates, e.g. `MVI A,$3E` or `JMP $0100`.

use crate::cpu::decode::{decode, Instruction, Operand};
use crate::cpu::Memory;

/// Disassemble a single decoded instruction to text.
pub fn disassemble_instruction(instr: &Instruction) -> String {
    let mnemonic = instr.mnemonic();
    let separator = if mnemonic.contains(' ') { "," } else { " " };

    match instr.operand {
        Operand::None => mnemonic.to_string(),
        Operand::Byte(b) => format!("{}{}${:02X}", mnemonic, separator, b),
        Operand::Word(w) => format!("{}{}${:04X}", mnemonic, separator, w),
    }
}

/// Decode and render the instruction at `address`.
pub fn decode_at(mem: &Memory, address: u16) -> (Instruction, String) {
    let instr = decode(mem, address);
    let text = disassemble_instruction(&instr);
    (instr, text)
}

/// Disassemble a raw image as if loaded at `base`.
///
/// One line per instruction: address, raw bytes, text. A trailing
/// instruction cut off by the end of the image is shown as `DB` bytes.
pub fn disassemble(image: &[u8], base: u16) -> String {
    let mut mem = Memory::new();
    let len = image.len().min(crate::cpu::MEMORY_SIZE - base as usize);
    mem.load(base, &image[..len]).ok();

    let mut output = String::new();
    output.push_str("; 8080 Disassembly\n");
    output.push_str("; ----------------\n\n");

    let mut offset = 0usize;
    while offset < len {
        let address = base.wrapping_add(offset as u16);
        let instr = decode(&mem, address);
        let size = instr.size() as usize;

        if offset + size > len {
            for &byte in &image[offset..len] {
                let address = base.wrapping_add(offset as u16);
                output.push_str(&format!("{:04X}: {:<9} DB ${:02X}\n", address, format!("{:02X}", byte), byte));
                offset += 1;
            }
            break;
        }

        let hex: Vec<String> = instr.bytes().iter().map(|b| format!("{:02X}", b)).collect();
        output.push_str(&format!(
            "{:04X}: {:<9} {}\n",
            address,
            hex.join(" "),
            disassemble_instruction(&instr)
        ));
        offset += size;
    }

    output
}
