//! Program images and disassembly.
//!
//! This module provides:
//! - Raw binary image loading
//! - A disassembler (bytes → Intel-syntax text)

pub mod disasm;
pub mod image;

pub use disasm::{decode_at, disassemble, disassemble_instruction};
pub use image::{load_image, ImageError};
