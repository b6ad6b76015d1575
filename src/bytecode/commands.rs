//! Music bytecode instructions and disassembly

use crate::error::{Error, Result};
use serde::Serialize;

/// Bytecode opcodes
pub mod opcode {
    /// Largest single-byte wait (0x00-0xEF wait that many milliseconds)
    pub const MAX_SHORT_WAIT: u8 = 0xEF;
    /// Wait nnnn milliseconds (16-bit little-endian operand)
    pub const LONG_WAIT: u8 = 0xF0;
    /// Start note: note, velocity
    pub const NOTE_ON: u8 = 0xF1;
    /// Stop note: note
    pub const NOTE_OFF: u8 = 0xF2;
    /// End of stream
    pub const END: u8 = 0xFF;
}

/// A decoded bytecode instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    /// Wait 0-239 ms, encoded as the opcode itself
    ShortWait { ms: u8 },
    /// Wait up to 65535 ms
    LongWait { ms: u16 },
    /// Start a note
    NoteOn { note: u8, velocity: u8 },
    /// Stop every voice playing this note
    NoteOff { note: u8 },
    /// End of stream
    End,
}

impl Instruction {
    /// Append the encoded form of this instruction
    pub fn encode(&self, out: &mut Vec<u8>) {
        match *self {
            Instruction::ShortWait { ms } => out.push(ms.min(opcode::MAX_SHORT_WAIT)),
            Instruction::LongWait { ms } => {
                out.push(opcode::LONG_WAIT);
                out.extend_from_slice(&ms.to_le_bytes());
            }
            Instruction::NoteOn { note, velocity } => {
                out.extend_from_slice(&[opcode::NOTE_ON, note, velocity]);
            }
            Instruction::NoteOff { note } => out.extend_from_slice(&[opcode::NOTE_OFF, note]),
            Instruction::End => out.push(opcode::END),
        }
    }

    /// Encoded size in bytes
    pub fn size(&self) -> usize {
        match self {
            Instruction::ShortWait { .. } | Instruction::End => 1,
            Instruction::LongWait { .. } | Instruction::NoteOn { .. } => 3,
            Instruction::NoteOff { .. } => 2,
        }
    }

    /// Milliseconds waited, if this is a wait
    pub fn wait_ms(&self) -> Option<u32> {
        match *self {
            Instruction::ShortWait { ms } => Some(ms as u32),
            Instruction::LongWait { ms } => Some(ms as u32),
            _ => None,
        }
    }
}

/// Decode a bytecode stream up to and including its `END` opcode
pub fn decode(data: &[u8]) -> Result<Vec<Instruction>> {
    let mut reader = BytecodeReader::new(data);
    let mut instructions = Vec::new();

    loop {
        let instruction = reader.parse_instruction()?;
        instructions.push(instruction);
        if instruction == Instruction::End {
            break;
        }
    }

    if !reader.is_eof() {
        log::debug!(
            "{} trailing bytes after end of stream",
            data.len() - reader.position()
        );
    }

    Ok(instructions)
}

/// Cursor over a bytecode stream
pub struct BytecodeReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BytecodeReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn read_u8(&mut self) -> Result<u8> {
        let b = *self.data.get(self.pos).ok_or_else(|| Error::Bytecode {
            offset: self.pos,
            message: "unexpected end of stream".into(),
        })?;
        self.pos += 1;
        Ok(b)
    }

    /// Parse the instruction at the current position
    pub fn parse_instruction(&mut self) -> Result<Instruction> {
        let start = self.pos;
        let op = self.read_u8()?;

        let instruction = match op {
            0x00..=opcode::MAX_SHORT_WAIT => Instruction::ShortWait { ms: op },
            opcode::LONG_WAIT => {
                let lo = self.read_u8()?;
                let hi = self.read_u8()?;
                Instruction::LongWait {
                    ms: u16::from_le_bytes([lo, hi]),
                }
            }
            opcode::NOTE_ON => {
                let note = self.read_u8()?;
                let velocity = self.read_u8()?;
                Instruction::NoteOn { note, velocity }
            }
            opcode::NOTE_OFF => {
                let note = self.read_u8()?;
                Instruction::NoteOff { note }
            }
            opcode::END => Instruction::End,
            _ => {
                return Err(Error::Bytecode {
                    offset: start,
                    message: format!("unknown opcode 0x{:02X}", op),
                })
            }
        };

        Ok(instruction)
    }
}
