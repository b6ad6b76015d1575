//! JSON serialization types for compiled music

use super::commands::Instruction;
use super::freq::FrequencyTable;
use crate::compiler::Program;
use crate::error::Result;
use crate::midi::{DecodeStatus, DecodedFile, Timeline};
use serde::Serialize;

/// Top-level JSON structure for a compiled MIDI file
#[derive(Debug, Clone, Serialize)]
pub struct ProgramJson {
    /// MIDI time unit
    pub ticks_per_beat: u16,
    /// Decode outcome
    pub status: StatusJson,
    /// Decoded note and tempo events
    pub timeline: Timeline,
    /// Disassembled bytecode
    pub instructions: Vec<Instruction>,
    /// Bytecode size including the terminator
    pub size: usize,
    /// Total of all waits
    pub duration_ms: u64,
    /// Note frequency table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freq_table: Option<FrequencyTable>,
}

/// JSON representation of the decode status
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StatusJson {
    Complete,
    Truncated { error: String },
}

impl From<&DecodeStatus> for StatusJson {
    fn from(status: &DecodeStatus) -> Self {
        match status {
            DecodeStatus::Complete => StatusJson::Complete,
            DecodeStatus::Truncated { error } => StatusJson::Truncated {
                error: error.to_string(),
            },
        }
    }
}

impl ProgramJson {
    /// Create a ProgramJson from a decoded file and its compiled program
    pub fn new(decoded: &DecodedFile, program: &Program, with_freq_table: bool) -> Result<Self> {
        let instructions = program.instructions()?;
        let duration_ms = instructions
            .iter()
            .filter_map(Instruction::wait_ms)
            .map(u64::from)
            .sum();

        Ok(Self {
            ticks_per_beat: decoded.ticks_per_beat,
            status: StatusJson::from(&decoded.status),
            timeline: decoded.timeline.clone(),
            instructions,
            size: program.data.len(),
            duration_ms,
            freq_table: with_freq_table.then(|| program.freq_table.clone()),
        })
    }
}
