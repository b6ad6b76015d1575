//! Note frequency table

use serde::Serialize;

/// Number of MIDI notes
pub const NOTE_COUNT: usize = 128;

/// Reference pitch A4
pub const A4_FREQUENCY: f64 = 440.0;

/// MIDI note number of A4
pub const A4_NOTE: i32 = 69;

/// Equal-tempered frequency of a MIDI note, rounded down to whole Hz
pub fn note_frequency(note: u8) -> u32 {
    let semitones = note as i32 - A4_NOTE;
    (A4_FREQUENCY * 2.0_f64.powf(semitones as f64 / 12.0)) as u32
}

/// Integer frequency of every MIDI note, indexed by note number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FrequencyTable {
    values: Vec<u32>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self {
            values: (0..NOTE_COUNT as u8).map(note_frequency).collect(),
        }
    }

    /// Frequency of `note`, or `None` above note 127
    pub fn get(&self, note: u8) -> Option<u32> {
        self.values.get(note as usize).copied()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.values
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}
