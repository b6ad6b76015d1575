//! Timeline to bytecode compiler
//!
//! Turns a tick-ordered [`Timeline`] into the music bytecode stream: tick
//! deltas become millisecond waits under the tempo in effect, notes become
//! note instructions, and tempo changes only affect later waits.

use crate::bytecode::commands::{self, opcode, Instruction};
use crate::bytecode::freq::FrequencyTable;
use crate::bytecode::wait;
use crate::bytecode::writer;
use crate::error::Result;
use crate::midi::{self, EventKind, ReaderOptions, Timeline};
use log::info;
use std::io::Read;
use std::path::Path;

/// Tempo before the first tempo change (120 BPM)
pub const DEFAULT_TEMPO: u32 = 500_000;

/// Compiled music data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// Bytecode, always terminated by `END`
    pub data: Vec<u8>,
    /// Note frequency table shipped next to the bytecode
    pub freq_table: FrequencyTable,
}

impl Program {
    /// Bytecode without the trailing `END`
    pub fn body(&self) -> &[u8] {
        self.data.strip_suffix(&[opcode::END]).unwrap_or(&self.data[..])
    }

    /// Disassemble the bytecode
    pub fn instructions(&self) -> Result<Vec<Instruction>> {
        commands::decode(&self.data)
    }

    /// Total playback time in milliseconds
    pub fn total_wait_ms(&self) -> Result<u64> {
        Ok(self
            .instructions()?
            .iter()
            .filter_map(Instruction::wait_ms)
            .map(u64::from)
            .sum())
    }
}

/// State carried across the timeline while compiling
#[derive(Debug, Clone)]
pub struct CompilerState {
    /// Microseconds per beat
    pub current_tempo: u32,
    /// Tick of the previously emitted event
    pub last_emitted_tick: u32,
    pub ticks_per_beat: u16,
}

impl CompilerState {
    pub fn new(ticks_per_beat: u16) -> Self {
        Self {
            current_tempo: DEFAULT_TEMPO,
            last_emitted_tick: 0,
            ticks_per_beat,
        }
    }

    /// Milliseconds between the last emitted event and `tick` at the
    /// current tempo, truncated
    pub fn wait_ms(&self, tick: u32) -> u64 {
        let delta = tick.saturating_sub(self.last_emitted_tick) as u64;
        // The reader rejects a zero time unit; guard direct callers anyway
        let ticks_per_beat = self.ticks_per_beat.max(1) as u64;
        delta * self.current_tempo as u64 / (ticks_per_beat * 1000)
    }
}

/// Compile a sorted timeline into bytecode
pub fn compile_timeline(timeline: &Timeline, ticks_per_beat: u16) -> Program {
    let mut state = CompilerState::new(ticks_per_beat);
    let mut data = Vec::new();

    for event in timeline {
        if event.tick > state.last_emitted_tick {
            wait::push_wait(&mut data, state.wait_ms(event.tick));
            state.last_emitted_tick = event.tick;
        }

        match event.kind {
            EventKind::NoteOn => Instruction::NoteOn {
                note: event.data1 as u8,
                velocity: event.data2 as u8,
            }
            .encode(&mut data),
            EventKind::NoteOff => Instruction::NoteOff {
                note: event.data1 as u8,
            }
            .encode(&mut data),
            EventKind::TempoChange => state.current_tempo = event.data1,
        }
    }

    data.push(opcode::END);

    Program {
        data,
        freq_table: FrequencyTable::new(),
    }
}

/// MIDI to header compiler
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    pub options: ReaderOptions,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ReaderOptions) -> Self {
        Self { options }
    }

    /// Decode MIDI data and compile it
    pub fn compile_bytes(&self, data: &[u8]) -> Result<(midi::DecodedFile, Program)> {
        let decoded = midi::read_smf(data, &self.options)?;
        let program = compile_timeline(&decoded.timeline, decoded.ticks_per_beat);
        info!(
            "Compiled {} events into {} bytes of bytecode",
            decoded.timeline.len(),
            program.data.len()
        );
        Ok((decoded, program))
    }

    /// Compile MIDI input to a header file
    pub fn compile<R: Read>(&self, mut input: R, output: &Path) -> Result<Program> {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        self.compile_to_file(&data, output)
    }

    /// Compile a MIDI file (optionally gzipped) to a header file
    pub fn compile_file(&self, input: &Path, output: &Path) -> Result<Program> {
        let data = midi::load_file(input)?;
        self.compile_to_file(&data, output)
    }

    fn compile_to_file(&self, data: &[u8], output: &Path) -> Result<Program> {
        let (_, program) = self.compile_bytes(data)?;
        info!("Generating '{}'...", output.display());
        writer::write_header_file(output, &program)?;
        Ok(program)
    }
}
