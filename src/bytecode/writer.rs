//! C++ header writer
//!
//! Emits `g_freq_table` and `g_music_data` as static arrays the playback
//! interpreter includes directly.

use super::commands::opcode;
use crate::compiler::Program;
use crate::error::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Include guard of the generated header
pub const INCLUDE_GUARD: &str = "MIDI_DATA_H";

/// Values per line in both arrays
pub const VALUES_PER_LINE: usize = 16;

const INDENT: &str = "    ";

/// Header writer over any byte sink
pub struct HeaderWriter<W: Write> {
    out: W,
    /// Bytes written to the current `g_music_data` line
    line_fill: usize,
}

impl<W: Write> HeaderWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, line_fill: 0 }
    }

    /// Write the complete header for `program`
    pub fn write_program(&mut self, program: &Program) -> Result<()> {
        write!(
            self.out,
            "#ifndef {guard}\n#define {guard}\n\n#include <cstdint>\n\n",
            guard = INCLUDE_GUARD
        )?;
        self.write_freq_table(program.freq_table.as_slice())?;
        self.write_music_data(program.body())?;
        writeln!(self.out, "#endif")?;
        self.out.flush()?;
        Ok(())
    }

    fn write_freq_table(&mut self, values: &[u32]) -> Result<()> {
        writeln!(self.out, "static const uint32_t g_freq_table[] = {{")?;
        for line in values.chunks(VALUES_PER_LINE) {
            let text: Vec<String> = line.iter().map(u32::to_string).collect();
            writeln!(self.out, "{}{},", INDENT, text.join(", "))?;
        }
        write!(self.out, "}};\n\n")?;
        Ok(())
    }

    fn write_music_data(&mut self, body: &[u8]) -> Result<()> {
        write!(self.out, "static const uint8_t g_music_data[] = {{\n{}", INDENT)?;
        self.line_fill = 0;
        for &byte in body {
            self.write_byte(byte)?;
        }
        // Sentinel closes the array and is not counted towards line wrapping
        write!(self.out, "0x{:02X} }};\n\n", opcode::END)?;
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        write!(self.out, "0x{:02X}, ", byte)?;
        self.line_fill += 1;
        if self.line_fill == VALUES_PER_LINE {
            write!(self.out, "\n{}", INDENT)?;
            self.line_fill = 0;
        }
        Ok(())
    }

    /// Recover the underlying sink
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Render the header to a string
pub fn render_header(program: &Program) -> Result<String> {
    let mut writer = HeaderWriter::new(Vec::new());
    writer.write_program(program)?;
    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

/// Write the header to `path`, replacing any existing file
pub fn write_header_file(path: &Path, program: &Program) -> Result<()> {
    let file = File::create(path)?;
    HeaderWriter::new(BufWriter::new(file)).write_program(program)
}
