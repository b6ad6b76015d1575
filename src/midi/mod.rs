//! Standard MIDI File decoding

pub mod event;
pub mod reader;
pub mod track;

pub use event::{EventKind, RawEvent, Timeline};
pub use reader::{read_smf, DecodeStatus, DecodedFile, MidiReader, ReaderOptions};
pub use track::TrackState;

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read a MIDI file into memory, decompressing `.gz` files
pub fn load_file(path: &Path) -> io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut data = Vec::new();

    let is_gzip = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    if is_gzip {
        GzDecoder::new(file).read_to_end(&mut data)?;
    } else {
        io::BufReader::new(file).read_to_end(&mut data)?;
    }

    Ok(data)
}
