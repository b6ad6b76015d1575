//! Standard MIDI File reader
//!
//! Walks the chunk structure of an SMF and flattens every `MTrk` chunk into a
//! single tick-ordered [`Timeline`] of note and tempo events. Decoding is
//! best-effort: once the header is recognised, a read past the end of the
//! data stops decoding but keeps every event found so far.

use super::event::{RawEvent, Timeline};
use super::track::{StatusByte, TrackState};
use crate::error::{Error, Result};
use log::{debug, info, warn};

/// Header chunk tag
pub const HEADER_MAGIC: &[u8; 4] = b"MThd";

/// Track chunk tag
pub const TRACK_MAGIC: &[u8; 4] = b"MTrk";

/// Size of the header chunk payload this reader understands
pub const HEADER_PAYLOAD_SIZE: u32 = 6;

/// Time unit assumed when the header cannot be read
pub const DEFAULT_TICKS_PER_BEAT: u16 = 480;

/// Note-on velocities below this are treated as inaudible
pub const DEFAULT_VELOCITY_THRESHOLD: u8 = 50;

/// Status bytes and meta types the decoder acts on
pub mod msg {
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const POLY_PRESSURE: u8 = 0xA0;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
    pub const CHANNEL_PRESSURE: u8 = 0xD0;
    pub const PITCH_BEND: u8 = 0xE0;
    pub const SYSEX: u8 = 0xF0;
    pub const SYSEX_ESCAPE: u8 = 0xF7;
    pub const META: u8 = 0xFF;

    /// Meta event type of Set Tempo
    pub const META_TEMPO: u8 = 0x51;
}

/// Options affecting which events are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Note-on events with a velocity below this never sound
    pub velocity_threshold: u8,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            velocity_threshold: DEFAULT_VELOCITY_THRESHOLD,
        }
    }
}

/// Fields of the `MThd` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmfHeader {
    pub format: u16,
    pub track_count: u16,
    pub ticks_per_beat: u16,
}

/// Tag and payload size of a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub tag: [u8; 4],
    pub length: u32,
}

impl ChunkHeader {
    pub fn is_track(&self) -> bool {
        &self.tag == TRACK_MAGIC
    }
}

/// Whether the whole file was decoded
#[derive(Debug)]
pub enum DecodeStatus {
    /// Every chunk was read to its end
    Complete,
    /// Decoding stopped early; the timeline holds what came before `error`
    Truncated { error: Error },
}

impl DecodeStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, DecodeStatus::Complete)
    }
}

/// Result of reading a MIDI file
#[derive(Debug)]
pub struct DecodedFile {
    pub timeline: Timeline,
    pub ticks_per_beat: u16,
    pub status: DecodeStatus,
}

/// Decode a Standard MIDI File held in memory
///
/// Returns `Err(Error::InvalidHeader)` when the data is not an SMF at all and
/// `Err(Error::InvalidTimeDivision)` for a zero time unit. Truncated input is
/// not an error: the partial timeline comes back with a `Truncated` status.
pub fn read_smf(data: &[u8], options: &ReaderOptions) -> Result<DecodedFile> {
    let mut reader = MidiReader::new(data);

    let header = match reader.parse_header() {
        Ok(header) => header,
        Err(error @ Error::UnexpectedEof { .. }) => {
            warn!("MIDI header is truncated: {}", error);
            return Ok(DecodedFile {
                timeline: Timeline::new(),
                ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
                status: DecodeStatus::Truncated { error },
            });
        }
        Err(error) => return Err(error),
    };

    let mut timeline = Timeline::new();
    let status = match reader.parse_chunks(options, &mut timeline) {
        Ok(tracks) => {
            if tracks != header.track_count as usize {
                debug!(
                    "Header declares {} tracks, found {}",
                    header.track_count, tracks
                );
            }
            DecodeStatus::Complete
        }
        Err(error) => {
            warn!(
                "Stopped decoding early ({}); keeping {} events",
                error,
                timeline.len()
            );
            DecodeStatus::Truncated { error }
        }
    };

    timeline.sort();
    info!(
        "Decoded {} events ({} ticks per beat)",
        timeline.len(),
        header.ticks_per_beat
    );

    Ok(DecodedFile {
        timeline,
        ticks_per_beat: header.ticks_per_beat,
        status,
    })
}

/// Big-endian byte cursor over MIDI data
pub struct MidiReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> MidiReader<'a> {
    /// Create a new reader over raw SMF data
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Check if we've reached the end of data
    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get current position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Seek to a position
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn eof(&self) -> Error {
        Error::UnexpectedEof { offset: self.pos }
    }

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8> {
        let b = *self.data.get(self.pos).ok_or_else(|| self.eof())?;
        self.pos += 1;
        Ok(b)
    }

    /// Read a 16-bit big-endian value
    pub fn read_u16_be(&mut self) -> Result<u16> {
        let hi = self.read_u8()? as u16;
        let lo = self.read_u8()? as u16;
        Ok((hi << 8) | lo)
    }

    /// Read a 24-bit big-endian value
    pub fn read_u24_be(&mut self) -> Result<u32> {
        let b0 = self.read_u8()? as u32;
        let b1 = self.read_u8()? as u32;
        let b2 = self.read_u8()? as u32;
        Ok((b0 << 16) | (b1 << 8) | b2)
    }

    /// Read a 32-bit big-endian value
    pub fn read_u32_be(&mut self) -> Result<u32> {
        let hi = self.read_u16_be()? as u32;
        let lo = self.read_u16_be()? as u32;
        Ok((hi << 16) | lo)
    }

    /// Read a variable-length quantity (7 bits per byte, high bit = more)
    pub fn read_vlq(&mut self) -> Result<u32> {
        let mut value = 0u32;
        loop {
            let byte = self.read_u8()?;
            value = (value << 7) | (byte & 0x7F) as u32;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
    }

    /// Borrow the next `len` bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let data: &'a [u8] = self.data;
        let end = self.pos.checked_add(len).ok_or_else(|| self.eof())?;
        let bytes = data.get(self.pos..end).ok_or_else(|| self.eof())?;
        self.pos = end;
        Ok(bytes)
    }

    /// Skip `len` bytes
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Validate the `MThd` chunk and read its fields
    pub fn parse_header(&mut self) -> Result<SmfHeader> {
        if self.data.len() < HEADER_MAGIC.len() || &self.data[..4] != HEADER_MAGIC {
            return Err(Error::InvalidHeader);
        }
        self.pos = HEADER_MAGIC.len();

        let length = self.read_u32_be()?;
        let format = self.read_u16_be()?;
        let track_count = self.read_u16_be()?;
        let ticks_per_beat = self.read_u16_be()?;

        if length > HEADER_PAYLOAD_SIZE {
            self.skip((length - HEADER_PAYLOAD_SIZE) as usize)?;
        }

        if ticks_per_beat == 0 {
            return Err(Error::InvalidTimeDivision(ticks_per_beat));
        }
        if ticks_per_beat & 0x8000 != 0 {
            warn!(
                "SMPTE time division 0x{:04X} is not supported; using it as ticks per beat",
                ticks_per_beat
            );
        }

        debug!(
            "MIDI header: format {}, {} tracks, {} ticks per beat",
            format, track_count, ticks_per_beat
        );

        Ok(SmfHeader {
            format,
            track_count,
            ticks_per_beat,
        })
    }

    /// Read the tag and length of the next chunk
    pub fn parse_chunk_header(&mut self) -> Result<ChunkHeader> {
        let bytes = self.read_bytes(4)?;
        let tag = [bytes[0], bytes[1], bytes[2], bytes[3]];
        let length = self.read_u32_be()?;
        Ok(ChunkHeader { tag, length })
    }

    /// Decode every chunk after the header, returning the number of tracks
    pub fn parse_chunks(&mut self, options: &ReaderOptions, timeline: &mut Timeline) -> Result<usize> {
        let mut tracks = 0;

        while !self.is_eof() {
            let chunk = self.parse_chunk_header()?;
            if chunk.is_track() {
                let before = timeline.len();
                self.parse_track(chunk.length as usize, options, timeline)?;
                debug!(
                    "Track {}: {} bytes, {} events",
                    tracks,
                    chunk.length,
                    timeline.len() - before
                );
                tracks += 1;
            } else {
                warn!(
                    "Skipping unknown chunk '{}' ({} bytes)",
                    String::from_utf8_lossy(&chunk.tag),
                    chunk.length
                );
                self.skip(chunk.length as usize)?;
            }
        }

        Ok(tracks)
    }

    /// Decode one `MTrk` payload starting at the current position
    ///
    /// Events go straight into `timeline`, so the ones decoded before a
    /// failure survive it.
    pub fn parse_track(&mut self, length: usize, options: &ReaderOptions, timeline: &mut Timeline) -> Result<()> {
        let track_end = self.pos.checked_add(length).ok_or_else(|| self.eof())?;
        let mut state = TrackState::new();
        let mut tick = 0u32;

        while self.pos < track_end {
            tick = tick.saturating_add(self.read_vlq()?);
            let byte = self.read_u8()?;
            let status = match state.resolve_status(byte) {
                StatusByte::New(status) => status,
                StatusByte::Running(status) => {
                    // The byte was the first operand
                    self.pos -= 1;
                    status
                }
            };

            if let Some(event) = self.parse_event(status, tick, &mut state, options)? {
                timeline.push(event);
            }
        }

        self.seek(track_end);
        Ok(())
    }

    /// Consume the operands of one event
    fn parse_event(
        &mut self,
        status: u8,
        tick: u32,
        state: &mut TrackState,
        options: &ReaderOptions,
    ) -> Result<Option<RawEvent>> {
        let event = match status & 0xF0 {
            msg::NOTE_OFF => {
                let note = self.read_u8()?;
                let _velocity = self.read_u8()?;
                state.note_off(tick, note)
            }
            msg::NOTE_ON => {
                let note = self.read_u8()?;
                let velocity = self.read_u8()?;
                state.note_on(tick, note, velocity, options.velocity_threshold)
            }
            msg::POLY_PRESSURE | msg::CONTROL_CHANGE | msg::PITCH_BEND => {
                self.skip(2)?;
                None
            }
            msg::PROGRAM_CHANGE | msg::CHANNEL_PRESSURE => {
                self.skip(1)?;
                None
            }
            _ => match status {
                msg::META => {
                    let meta_type = self.read_u8()?;
                    let length = self.read_vlq()?;
                    if meta_type == msg::META_TEMPO && length == 3 {
                        let tempo = self.read_u24_be()?;
                        Some(RawEvent::tempo(tick, tempo))
                    } else {
                        self.skip(length as usize)?;
                        None
                    }
                }
                msg::SYSEX | msg::SYSEX_ESCAPE => {
                    let length = self.read_vlq()?;
                    self.skip(length as usize)?;
                    None
                }
                // System common/real-time bytes carry nothing we decode
                _ => None,
            },
        };

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::event::EventKind;

    fn smf(tracks: &[&[u8]]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(HEADER_MAGIC);
        data.extend_from_slice(&6u32.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
        data.extend_from_slice(&96u16.to_be_bytes());
        for track in tracks {
            data.extend_from_slice(TRACK_MAGIC);
            data.extend_from_slice(&(track.len() as u32).to_be_bytes());
            data.extend_from_slice(track);
        }
        data
    }

    #[test]
    fn test_vlq() {
        let cases: &[(&[u8], u32)] = &[
            (&[0x00][..], 0),
            (&[0x40][..], 0x40),
            (&[0x7F][..], 0x7F),
            (&[0x81, 0x00][..], 0x80),
            (&[0xC0, 0x00][..], 0x2000),
            (&[0xFF, 0x7F][..], 0x3FFF),
            (&[0x81, 0x80, 0x00][..], 0x4000),
            (&[0xFF, 0xFF, 0xFF, 0x7F][..], 0x0FFF_FFFF),
        ];
        for (bytes, expected) in cases {
            let mut reader = MidiReader::new(bytes);
            assert_eq!(reader.read_vlq().unwrap(), *expected, "{:02X?}", bytes);
            assert!(reader.is_eof());
        }
    }

    #[test]
    fn test_vlq_truncated() {
        let mut reader = MidiReader::new(&[0x81, 0x80]);
        assert!(matches!(
            reader.read_vlq(),
            Err(Error::UnexpectedEof { offset: 2 })
        ));
    }

    #[test]
    fn test_missing_magic() {
        let result = read_smf(b"RIFF\0\0\0\x06", &ReaderOptions::default());
        assert!(matches!(result, Err(Error::InvalidHeader)));
        assert!(matches!(
            read_smf(b"", &ReaderOptions::default()),
            Err(Error::InvalidHeader)
        ));
    }

    #[test]
    fn test_zero_time_division() {
        let mut data = smf(&[]);
        data[12] = 0;
        data[13] = 0;
        assert!(matches!(
            read_smf(&data, &ReaderOptions::default()),
            Err(Error::InvalidTimeDivision(0))
        ));
    }

    #[test]
    fn test_truncated_header_fields() {
        let decoded = read_smf(b"MThd\0\0\0\x06\0\x01", &ReaderOptions::default()).unwrap();
        assert!(decoded.timeline.is_empty());
        assert_eq!(decoded.ticks_per_beat, DEFAULT_TICKS_PER_BEAT);
        assert!(!decoded.status.is_complete());
    }

    #[test]
    fn test_running_status_note_ons() {
        let track: &[u8] = &[
            0x00, 0x90, 60, 100, // note on, explicit status
            0x00, 64, 90, // note on, running status
            0x60, 0x80, 60, 0, // note off
            0x00, 64, 0, // running note off
        ];
        let decoded = read_smf(&smf(&[track]), &ReaderOptions::default()).unwrap();
        assert!(decoded.status.is_complete());
        assert_eq!(
            decoded.timeline.events(),
            &[
                RawEvent::note_on(0, 60, 100),
                RawEvent::note_on(0, 64, 90),
                RawEvent::note_off(0x60, 60),
                RawEvent::note_off(0x60, 64),
            ]
        );
    }

    #[test]
    fn test_running_status_zero_velocity_release() {
        let track: &[u8] = &[0x00, 0x90, 60, 100, 0x10, 60, 0];
        let decoded = read_smf(&smf(&[track]), &ReaderOptions::default()).unwrap();
        assert_eq!(
            decoded.timeline.events(),
            &[RawEvent::note_on(0, 60, 100), RawEvent::note_off(0x10, 60)]
        );
    }

    #[test]
    fn test_ignored_channel_events() {
        let track: &[u8] = &[
            0x00, 0xB0, 7, 100, // control change
            0x00, 0xC0, 5, // program change
            0x00, 0xD0, 40, // channel pressure
            0x00, 0xE0, 0, 64, // pitch bend
            0x00, 0xA0, 60, 10, // poly pressure
            0x00, 0x90, 62, 70,
        ];
        let decoded = read_smf(&smf(&[track]), &ReaderOptions::default()).unwrap();
        assert_eq!(decoded.timeline.events(), &[RawEvent::note_on(0, 62, 70)]);
    }

    #[test]
    fn test_meta_and_sysex() {
        let track: &[u8] = &[
            0x00, 0xFF, 0x03, 0x04, b'L', b'e', b'a', b'd', // track name
            0x00, 0xF0, 0x03, 0x7E, 0x7F, 0xF7, // sysex
            0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // tempo 500000
            0x00, 0xFF, 0x51, 0x02, 0x07, 0xA1, // malformed tempo, skipped
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let decoded = read_smf(&smf(&[track]), &ReaderOptions::default()).unwrap();
        assert_eq!(decoded.timeline.events(), &[RawEvent::tempo(0, 500_000)]);
        assert_eq!(decoded.timeline.events()[0].kind, EventKind::TempoChange);
    }

    #[test]
    fn test_tracks_are_merged() {
        let first: &[u8] = &[0x00, 0x90, 60, 100, 0x40, 0x80, 60, 0];
        let second: &[u8] = &[0x20, 0x90, 67, 100, 0x40, 0x80, 67, 0];
        let decoded = read_smf(&smf(&[first, second]), &ReaderOptions::default()).unwrap();

        let ticks: Vec<u32> = decoded.timeline.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![0, 0x20, 0x40, 0x60]);
    }

    #[test]
    fn test_active_notes_are_per_track() {
        // The second track cannot release a note started by the first
        let first: &[u8] = &[0x00, 0x90, 60, 100];
        let second: &[u8] = &[0x10, 0x80, 60, 0];
        let decoded = read_smf(&smf(&[first, second]), &ReaderOptions::default()).unwrap();
        assert_eq!(decoded.timeline.events(), &[RawEvent::note_on(0, 60, 100)]);
    }

    #[test]
    fn test_unknown_chunk_skipped() {
        let mut data = smf(&[]);
        data.extend_from_slice(b"XFIH");
        data.extend_from_slice(&3u32.to_be_bytes());
        data.extend_from_slice(&[1, 2, 3]);
        data.extend_from_slice(TRACK_MAGIC);
        data.extend_from_slice(&4u32.to_be_bytes());
        data.extend_from_slice(&[0x00, 0x90, 72, 90]);

        let decoded = read_smf(&data, &ReaderOptions::default()).unwrap();
        assert!(decoded.status.is_complete());
        assert_eq!(decoded.timeline.events(), &[RawEvent::note_on(0, 72, 90)]);
    }

    #[test]
    fn test_truncated_track_keeps_prefix() {
        let track: &[u8] = &[0x00, 0x90, 60, 100, 0x10, 0x90, 62, 100, 0x10, 0x80];
        let mut data = smf(&[track]);
        // Claim more bytes than are present
        let len_pos = data.len() - track.len() - 4;
        data[len_pos..len_pos + 4].copy_from_slice(&64u32.to_be_bytes());

        let decoded = read_smf(&data, &ReaderOptions::default()).unwrap();
        assert!(matches!(
            decoded.status,
            DecodeStatus::Truncated {
                error: Error::UnexpectedEof { .. }
            }
        ));
        assert_eq!(
            decoded.timeline.events(),
            &[RawEvent::note_on(0, 60, 100), RawEvent::note_on(0x10, 62, 100)]
        );
    }

    #[test]
    fn test_velocity_threshold_option() {
        let track: &[u8] = &[0x00, 0x90, 60, 20, 0x10, 0x80, 60, 0];
        let quiet = read_smf(&smf(&[track]), &ReaderOptions::default()).unwrap();
        assert!(quiet.timeline.is_empty());

        let options = ReaderOptions {
            velocity_threshold: 1,
        };
        let loud = read_smf(&smf(&[track]), &options).unwrap();
        assert_eq!(loud.timeline.len(), 2);
    }

    #[test]
    fn test_header_extra_bytes_skipped() {
        let mut data = Vec::new();
        data.extend_from_slice(HEADER_MAGIC);
        data.extend_from_slice(&8u32.to_be_bytes());
        data.extend_from_slice(&[0, 0, 0, 1, 0, 120, 0xAA, 0xBB]);
        data.extend_from_slice(TRACK_MAGIC);
        data.extend_from_slice(&4u32.to_be_bytes());
        data.extend_from_slice(&[0x00, 0x90, 60, 100]);

        let decoded = read_smf(&data, &ReaderOptions::default()).unwrap();
        assert_eq!(decoded.ticks_per_beat, 120);
        assert_eq!(decoded.timeline.len(), 1);
    }
}
