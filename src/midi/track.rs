//! Per-track decoder state

use super::event::RawEvent;
use std::collections::HashSet;

/// How a status position in the byte stream was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusByte {
    /// A fresh status byte; it has been consumed
    New(u8),
    /// A data byte reusing the running status; it must be re-read as an operand
    Running(u8),
}

impl StatusByte {
    pub fn value(self) -> u8 {
        match self {
            StatusByte::New(status) | StatusByte::Running(status) => status,
        }
    }
}

/// Running status and sounding notes of the track being decoded
#[derive(Debug, Default)]
pub struct TrackState {
    running_status: u8,
    active_notes: HashSet<u8>,
}

impl TrackState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last status byte seen in this track (0 before the first one)
    pub fn running_status(&self) -> u8 {
        self.running_status
    }

    pub fn is_active(&self, note: u8) -> bool {
        self.active_notes.contains(&note)
    }

    /// Number of notes currently sounding
    pub fn active_count(&self) -> usize {
        self.active_notes.len()
    }

    /// Resolve the byte found where a status byte is expected
    pub fn resolve_status(&mut self, byte: u8) -> StatusByte {
        if byte >= 0x80 {
            self.running_status = byte;
            StatusByte::New(byte)
        } else {
            StatusByte::Running(self.running_status)
        }
    }

    /// Release a note; releases of notes that are not sounding are dropped
    pub fn note_off(&mut self, tick: u32, note: u8) -> Option<RawEvent> {
        if self.active_notes.remove(&note) {
            Some(RawEvent::note_off(tick, note))
        } else {
            None
        }
    }

    /// Start a note. Velocity 0 is a release, and attacks below `threshold`
    /// are dropped without touching the active set.
    pub fn note_on(&mut self, tick: u32, note: u8, velocity: u8, threshold: u8) -> Option<RawEvent> {
        if velocity == 0 {
            self.note_off(tick, note)
        } else if velocity >= threshold {
            self.active_notes.insert(note);
            Some(RawEvent::note_on(tick, note, velocity))
        } else {
            None
        }
    }
}
