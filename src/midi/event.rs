//! Decoded MIDI events and the flattened timeline

use serde::Serialize;

/// What a decoded event does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NoteOn,
    NoteOff,
    TempoChange,
}

/// A note or tempo event at an absolute tick position
///
/// - `NoteOn`: `data1` = note, `data2` = velocity
/// - `NoteOff`: `data1` = note, `data2` = 0
/// - `TempoChange`: `data1` = microseconds per beat, `data2` = 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RawEvent {
    pub tick: u32,
    pub kind: EventKind,
    pub data1: u32,
    pub data2: u32,
}

impl RawEvent {
    pub fn note_on(tick: u32, note: u8, velocity: u8) -> Self {
        Self {
            tick,
            kind: EventKind::NoteOn,
            data1: note as u32,
            data2: velocity as u32,
        }
    }

    pub fn note_off(tick: u32, note: u8) -> Self {
        Self {
            tick,
            kind: EventKind::NoteOff,
            data1: note as u32,
            data2: 0,
        }
    }

    pub fn tempo(tick: u32, micros_per_beat: u32) -> Self {
        Self {
            tick,
            kind: EventKind::TempoChange,
            data1: micros_per_beat & 0x00FF_FFFF,
            data2: 0,
        }
    }
}

/// Events from every track, ordered by tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Timeline {
    events: Vec<RawEvent>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a timeline from events in any order
    pub fn from_events(events: Vec<RawEvent>) -> Self {
        let mut timeline = Self { events };
        timeline.sort();
        timeline
    }

    /// Append an event; call `sort` once all tracks are in
    pub fn push(&mut self, event: RawEvent) {
        self.events.push(event);
    }

    /// Stable sort by tick, so same-tick events keep decode order
    pub fn sort(&mut self) {
        self.events.sort_by_key(|event| event.tick);
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawEvent> {
        self.events.iter()
    }

    pub fn events(&self) -> &[RawEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Tick of the last event
    pub fn last_tick(&self) -> Option<u32> {
        self.events.last().map(|event| event.tick)
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a RawEvent;
    type IntoIter = std::slice::Iter<'a, RawEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
