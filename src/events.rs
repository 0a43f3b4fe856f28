//! Events handed to the core by its host: notes and transport state.

/// Highest valid note id; ids are 7-bit as in MIDI.
pub const MAX_NOTE_ID: u8 = 127;

/// A discrete note event. Velocity is already normalized to [0, 1].
/// Note events with an id above [`MAX_NOTE_ID`] are ignored by the chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteEvent {
    NoteOn { id: u8, velocity: f32 },
    NoteOff { id: u8 },
    AllNotesOff,
}

impl NoteEvent {
    /// Build a note-on from a 7-bit MIDI velocity.
    pub fn note_on_midi(id: u8, velocity: u8) -> Self {
        NoteEvent::NoteOn {
            id,
            velocity: velocity_from_midi(velocity),
        }
    }
}

/// Map a 7-bit MIDI velocity to [0, 1].
pub fn velocity_from_midi(velocity: u8) -> f32 {
    velocity.min(127) as f32 / 127.0
}

/// Snapshot of the host transport, polled once per block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportInfo {
    pub is_playing: bool,
    pub bpm: f64,
    /// Position in quarter-note beats.
    pub beat_position: f64,
}

impl Default for TransportInfo {
    fn default() -> Self {
        TransportInfo {
            is_playing: false,
            bpm: 120.0,
            beat_position: 0.0,
        }
    }
}

/// Fixed-capacity table of held note ids.
#[derive(Debug, Clone)]
pub struct HeldNotes {
    held: [bool; 128],
    count: usize,
}

impl HeldNotes {
    pub fn new() -> Self {
        HeldNotes {
            held: [false; 128],
            count: 0,
        }
    }

    /// Mark `id` as held. Returns false for ids above [`MAX_NOTE_ID`].
    pub fn press(&mut self, id: u8) -> bool {
        let Some(slot) = self.held.get_mut(id as usize) else {
            return false;
        };
        if !*slot {
            *slot = true;
            self.count += 1;
        }
        true
    }

    /// Returns false for ids above [`MAX_NOTE_ID`].
    pub fn release(&mut self, id: u8) -> bool {
        let Some(slot) = self.held.get_mut(id as usize) else {
            return false;
        };
        if *slot {
            *slot = false;
            self.count -= 1;
        }
        true
    }

    pub fn clear(&mut self) {
        self.held = [false; 128];
        self.count = 0;
    }

    pub fn is_held(&self, id: u8) -> bool {
        self.held.get(id as usize).copied().unwrap_or(false)
    }

    pub fn any(&self) -> bool {
        self.count > 0
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Default for HeldNotes {
    fn default() -> Self {
        Self::new()
    }
}
