//! Low-frequency oscillator with optional host-tempo sync.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Where the LFO output is routed by the signal chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LfoTarget {
    #[default]
    Volume,
    FilterCutoff,
    FilterResonance,
    /// There is no pitched oscillator; this drives the filter cutoff at half depth.
    PitchProxy,
}

impl LfoTarget {
    pub const ALL: [LfoTarget; 4] = [
        LfoTarget::Volume,
        LfoTarget::FilterCutoff,
        LfoTarget::FilterResonance,
        LfoTarget::PitchProxy,
    ];

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn index(self) -> i32 {
        self as i32
    }
}

/// A sine LFO producing values in [-depth, depth].
#[derive(Debug, Clone)]
pub struct Lfo {
    /// Hz when free-running; a note-value multiplier of the beat when synced.
    rate: f64,
    depth: f64,
    target: LfoTarget,
    sync_to_host: bool,

    host_bpm: f64,
    last_position: Option<f64>,

    phase: f64,
    phase_increment: f64,
    sample_rate: f64,
}

impl Lfo {
    pub fn new(sample_rate: f64) -> Self {
        let mut lfo = Lfo {
            rate: 1.0,
            depth: 0.5,
            target: LfoTarget::Volume,
            sync_to_host: false,
            host_bpm: 120.0,
            last_position: None,
            phase: 0.0,
            phase_increment: 0.0,
            sample_rate,
        };
        lfo.update_phase_increment();
        lfo
    }

    pub fn prepare(&mut self, sample_rate: f64, _block_size: usize) {
        self.sample_rate = sample_rate;
        self.update_phase_increment();
        self.reset();
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.last_position = None;
    }

    /// Current value, then advance the phase by one sample.
    pub fn process_sample(&mut self) -> f32 {
        let value = self.depth * (2.0 * PI * self.phase).sin();

        self.phase += self.phase_increment;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        value as f32
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate.clamp(0.01, 100.0);
        self.update_phase_increment();
    }

    pub fn set_depth(&mut self, depth: f64) {
        self.depth = depth.clamp(0.0, 1.0);
    }

    pub fn set_target(&mut self, target: LfoTarget) {
        self.target = target;
    }

    /// Toggling sync forgets the last host position, so the next report
    /// locks the phase even if the position has not moved.
    pub fn set_sync_to_host(&mut self, sync: bool) {
        if sync != self.sync_to_host {
            self.last_position = None;
        }
        self.sync_to_host = sync;
        self.update_phase_increment();
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    pub fn target(&self) -> LfoTarget {
        self.target
    }

    pub fn sync_to_host(&self) -> bool {
        self.sync_to_host
    }

    pub fn set_host_bpm(&mut self, bpm: f64) {
        if bpm > 0.0 && bpm.is_finite() {
            self.host_bpm = bpm;
            if self.sync_to_host {
                self.update_phase_increment();
            }
        }
    }

    pub fn host_bpm(&self) -> f64 {
        self.host_bpm
    }

    /// Report the host's beat position. When synced, a new position locks
    /// the phase to its fractional part, so loops and seeks stay aligned.
    pub fn set_host_position(&mut self, beat_position: f64) {
        if !self.sync_to_host || self.last_position == Some(beat_position) {
            return;
        }
        self.last_position = Some(beat_position);
        self.phase = beat_position.rem_euclid(1.0);
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn phase_increment(&self) -> f64 {
        self.phase_increment
    }

    fn update_phase_increment(&mut self) {
        let hz = if self.sync_to_host {
            // rate 1.0 = quarter notes, 2.0 = eighths, 0.5 = halves
            self.host_bpm / 60.0 * self.rate
        } else {
            self.rate
        };
        self.phase_increment = hz / self.sample_rate;
    }
}
