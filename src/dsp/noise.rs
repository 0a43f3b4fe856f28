//! Noise sources: white, pink, brown, digital crunch and analog-style noise.

use std::f64::consts::PI;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Number of Voss-McCartney register cells used for pink noise.
const PINK_STAGES: usize = 8;
/// The pink counter wraps here; every cell is refreshed well before.
const PINK_COUNTER_WRAP: u32 = 32768;

/// Cutoff of the "circuit" lowpass in the analog simulation, in Hz.
const ANALOG_CUTOFF: f64 = 7000.0;
const ANALOG_HISS: f32 = 0.15;

/// Noise colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoiseType {
    #[default]
    White,
    Pink,
    Brown,
    DigitalCrunch,
    AnalogSimulation,
}

impl NoiseType {
    pub const ALL: [NoiseType; 5] = [
        NoiseType::White,
        NoiseType::Pink,
        NoiseType::Brown,
        NoiseType::DigitalCrunch,
        NoiseType::AnalogSimulation,
    ];

    /// Map a choice index from the parameter feed.
    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn index(self) -> i32 {
        self as i32
    }
}

/// A single-owner noise generator. Every variant keeps its own state so
/// switching colors mid-stream picks up where that color left off.
#[derive(Debug, Clone)]
pub struct NoiseSource {
    noise_type: NoiseType,
    sample_rate: f64,
    rng: SmallRng,

    pink_cells: [f32; PINK_STAGES],
    pink_counter: u32,

    brown_state: f32,

    crunch_bits: u32,
    crunch_rate: f64,
    crunch_phase: f64,
    crunch_held: f32,

    analog_prev: f32,
    analog_filter: f32,
    analog_alpha: f32,
}

impl NoiseSource {
    /// Create a source seeded from OS entropy.
    pub fn new() -> Self {
        Self::from_rng(SmallRng::from_entropy())
    }

    /// Create a source with a fixed seed (reproducible output).
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(SmallRng::seed_from_u64(seed))
    }

    fn from_rng(rng: SmallRng) -> Self {
        let mut source = NoiseSource {
            noise_type: NoiseType::White,
            sample_rate: 44100.0,
            rng,
            pink_cells: [0.0; PINK_STAGES],
            pink_counter: 0,
            brown_state: 0.0,
            crunch_bits: 8,
            crunch_rate: 22050.0,
            crunch_phase: 0.0,
            crunch_held: 0.0,
            analog_prev: 0.0,
            analog_filter: 0.0,
            analog_alpha: 0.0,
        };
        source.update_analog_alpha();
        source
    }

    pub fn prepare(&mut self, sample_rate: f64, _block_size: usize) {
        self.sample_rate = sample_rate;
        self.update_analog_alpha();
        self.reset();
    }

    /// Zero all generator state. The RNG is not reseeded.
    pub fn reset(&mut self) {
        self.pink_cells = [0.0; PINK_STAGES];
        self.pink_counter = 0;
        self.brown_state = 0.0;
        self.crunch_phase = 0.0;
        self.crunch_held = 0.0;
        self.analog_prev = 0.0;
        self.analog_filter = 0.0;
    }

    pub fn set_noise_type(&mut self, noise_type: NoiseType) {
        self.noise_type = noise_type;
    }

    pub fn noise_type(&self) -> NoiseType {
        self.noise_type
    }

    /// Bit depth of the digital crunch quantizer, clamped to [1, 16].
    pub fn set_crunch_bits(&mut self, bits: u32) {
        self.crunch_bits = bits.clamp(1, 16);
    }

    pub fn crunch_bits(&self) -> u32 {
        self.crunch_bits
    }

    /// Emulated sample rate of the digital crunch decimator, in Hz.
    pub fn set_crunch_rate(&mut self, rate: f64) {
        self.crunch_rate = rate.clamp(1.0, 192_000.0);
    }

    pub fn crunch_rate(&self) -> f64 {
        self.crunch_rate
    }

    /// Generate one sample of the current noise color.
    pub fn next_sample(&mut self) -> f32 {
        match self.noise_type {
            NoiseType::White => self.white(),
            NoiseType::Pink => self.pink(),
            NoiseType::Brown => self.brown(),
            NoiseType::DigitalCrunch => self.digital_crunch(),
            NoiseType::AnalogSimulation => self.analog(),
        }
    }

    /// Overwrite `num_samples` of every channel with fresh noise.
    pub fn process(&mut self, buffer: &mut [&mut [f32]], num_samples: usize) {
        for channel in buffer.iter_mut() {
            let n = num_samples.min(channel.len());
            for sample in channel[..n].iter_mut() {
                *sample = self.next_sample();
            }
        }
    }

    #[inline]
    fn white(&mut self) -> f32 {
        self.rng.gen_range(-1.0_f32..=1.0)
    }

    /// Voss-McCartney: the counter's bit pattern decides which cells get a
    /// fresh draw this sample.
    fn pink(&mut self) -> f32 {
        let white = self.white();
        self.pink_counter = (self.pink_counter + 1) % PINK_COUNTER_WRAP;

        let mut sum = 0.0;
        for (i, cell) in self.pink_cells.iter_mut().enumerate() {
            if self.pink_counter & (1 << i) == 0 {
                *cell = white;
            }
            sum += *cell;
        }
        sum * 0.125
    }

    fn brown(&mut self) -> f32 {
        let white = self.white();
        self.brown_state = (self.brown_state + 0.02 * white) / 1.02;
        // Re-normalize after the heavy integration; not clipped.
        self.brown_state * 3.5
    }

    fn digital_crunch(&mut self) -> f32 {
        let white = self.white();
        let scale = 2.0_f32.powi(self.crunch_bits as i32 - 1) - 1.0;
        let quantized = if scale > 0.0 {
            (white * scale).round() / scale
        } else {
            // One bit leaves a single level: the sign.
            white.signum()
        };

        self.crunch_phase += self.crunch_rate / self.sample_rate;
        if self.crunch_phase >= 1.0 {
            self.crunch_phase -= self.crunch_phase.floor();
            self.crunch_held = quantized;
        }
        self.crunch_held
    }

    fn analog(&mut self) -> f32 {
        let correlated = 0.85 * self.analog_prev + 0.15 * self.white();
        self.analog_prev = correlated;

        self.analog_filter =
            self.analog_alpha * self.analog_filter + (1.0 - self.analog_alpha) * correlated;
        let colored = (self.analog_filter * 1.5).tanh();

        let hiss = (self.white() * ANALOG_HISS).clamp(-ANALOG_HISS, ANALOG_HISS);
        colored + hiss
    }

    fn update_analog_alpha(&mut self) {
        self.analog_alpha = (1.0 / (1.0 + 2.0 * PI * (ANALOG_CUTOFF / self.sample_rate))) as f32;
    }
}

impl Default for NoiseSource {
    fn default() -> Self {
        Self::new()
    }
}
