//! Resonant state-variable filter with runtime cutoff/resonance modulation.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

const MIN_CUTOFF: f64 = 20.0;
const MAX_CUTOFF: f64 = 20000.0;
/// Resonance never drops below this inside the coefficient math.
const RESONANCE_FLOOR: f64 = 0.1;
/// Number of octaves swept by a full-scale modulation at amount 1.0.
const MOD_OCTAVES: f64 = 10.0;

/// Filter response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterType {
    #[default]
    LowPass,
    BandPass,
    HighPass,
}

impl FilterType {
    pub const ALL: [FilterType; 3] = [FilterType::LowPass, FilterType::BandPass, FilterType::HighPass];

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn index(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Coefficients {
    a0: f64,
    a1: f64,
    a2: f64,
    b1: f64,
    b2: f64,
    /// Bandpass tap gain, `k / q`.
    band_gain: f64,
}

/// Two-integrator state-variable filter, one memory pair per channel.
///
/// Implements the Direct Form II Transposed realization; low, band and
/// high-pass are all tapped from the same lowpass core.
#[derive(Debug, Clone)]
pub struct ResonantFilter {
    filter_type: FilterType,
    cutoff: f64,
    resonance: f64,
    modulation_amount: f64,

    modulated_cutoff: f64,
    modulated_resonance: f64,

    coeffs: Coefficients,
    z1: [f64; 2],
    z2: [f64; 2],

    sample_rate: f64,
    dirty: bool,
}

impl ResonantFilter {
    pub fn new(sample_rate: f64) -> Self {
        let mut f = ResonantFilter {
            filter_type: FilterType::LowPass,
            cutoff: 1000.0,
            resonance: 0.5,
            modulation_amount: 1.0,
            modulated_cutoff: 1000.0,
            modulated_resonance: 0.5,
            coeffs: Coefficients::default(),
            z1: [0.0; 2],
            z2: [0.0; 2],
            sample_rate,
            dirty: true,
        };
        f.update_coefficients();
        f
    }

    pub fn prepare(&mut self, sample_rate: f64, _block_size: usize) {
        self.sample_rate = sample_rate;
        self.reset();
        self.update_coefficients();
    }

    /// Clear the filter memory of both channels.
    pub fn reset(&mut self) {
        self.z1 = [0.0; 2];
        self.z2 = [0.0; 2];
    }

    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.filter_type = filter_type;
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    /// Base cutoff in Hz, clamped to [20, 20000].
    pub fn set_cutoff(&mut self, cutoff: f64) {
        self.cutoff = cutoff.clamp(MIN_CUTOFF, MAX_CUTOFF);
        self.modulated_cutoff = self.cutoff;
        self.dirty = true;
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Base resonance, clamped to [0, 1].
    pub fn set_resonance(&mut self, resonance: f64) {
        self.resonance = resonance.clamp(0.0, 1.0);
        self.modulated_resonance = self.resonance;
        self.dirty = true;
    }

    pub fn resonance(&self) -> f64 {
        self.resonance
    }

    /// Signed cutoff modulation amount in [-1, 1]; negative inverts the sweep.
    pub fn set_modulation_amount(&mut self, amount: f64) {
        self.modulation_amount = amount.clamp(-1.0, 1.0);
    }

    pub fn modulation_amount(&self) -> f64 {
        self.modulation_amount
    }

    pub fn modulated_cutoff(&self) -> f64 {
        self.modulated_cutoff
    }

    pub fn modulated_resonance(&self) -> f64 {
        self.modulated_resonance
    }

    /// Sweep the cutoff by `value` in [-1, 1] on an octave scale around the base.
    pub fn apply_modulation(&mut self, value: f32) {
        let octaves = MOD_OCTAVES * self.modulation_amount.abs();
        let mut multiplier = 2.0_f64.powf(value as f64 * octaves);
        if self.modulation_amount < 0.0 {
            multiplier = 1.0 / multiplier;
        }
        self.modulated_cutoff = (self.cutoff * multiplier).clamp(MIN_CUTOFF, MAX_CUTOFF);
        self.dirty = true;
    }

    /// Perturb the resonance by up to ±50% of its base value.
    pub fn apply_resonance_modulation(&mut self, value: f32) {
        self.modulated_resonance = (self.resonance * (1.0 + value as f64 * 0.5)).clamp(0.01, 1.0);
        self.dirty = true;
    }

    /// Drop any modulation and return to the base cutoff and resonance.
    pub fn clear_modulation(&mut self) {
        if self.modulated_cutoff != self.cutoff || self.modulated_resonance != self.resonance {
            self.modulated_cutoff = self.cutoff;
            self.modulated_resonance = self.resonance;
            self.dirty = true;
        }
    }

    /// Recompute coefficients from the modulated cutoff and resonance.
    pub fn update_coefficients(&mut self) {
        let f = (self.modulated_cutoff / self.sample_rate).clamp(0.001, 0.499);
        let k = (PI * f).tan();
        let q = self.modulated_resonance.max(RESONANCE_FLOOR);
        let k2 = k * k;
        let norm = 1.0 / (1.0 + k / q + k2);

        let a0 = k2 * norm;
        self.coeffs = Coefficients {
            a0,
            a1: 2.0 * a0,
            a2: a0,
            b1: 2.0 * (k2 - 1.0) * norm,
            b2: (1.0 - k / q + k2) * norm,
            band_gain: k / q,
        };
        self.dirty = false;
    }

    /// Filter one sample of `channel` (0 or 1).
    pub fn process_sample(&mut self, input: f32, channel: usize) -> f32 {
        if self.dirty {
            self.update_coefficients();
        }
        let ch = channel.min(1);
        let c = self.coeffs;
        let input = input as f64;

        let output = c.a0 * input + self.z1[ch];
        self.z1[ch] = c.a1 * input - c.b1 * output + self.z2[ch];
        self.z2[ch] = c.a2 * input - c.b2 * output;

        let tapped = match self.filter_type {
            FilterType::LowPass => output,
            FilterType::BandPass => c.band_gain * (input - output),
            FilterType::HighPass => input - output,
        };
        tapped as f32
    }

    pub fn process(&mut self, buffer: &mut [&mut [f32]], num_samples: usize) {
        for (ch, channel) in buffer.iter_mut().take(2).enumerate() {
            let n = num_samples.min(channel.len());
            for sample in channel[..n].iter_mut() {
                *sample = self.process_sample(*sample, ch);
            }
        }
    }
}
