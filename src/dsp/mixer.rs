//! Output gain and dry/wet cross-fade.

/// Levels at or below this are treated as silence.
const MINUS_INFINITY_DB: f32 = -100.0;

/// Convert decibels to a linear gain factor.
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    if db > MINUS_INFINITY_DB {
        10.0_f32.powf(db * 0.05)
    } else {
        0.0
    }
}

/// Final gain and dry/wet mix applied at the end of the chain.
#[derive(Debug, Clone)]
pub struct OutputStage {
    /// Output level in dB [-70, +6].
    level_db: f32,
    gain: f32,
    /// Dry/wet mix (0.0 = fully dry, 1.0 = fully wet).
    dry_wet: f32,
}

impl OutputStage {
    pub fn new() -> Self {
        OutputStage {
            level_db: 0.0,
            gain: 1.0,
            dry_wet: 1.0,
        }
    }

    pub fn set_level_db(&mut self, db: f32) {
        self.level_db = db.clamp(-70.0, 6.0);
        self.gain = db_to_gain(self.level_db);
    }

    pub fn level_db(&self) -> f32 {
        self.level_db
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_dry_wet(&mut self, mix: f32) {
        self.dry_wet = mix.clamp(0.0, 1.0);
    }

    pub fn dry_wet(&self) -> f32 {
        self.dry_wet
    }

    /// Whether the dry signal participates in the output.
    pub fn needs_dry(&self) -> bool {
        self.dry_wet < 1.0
    }

    pub fn apply_gain(&self, buffer: &mut [&mut [f32]], num_samples: usize) {
        if self.gain == 1.0 {
            return;
        }
        for channel in buffer.iter_mut() {
            let n = num_samples.min(channel.len());
            for sample in channel[..n].iter_mut() {
                *sample *= self.gain;
            }
        }
    }

    /// Linear cross-fade of the processed buffer with the dry snapshot.
    pub fn mix_dry(&self, buffer: &mut [&mut [f32]], dry: &[Vec<f32>], num_samples: usize) {
        if !self.needs_dry() {
            return;
        }
        let wet = self.dry_wet;
        for (channel, dry_channel) in buffer.iter_mut().zip(dry) {
            let n = num_samples.min(channel.len()).min(dry_channel.len());
            for (sample, &d) in channel[..n].iter_mut().zip(&dry_channel[..n]) {
                *sample = d * (1.0 - wet) + *sample * wet;
            }
        }
    }
}

impl Default for OutputStage {
    fn default() -> Self {
        Self::new()
    }
}
