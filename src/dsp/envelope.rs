//! ADSR Envelope generator with retrigger and one-shot semantics.

/// Tolerance for stage-boundary comparisons, so a stage of `n` samples
/// completes after exactly `n` steps despite accumulation error.
const STAGE_EPSILON: f64 = 1e-9;

/// Shortest accepted stage time in milliseconds.
const MIN_TIME_MS: f64 = 0.1;

/// Envelope stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// ADSR Envelope with linear attack/decay/release segments.
///
/// Segments are driven by per-sample rates derived from the stage times,
/// so changing a time mid-stage changes the slope without a jump in level.
#[derive(Debug, Clone)]
pub struct Envelope {
    attack_ms: f64,
    decay_ms: f64,
    sustain: f64,
    release_ms: f64,

    stage: Stage,
    level: f64,
    velocity: f64,
    sample_rate: f64,

    attack_rate: f64,
    decay_rate: f64,
    release_rate: f64,

    one_shot: bool,
    note_on: bool,
}

impl Envelope {
    pub fn new(sample_rate: f64) -> Self {
        let mut env = Envelope {
            attack_ms: 10.0,
            decay_ms: 100.0,
            sustain: 0.7,
            release_ms: 500.0,
            stage: Stage::Idle,
            level: 0.0,
            velocity: 0.0,
            sample_rate,
            attack_rate: 0.0,
            decay_rate: 0.0,
            release_rate: 0.0,
            one_shot: false,
            note_on: false,
        };
        env.calculate_rates();
        env
    }

    pub fn prepare(&mut self, sample_rate: f64, _block_size: usize) {
        self.sample_rate = sample_rate;
        self.calculate_rates();
        self.reset();
    }

    /// Hard reset to Idle; any held note is forgotten.
    pub fn reset(&mut self) {
        self.stage = Stage::Idle;
        self.level = 0.0;
        self.note_on = false;
    }

    /// Trigger the envelope. Always restarts the attack from the current level.
    pub fn note_on(&mut self, velocity: f64) {
        self.velocity = velocity.clamp(0.0, 1.0);
        self.note_on = true;
        self.stage = Stage::Attack;
    }

    /// Release the note. Attack and decay still run to completion.
    pub fn note_off(&mut self) {
        self.note_on = false;
        if self.stage == Stage::Sustain {
            self.stage = Stage::Release;
        }
    }

    /// Set all four parameters at once (times in milliseconds).
    pub fn set_parameters(&mut self, attack_ms: f64, decay_ms: f64, sustain: f64, release_ms: f64) {
        self.attack_ms = attack_ms.max(MIN_TIME_MS);
        self.decay_ms = decay_ms.max(MIN_TIME_MS);
        self.sustain = sustain.clamp(0.0, 1.0);
        self.release_ms = release_ms.max(MIN_TIME_MS);
        self.calculate_rates();
    }

    pub fn set_attack(&mut self, attack_ms: f64) {
        self.set_parameters(attack_ms, self.decay_ms, self.sustain, self.release_ms);
    }

    pub fn set_decay(&mut self, decay_ms: f64) {
        self.set_parameters(self.attack_ms, decay_ms, self.sustain, self.release_ms);
    }

    pub fn set_sustain(&mut self, sustain: f64) {
        self.set_parameters(self.attack_ms, self.decay_ms, sustain, self.release_ms);
    }

    pub fn set_release(&mut self, release_ms: f64) {
        self.set_parameters(self.attack_ms, self.decay_ms, self.sustain, release_ms);
    }

    pub fn attack(&self) -> f64 {
        self.attack_ms
    }

    pub fn decay(&self) -> f64 {
        self.decay_ms
    }

    pub fn sustain(&self) -> f64 {
        self.sustain
    }

    pub fn release(&self) -> f64 {
        self.release_ms
    }

    /// In one-shot mode the envelope skips Sustain and releases as soon
    /// as the decay reaches the sustain level.
    pub fn set_one_shot(&mut self, one_shot: bool) {
        self.one_shot = one_shot;
    }

    pub fn is_one_shot(&self) -> bool {
        self.one_shot
    }

    pub fn is_active(&self) -> bool {
        self.stage != Stage::Idle
    }

    pub fn is_note_on(&self) -> bool {
        self.note_on
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Step the state machine by one sample and return the gain to apply.
    pub fn advance(&mut self) -> f32 {
        match self.stage {
            Stage::Idle => {}
            Stage::Attack => {
                self.level += self.attack_rate;
                if self.level >= 1.0 - STAGE_EPSILON {
                    self.level = 1.0;
                    self.stage = Stage::Decay;
                }
            }
            Stage::Decay => {
                self.level -= self.decay_rate;
                if self.level <= self.sustain + STAGE_EPSILON {
                    self.level = self.sustain;
                    self.stage = if self.one_shot {
                        Stage::Release
                    } else {
                        Stage::Sustain
                    };
                }
            }
            Stage::Sustain => {
                if !self.note_on {
                    self.stage = Stage::Release;
                }
            }
            Stage::Release => {
                self.level -= self.release_rate;
                if self.level <= STAGE_EPSILON {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                }
            }
        }
        (self.level * self.velocity) as f32
    }

    /// Apply the envelope in place to every channel.
    pub fn process(&mut self, buffer: &mut [&mut [f32]], num_samples: usize) {
        if self.stage == Stage::Idle && !self.note_on {
            for channel in buffer.iter_mut() {
                let n = num_samples.min(channel.len());
                channel[..n].fill(0.0);
            }
            return;
        }

        for i in 0..num_samples {
            let gain = self.advance();
            for channel in buffer.iter_mut() {
                if let Some(sample) = channel.get_mut(i) {
                    *sample *= gain;
                }
            }
        }
    }

    fn calculate_rates(&mut self) {
        let samples_per_ms = 0.001 * self.sample_rate;
        self.attack_rate = 1.0 / (self.attack_ms * samples_per_ms);
        self.decay_rate = (1.0 - self.sustain) / (self.decay_ms * samples_per_ms);
        self.release_rate = 1.0 / (self.release_ms * samples_per_ms);
    }
}
