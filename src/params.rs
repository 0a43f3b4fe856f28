//! Parameter feed: ids, ranges, defaults and a serializable snapshot.
//!
//! The ids match the host-facing parameter layout (`noiseType`, `cutoff`,
//! `dryWet`, ...). A host can either push single scalars through
//! [`ParamId`] or hand over a whole [`EngineParams`] snapshot as JSON.

use serde::{Deserialize, Serialize};

use crate::dsp::engine::TriggerMode;
use crate::dsp::filter::FilterType;
use crate::dsp::lfo::LfoTarget;
use crate::dsp::noise::NoiseType;
use crate::error::NoiseLabError;

/// Every named parameter of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    NoiseType,
    TriggerMode,
    Attack,
    Decay,
    Sustain,
    Release,
    LfoRate,
    LfoDepth,
    LfoSync,
    LfoTarget,
    FilterType,
    Cutoff,
    Resonance,
    FilterModAmount,
    Drive,
    Bitcrush,
    Width,
    Output,
    DryWet,
}

impl ParamId {
    /// Application order for full snapshots: the trigger mode goes last so
    /// a free-running drone starts with its final envelope settings.
    pub const ALL: [ParamId; 19] = [
        ParamId::NoiseType,
        ParamId::Attack,
        ParamId::Decay,
        ParamId::Sustain,
        ParamId::Release,
        ParamId::LfoRate,
        ParamId::LfoDepth,
        ParamId::LfoSync,
        ParamId::LfoTarget,
        ParamId::FilterType,
        ParamId::Cutoff,
        ParamId::Resonance,
        ParamId::FilterModAmount,
        ParamId::Drive,
        ParamId::Bitcrush,
        ParamId::Width,
        ParamId::Output,
        ParamId::DryWet,
        ParamId::TriggerMode,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ParamId::NoiseType => "noiseType",
            ParamId::TriggerMode => "triggerMode",
            ParamId::Attack => "attack",
            ParamId::Decay => "decay",
            ParamId::Sustain => "sustain",
            ParamId::Release => "release",
            ParamId::LfoRate => "lfoRate",
            ParamId::LfoDepth => "lfoDepth",
            ParamId::LfoSync => "lfoSync",
            ParamId::LfoTarget => "lfoTarget",
            ParamId::FilterType => "filterType",
            ParamId::Cutoff => "cutoff",
            ParamId::Resonance => "resonance",
            ParamId::FilterModAmount => "filterModAmount",
            ParamId::Drive => "drive",
            ParamId::Bitcrush => "bitcrush",
            ParamId::Width => "width",
            ParamId::Output => "output",
            ParamId::DryWet => "dryWet",
        }
    }

    pub fn from_id(id: &str) -> Result<Self, NoiseLabError> {
        Self::ALL
            .into_iter()
            .find(|p| p.id() == id)
            .ok_or_else(|| NoiseLabError::UnknownParameter(id.to_string()))
    }

    /// Inclusive value range. Choices span their index range.
    pub fn range(self) -> (f32, f32) {
        match self {
            ParamId::NoiseType => (0.0, 4.0),
            ParamId::TriggerMode => (0.0, 3.0),
            ParamId::Attack => (1.0, 10_000.0),
            ParamId::Decay => (1.0, 30_000.0),
            ParamId::Sustain => (0.0, 1.0),
            ParamId::Release => (1.0, 30_000.0),
            ParamId::LfoRate => (0.1, 50.0),
            ParamId::LfoDepth => (0.0, 1.0),
            ParamId::LfoSync => (0.0, 1.0),
            ParamId::LfoTarget => (0.0, 3.0),
            ParamId::FilterType => (0.0, 2.0),
            ParamId::Cutoff => (20.0, 20_000.0),
            ParamId::Resonance => (0.0, 1.0),
            ParamId::FilterModAmount => (-1.0, 1.0),
            ParamId::Drive => (0.0, 1.0),
            ParamId::Bitcrush => (1.0, 16.0),
            ParamId::Width => (0.0, 2.0),
            ParamId::Output => (-70.0, 6.0),
            ParamId::DryWet => (0.0, 1.0),
        }
    }

    pub fn default_value(self) -> f32 {
        EngineParams::default().value(self)
    }

    /// Whether the value is an enumeration index rather than a scalar.
    pub fn is_choice(self) -> bool {
        matches!(
            self,
            ParamId::NoiseType | ParamId::TriggerMode | ParamId::LfoTarget | ParamId::FilterType
        )
    }

    pub fn clamp(self, value: f32) -> f32 {
        let (lo, hi) = self.range();
        value.clamp(lo, hi)
    }
}

/// A complete parameter snapshot. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineParams {
    pub noise_type: NoiseType,
    pub trigger_mode: TriggerMode,
    /// Attack time in milliseconds.
    pub attack: f32,
    /// Decay time in milliseconds.
    pub decay: f32,
    /// Sustain level [0, 1].
    pub sustain: f32,
    /// Release time in milliseconds.
    pub release: f32,
    /// Hz when free-running, beat multiplier when synced.
    pub lfo_rate: f32,
    pub lfo_depth: f32,
    pub lfo_sync: bool,
    pub lfo_target: LfoTarget,
    pub filter_type: FilterType,
    /// Cutoff in Hz.
    pub cutoff: f32,
    pub resonance: f32,
    pub filter_mod_amount: f32,
    pub drive: f32,
    /// Bit depth [1, 16].
    pub bitcrush: f32,
    pub width: f32,
    /// Output level in dB.
    pub output: f32,
    pub dry_wet: f32,
}

impl Default for EngineParams {
    fn default() -> Self {
        EngineParams {
            noise_type: NoiseType::White,
            trigger_mode: TriggerMode::MidiTriggered,
            attack: 10.0,
            decay: 100.0,
            sustain: 0.7,
            release: 500.0,
            lfo_rate: 1.0,
            lfo_depth: 0.0,
            lfo_sync: false,
            lfo_target: LfoTarget::Volume,
            filter_type: FilterType::LowPass,
            cutoff: 1000.0,
            resonance: 0.5,
            filter_mod_amount: 1.0,
            drive: 0.0,
            bitcrush: 16.0,
            width: 1.0,
            output: 0.0,
            dry_wet: 1.0,
        }
    }
}

impl EngineParams {
    pub fn from_json(json: &str) -> Result<Self, NoiseLabError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, NoiseLabError> {
        Ok(serde_json::to_string(self)?)
    }

    /// The scalar form of one parameter, as a host feed would carry it.
    pub fn value(&self, id: ParamId) -> f32 {
        match id {
            ParamId::NoiseType => self.noise_type.index() as f32,
            ParamId::TriggerMode => self.trigger_mode.index() as f32,
            ParamId::Attack => self.attack,
            ParamId::Decay => self.decay,
            ParamId::Sustain => self.sustain,
            ParamId::Release => self.release,
            ParamId::LfoRate => self.lfo_rate,
            ParamId::LfoDepth => self.lfo_depth,
            ParamId::LfoSync => {
                if self.lfo_sync {
                    1.0
                } else {
                    0.0
                }
            }
            ParamId::LfoTarget => self.lfo_target.index() as f32,
            ParamId::FilterType => self.filter_type.index() as f32,
            ParamId::Cutoff => self.cutoff,
            ParamId::Resonance => self.resonance,
            ParamId::FilterModAmount => self.filter_mod_amount,
            ParamId::Drive => self.drive,
            ParamId::Bitcrush => self.bitcrush,
            ParamId::Width => self.width,
            ParamId::Output => self.output,
            ParamId::DryWet => self.dry_wet,
        }
    }

    /// Store a scalar from the feed. Scalars are clamped to their range;
    /// choice indices outside their range are rejected.
    pub fn set(&mut self, id: ParamId, value: f32) -> Result<(), NoiseLabError> {
        let index = value.round() as i32;
        let invalid = || NoiseLabError::InvalidChoice {
            parameter: id.id(),
            index,
        };
        let v = id.clamp(value);
        match id {
            ParamId::NoiseType => self.noise_type = NoiseType::from_index(index).ok_or_else(invalid)?,
            ParamId::TriggerMode => {
                self.trigger_mode = TriggerMode::from_index(index).ok_or_else(invalid)?
            }
            ParamId::LfoTarget => self.lfo_target = LfoTarget::from_index(index).ok_or_else(invalid)?,
            ParamId::FilterType => {
                self.filter_type = FilterType::from_index(index).ok_or_else(invalid)?
            }
            ParamId::Attack => self.attack = v,
            ParamId::Decay => self.decay = v,
            ParamId::Sustain => self.sustain = v,
            ParamId::Release => self.release = v,
            ParamId::LfoRate => self.lfo_rate = v,
            ParamId::LfoDepth => self.lfo_depth = v,
            ParamId::LfoSync => self.lfo_sync = value >= 0.5,
            ParamId::Cutoff => self.cutoff = v,
            ParamId::Resonance => self.resonance = v,
            ParamId::FilterModAmount => self.filter_mod_amount = v,
            ParamId::Drive => self.drive = v,
            ParamId::Bitcrush => self.bitcrush = v,
            ParamId::Width => self.width = v,
            ParamId::Output => self.output = v,
            ParamId::DryWet => self.dry_wet = v,
        }
        Ok(())
    }
}
