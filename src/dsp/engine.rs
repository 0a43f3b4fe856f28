//! Signal chain. Runs one audio block through noise, envelope, LFO routing,
//! filter, effects and the output stage.
//!
//! The chain owns one instance of every component. `prepare` sizes all
//! scratch memory; `process` never allocates, blocks or logs.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::NoiseLabError;
use crate::events::{HeldNotes, MAX_NOTE_ID, NoteEvent, TransportInfo};
use crate::params::{EngineParams, ParamId};

use super::effects::EffectsStage;
use super::envelope::Envelope;
use super::filter::{FilterType, ResonantFilter};
use super::lfo::{Lfo, LfoTarget};
use super::mixer::OutputStage;
use super::noise::{NoiseSource, NoiseType};

/// How the envelope gets triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerMode {
    /// Continuous drone: triggered once, note events ignored.
    FreeRun,
    /// Notes open and close the envelope.
    #[default]
    MidiTriggered,
    /// Notes as in `MidiTriggered`, plus transport start/stop gating.
    HostSync,
    /// Notes trigger an attack-decay-release shot with no sustain.
    OneShot,
}

impl TriggerMode {
    pub const ALL: [TriggerMode; 4] = [
        TriggerMode::FreeRun,
        TriggerMode::MidiTriggered,
        TriggerMode::HostSync,
        TriggerMode::OneShot,
    ];

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn index(self) -> i32 {
        self as i32
    }
}

/// The mono/stereo noise synthesis chain.
#[derive(Debug, Clone)]
pub struct SignalChain {
    noise: NoiseSource,
    envelope: Envelope,
    lfo: Lfo,
    filter: ResonantFilter,
    effects: EffectsStage,
    output: OutputStage,

    trigger_mode: TriggerMode,
    held_notes: HeldNotes,
    transport: TransportInfo,

    /// Pre-processing snapshot for the dry/wet mix, one per channel.
    dry: [Vec<f32>; 2],
    sample_rate: f64,
    block_size: usize,
}

impl SignalChain {
    pub fn new(sample_rate: f64) -> Self {
        Self::with_noise_source(NoiseSource::new(), sample_rate)
    }

    /// Build a chain around a specific noise source (e.g. a seeded one).
    pub fn with_noise_source(noise: NoiseSource, sample_rate: f64) -> Self {
        let mut chain = SignalChain {
            noise,
            envelope: Envelope::new(sample_rate),
            lfo: Lfo::new(sample_rate),
            filter: ResonantFilter::new(sample_rate),
            effects: EffectsStage::new(),
            output: OutputStage::new(),
            trigger_mode: TriggerMode::MidiTriggered,
            held_notes: HeldNotes::new(),
            transport: TransportInfo::default(),
            dry: [Vec::new(), Vec::new()],
            sample_rate,
            block_size: 0,
        };
        chain.prepare(sample_rate, 512);
        chain.apply_params(&EngineParams::default());
        chain
    }

    /// Re-initialize every component for a new sample rate / block size.
    /// Must run off the audio thread before streaming.
    pub fn prepare(&mut self, sample_rate: f64, block_size: usize) {
        self.sample_rate = sample_rate;
        self.block_size = block_size.max(1);

        self.noise.prepare(sample_rate, self.block_size);
        self.envelope.prepare(sample_rate, self.block_size);
        self.lfo.prepare(sample_rate, self.block_size);
        self.filter.prepare(sample_rate, self.block_size);
        self.effects.prepare(sample_rate, self.block_size);

        for channel in self.dry.iter_mut() {
            channel.clear();
            channel.resize(self.block_size, 0.0);
        }
        self.held_notes.clear();

        // The envelope was reset; a drone has to be re-armed.
        if self.trigger_mode == TriggerMode::FreeRun {
            self.envelope.note_on(1.0);
        }
        debug!(sample_rate, block_size = self.block_size, "signal chain prepared");
    }

    /// Validate a configuration, then `prepare` with it.
    pub fn prepare_with(&mut self, config: &EngineConfig) -> Result<(), NoiseLabError> {
        config.validate()?;
        self.prepare(config.sample_rate, config.block_size);
        Ok(())
    }

    /// Stream stop: zero transient state without releasing memory.
    pub fn reset(&mut self) {
        self.noise.reset();
        self.envelope.reset();
        self.lfo.reset();
        self.filter.reset();
        self.effects.reset();
        self.held_notes.clear();
        if self.trigger_mode == TriggerMode::FreeRun {
            self.envelope.note_on(1.0);
        }
        debug!("signal chain reset");
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    // ── Trigger mode ────────────────────────────────────────

    pub fn set_trigger_mode(&mut self, mode: TriggerMode) {
        if mode == self.trigger_mode {
            return;
        }
        self.trigger_mode = mode;
        self.envelope.set_one_shot(mode == TriggerMode::OneShot);
        match mode {
            TriggerMode::FreeRun => self.envelope.note_on(1.0),
            TriggerMode::MidiTriggered => {
                self.envelope.reset();
                self.held_notes.clear();
            }
            TriggerMode::HostSync | TriggerMode::OneShot => {}
        }
        info!(?mode, "trigger mode changed");
    }

    pub fn trigger_mode(&self) -> TriggerMode {
        self.trigger_mode
    }

    // ── Events ──────────────────────────────────────────────

    /// Interpret one note event according to the trigger mode. Note ids
    /// above `MAX_NOTE_ID` are ignored.
    pub fn handle_event(&mut self, event: NoteEvent) {
        match event {
            NoteEvent::NoteOn { id, velocity } => {
                if self.trigger_mode == TriggerMode::FreeRun || id > MAX_NOTE_ID {
                    return;
                }
                self.held_notes.press(id);
                self.envelope.note_on(velocity as f64);
            }
            NoteEvent::NoteOff { id } => {
                if self.trigger_mode == TriggerMode::FreeRun || !self.held_notes.release(id) {
                    return;
                }
                if !self.held_notes.any() {
                    self.envelope.note_off();
                }
            }
            NoteEvent::AllNotesOff => {
                self.held_notes.clear();
                self.envelope.reset();
                if self.trigger_mode == TriggerMode::FreeRun {
                    self.envelope.note_on(1.0);
                }
            }
        }
    }

    /// Feed the transport snapshot for this block to the LFO. In HostSync
    /// mode a start edge triggers the envelope and a stop edge releases it.
    pub fn set_transport(&mut self, transport: TransportInfo) {
        let started = transport.is_playing && !self.transport.is_playing;
        let stopped = !transport.is_playing && self.transport.is_playing;
        self.transport = transport;

        self.lfo.set_host_bpm(transport.bpm);
        self.lfo.set_host_position(transport.beat_position);

        if self.trigger_mode == TriggerMode::HostSync {
            if started {
                self.envelope.note_on(1.0);
            } else if stopped && !self.held_notes.any() {
                self.envelope.note_off();
            }
        }
    }

    pub fn transport(&self) -> TransportInfo {
        self.transport
    }

    pub fn held_notes(&self) -> &HeldNotes {
        &self.held_notes
    }

    // ── Processing ──────────────────────────────────────────

    /// Render one host block in place. `buffer` holds one slice per channel
    /// (mono or stereo) and carries the dry input on entry. Events are
    /// applied at the start of the block.
    pub fn process(
        &mut self,
        buffer: &mut [&mut [f32]],
        events: &[NoteEvent],
        transport: Option<TransportInfo>,
    ) {
        if let Some(transport) = transport {
            self.set_transport(transport);
        }
        for &event in events {
            self.handle_event(event);
        }

        let channels = buffer.len().min(2);
        let buffer = &mut buffer[..channels];
        let total = buffer.iter().map(|c| c.len()).min().unwrap_or(0);

        let mut start = 0;
        while start < total {
            let end = (start + self.block_size).min(total);
            match &mut *buffer {
                [mono] => {
                    let mut chunk: [&mut [f32]; 1] = [&mut mono[start..end]];
                    self.render(&mut chunk);
                }
                [left, right] => {
                    let mut chunk: [&mut [f32]; 2] =
                        [&mut left[start..end], &mut right[start..end]];
                    self.render(&mut chunk);
                }
                _ => return,
            }
            start = end;
        }
    }

    /// One chunk no longer than the prepared block size.
    fn render(&mut self, buffer: &mut [&mut [f32]]) {
        let n = buffer.first().map_or(0, |c| c.len());

        if self.output.needs_dry() {
            for (dry, channel) in self.dry.iter_mut().zip(buffer.iter()) {
                dry[..n].copy_from_slice(&channel[..n]);
            }
        } else {
            for channel in buffer.iter_mut() {
                channel.fill(0.0);
            }
        }

        self.noise.process(buffer, n);
        self.envelope.process(buffer, n);
        self.route_lfo(buffer, n);
        self.filter.process(buffer, n);
        self.effects.process(buffer, n);
        self.output.apply_gain(buffer, n);
        self.output.mix_dry(buffer, &self.dry, n);
    }

    /// Advance the LFO once per sample and deliver it to the target.
    fn route_lfo(&mut self, buffer: &mut [&mut [f32]], n: usize) {
        self.filter.clear_modulation();
        let target = self.lfo.target();
        for i in 0..n {
            let value = self.lfo.process_sample();
            match target {
                LfoTarget::Volume => {
                    let gain = 0.5 + 0.5 * (1.0 + value);
                    for channel in buffer.iter_mut() {
                        channel[i] *= gain;
                    }
                }
                LfoTarget::FilterCutoff => self.filter.apply_modulation(value),
                LfoTarget::FilterResonance => self.filter.apply_resonance_modulation(value),
                LfoTarget::PitchProxy => self.filter.apply_modulation(value * 0.5),
            }
        }
    }

    // ── Parameters ──────────────────────────────────────────

    /// Apply one scalar from the parameter feed.
    pub fn set_parameter(&mut self, id: ParamId, value: f32) -> Result<(), NoiseLabError> {
        let mut params = EngineParams::default();
        params.set(id, value)?;
        self.apply_param(id, &params);
        Ok(())
    }

    /// Look the id up by name, then apply it.
    pub fn set_parameter_by_id(&mut self, id: &str, value: f32) -> Result<(), NoiseLabError> {
        self.set_parameter(ParamId::from_id(id)?, value)
    }

    /// Apply a full snapshot.
    pub fn apply_params(&mut self, params: &EngineParams) {
        for id in ParamId::ALL {
            self.apply_param(id, params);
        }
        debug!(?params, "parameter snapshot applied");
    }

    /// Current parameter values read back from the components.
    pub fn params(&self) -> EngineParams {
        EngineParams {
            noise_type: self.noise.noise_type(),
            trigger_mode: self.trigger_mode,
            attack: self.envelope.attack() as f32,
            decay: self.envelope.decay() as f32,
            sustain: self.envelope.sustain() as f32,
            release: self.envelope.release() as f32,
            lfo_rate: self.lfo.rate() as f32,
            lfo_depth: self.lfo.depth() as f32,
            lfo_sync: self.lfo.sync_to_host(),
            lfo_target: self.lfo.target(),
            filter_type: self.filter.filter_type(),
            cutoff: self.filter.cutoff() as f32,
            resonance: self.filter.resonance() as f32,
            filter_mod_amount: self.filter.modulation_amount() as f32,
            drive: self.effects.drive(),
            bitcrush: self.effects.bitcrush(),
            width: self.effects.stereo_width(),
            output: self.output.level_db(),
            dry_wet: self.output.dry_wet(),
        }
    }

    fn apply_param(&mut self, id: ParamId, p: &EngineParams) {
        match id {
            ParamId::NoiseType => self.noise.set_noise_type(p.noise_type),
            ParamId::TriggerMode => self.set_trigger_mode(p.trigger_mode),
            ParamId::Attack => self.envelope.set_attack(p.attack as f64),
            ParamId::Decay => self.envelope.set_decay(p.decay as f64),
            ParamId::Sustain => self.envelope.set_sustain(p.sustain as f64),
            ParamId::Release => self.envelope.set_release(p.release as f64),
            ParamId::LfoRate => self.lfo.set_rate(p.lfo_rate as f64),
            ParamId::LfoDepth => self.lfo.set_depth(p.lfo_depth as f64),
            ParamId::LfoSync => self.lfo.set_sync_to_host(p.lfo_sync),
            ParamId::LfoTarget => self.lfo.set_target(p.lfo_target),
            ParamId::FilterType => self.filter.set_filter_type(p.filter_type),
            ParamId::Cutoff => self.filter.set_cutoff(p.cutoff as f64),
            ParamId::Resonance => self.filter.set_resonance(p.resonance as f64),
            ParamId::FilterModAmount => self.filter.set_modulation_amount(p.filter_mod_amount as f64),
            ParamId::Drive => self.effects.set_drive(p.drive),
            ParamId::Bitcrush => self.effects.set_bitcrush(p.bitcrush),
            ParamId::Width => self.effects.set_stereo_width(p.width),
            ParamId::Output => self.output.set_level_db(p.output),
            ParamId::DryWet => self.output.set_dry_wet(p.dry_wet),
        }
    }

    // ── Direct access ───────────────────────────────────────

    pub fn set_noise_type(&mut self, noise_type: NoiseType) {
        self.noise.set_noise_type(noise_type);
    }

    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.filter.set_filter_type(filter_type);
    }

    pub fn set_output_level_db(&mut self, db: f32) {
        self.output.set_level_db(db);
    }

    pub fn set_dry_wet(&mut self, mix: f32) {
        self.output.set_dry_wet(mix);
    }

    pub fn noise(&self) -> &NoiseSource {
        &self.noise
    }

    pub fn noise_mut(&mut self) -> &mut NoiseSource {
        &mut self.noise
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    pub fn lfo(&self) -> &Lfo {
        &self.lfo
    }

    pub fn lfo_mut(&mut self) -> &mut Lfo {
        &mut self.lfo
    }

    pub fn filter(&self) -> &ResonantFilter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut ResonantFilter {
        &mut self.filter
    }

    pub fn effects(&self) -> &EffectsStage {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut EffectsStage {
        &mut self.effects
    }

    pub fn output(&self) -> &OutputStage {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::envelope::Stage;

    const SR: f64 = 44100.0;
    const BLOCK: usize = 256;

    fn chain() -> SignalChain {
        let mut c = SignalChain::with_noise_source(NoiseSource::with_seed(42), SR);
        c.prepare(SR, BLOCK);
        c
    }

    fn run_block(c: &mut SignalChain, left: &mut [f32], right: &mut [f32], events: &[NoteEvent]) {
        let mut buffer: [&mut [f32]; 2] = [left, right];
        c.process(&mut buffer, events, None);
    }

    fn open_filter(c: &mut SignalChain) {
        c.filter_mut().set_cutoff(20000.0);
        c.filter_mut().set_filter_type(FilterType::LowPass);
    }

    #[test]
    fn silent_until_note_on() {
        let mut c = chain();
        let mut l = [0.3_f32; BLOCK];
        let mut r = [0.3_f32; BLOCK];
        run_block(&mut c, &mut l, &mut r, &[]);
        assert!(l.iter().chain(r.iter()).all(|&s| s == 0.0));
    }

    #[test]
    fn note_on_produces_noise() {
        let mut c = chain();
        let mut l = [0.0_f32; BLOCK];
        let mut r = [0.0_f32; BLOCK];
        run_block(&mut c, &mut l, &mut r, &[NoteEvent::NoteOn { id: 60, velocity: 1.0 }]);
        assert!(l.iter().any(|&s| s.abs() > 1e-4), "Note-on should open the envelope");
        assert_eq!(c.envelope().stage(), Stage::Attack);
    }

    #[test]
    fn note_off_waits_for_last_held_note() {
        let mut c = chain();
        c.handle_event(NoteEvent::NoteOn { id: 60, velocity: 1.0 });
        c.handle_event(NoteEvent::NoteOn { id: 64, velocity: 1.0 });
        c.envelope_mut().set_parameters(1.0, 1.0, 0.5, 100.0);
        let mut l = [0.0_f32; BLOCK];
        let mut r = [0.0_f32; BLOCK];
        run_block(&mut c, &mut l, &mut r, &[]);
        assert_eq!(c.envelope().stage(), Stage::Sustain);

        c.handle_event(NoteEvent::NoteOff { id: 60 });
        assert_eq!(c.envelope().stage(), Stage::Sustain, "Note 64 is still held");
        c.handle_event(NoteEvent::NoteOff { id: 64 });
        assert_eq!(c.envelope().stage(), Stage::Release);
    }

    #[test]
    fn all_notes_off_hard_resets() {
        let mut c = chain();
        c.handle_event(NoteEvent::NoteOn { id: 60, velocity: 1.0 });
        let mut l = [0.0_f32; BLOCK];
        let mut r = [0.0_f32; BLOCK];
        run_block(&mut c, &mut l, &mut r, &[NoteEvent::AllNotesOff]);
        assert!(c.held_notes().is_empty());
        assert!(!c.envelope().is_active());
        assert!(l.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn free_run_ignores_note_off() {
        let mut c = chain();
        c.set_trigger_mode(TriggerMode::FreeRun);
        assert!(c.envelope().is_active());
        c.handle_event(NoteEvent::NoteOn { id: 60, velocity: 0.1 });
        c.handle_event(NoteEvent::NoteOff { id: 60 });
        let mut l = [0.0_f32; BLOCK];
        let mut r = [0.0_f32; BLOCK];
        for _ in 0..100 {
            run_block(&mut c, &mut l, &mut r, &[]);
        }
        assert_eq!(c.envelope().stage(), Stage::Sustain);
        assert_eq!(c.envelope().velocity(), 1.0);
    }

    #[test]
    fn free_run_rearms_after_reset() {
        let mut c = chain();
        c.set_trigger_mode(TriggerMode::FreeRun);
        c.reset();
        assert_eq!(c.envelope().stage(), Stage::Attack);

        let mut l = [0.0_f32; BLOCK];
        let mut r = [0.0_f32; BLOCK];
        run_block(&mut c, &mut l, &mut r, &[]);
        assert!(l.iter().any(|&s| s != 0.0), "Drone should sound after a stream restart");
    }

    #[test]
    fn reset_leaves_midi_mode_idle() {
        let mut c = chain();
        c.handle_event(NoteEvent::NoteOn { id: 60, velocity: 1.0 });
        c.reset();
        assert!(!c.envelope().is_active());
    }

    #[test]
    fn out_of_range_note_ids_are_ignored() {
        let mut c = chain();
        c.handle_event(NoteEvent::NoteOn { id: 127, velocity: 1.0 });
        c.handle_event(NoteEvent::NoteOn { id: 200, velocity: 1.0 });
        assert_eq!(c.held_notes().len(), 1);
        c.envelope_mut().set_parameters(1.0, 1.0, 0.5, 100.0);
        let mut l = [0.0_f32; BLOCK];
        let mut r = [0.0_f32; BLOCK];
        run_block(&mut c, &mut l, &mut r, &[NoteEvent::NoteOff { id: 255 }]);
        assert_eq!(c.envelope().stage(), Stage::Sustain, "Note 127 is still held");
        c.handle_event(NoteEvent::NoteOff { id: 127 });
        assert_eq!(c.envelope().stage(), Stage::Release);
    }

    #[test]
    fn free_run_rearms_after_all_notes_off() {
        let mut c = chain();
        c.set_trigger_mode(TriggerMode::FreeRun);
        c.handle_event(NoteEvent::AllNotesOff);
        assert_eq!(c.envelope().stage(), Stage::Attack);
    }

    #[test]
    fn midi_mode_resets_envelope_on_entry() {
        let mut c = chain();
        c.set_trigger_mode(TriggerMode::FreeRun);
        c.set_trigger_mode(TriggerMode::MidiTriggered);
        assert!(!c.envelope().is_active());
    }

    #[test]
    fn one_shot_mode_skips_sustain() {
        let mut c = chain();
        c.set_trigger_mode(TriggerMode::OneShot);
        assert!(c.envelope().is_one_shot());
        c.envelope_mut().set_parameters(1.0, 1.0, 0.5, 1.0);
        c.handle_event(NoteEvent::NoteOn { id: 60, velocity: 1.0 });
        let mut l = [0.0_f32; BLOCK];
        let mut r = [0.0_f32; BLOCK];
        run_block(&mut c, &mut l, &mut r, &[]);
        assert!(!c.envelope().is_active(), "One-shot should finish without a note-off");
        assert_eq!(c.held_notes().len(), 1);
    }

    #[test]
    fn host_sync_gates_on_transport() {
        let mut c = chain();
        c.set_trigger_mode(TriggerMode::HostSync);
        c.envelope_mut().set_parameters(1.0, 1.0, 0.5, 1.0);
        let playing = TransportInfo {
            is_playing: true,
            bpm: 120.0,
            beat_position: 0.0,
        };
        c.set_transport(playing);
        assert_eq!(c.envelope().stage(), Stage::Attack);

        let mut l = [0.0_f32; BLOCK];
        let mut r = [0.0_f32; BLOCK];
        run_block(&mut c, &mut l, &mut r, &[]);
        c.set_transport(TransportInfo {
            is_playing: false,
            ..playing
        });
        assert_eq!(c.envelope().stage(), Stage::Release);
    }

    #[test]
    fn transport_feeds_synced_lfo() {
        let mut c = chain();
        c.lfo_mut().set_sync_to_host(true);
        c.lfo_mut().set_rate(1.0);
        let mut l = [0.0_f32; BLOCK];
        let mut r = [0.0_f32; BLOCK];
        let mut buffer: [&mut [f32]; 2] = [&mut l, &mut r];
        let transport = TransportInfo {
            is_playing: true,
            bpm: 90.0,
            beat_position: 4.5,
        };
        c.process(&mut buffer, &[], Some(transport));
        assert!((c.lfo().phase_increment() - 1.5 / SR).abs() < 1e-15);
        let expected = 0.5 + BLOCK as f64 * 1.5 / SR;
        assert!((c.lfo().phase() - expected).abs() < 1e-9);
    }

    #[test]
    fn position_reported_before_sync_still_locks() {
        let mut c = chain();
        let stopped = TransportInfo {
            is_playing: false,
            bpm: 120.0,
            beat_position: 1.75,
        };
        c.set_transport(stopped);
        let mut l = [0.0_f32; BLOCK];
        let mut r = [0.0_f32; BLOCK];
        run_block(&mut c, &mut l, &mut r, &[]);

        c.lfo_mut().set_sync_to_host(true);
        c.set_transport(stopped);
        assert!((c.lfo().phase() - 0.75).abs() < 1e-12, "got {}", c.lfo().phase());
    }

    #[test]
    fn free_run_white_matches_source_statistics() {
        let mut c = chain();
        c.envelope_mut().set_parameters(1.0, 1.0, 1.0, 500.0);
        c.set_trigger_mode(TriggerMode::FreeRun);
        open_filter(&mut c);

        let mut sum = 0.0_f64;
        let mut sum_sq = 0.0_f64;
        let mut count = 0usize;
        let mut l = [0.0_f32; BLOCK];
        let mut r = [0.0_f32; BLOCK];
        for block in 0..200 {
            run_block(&mut c, &mut l, &mut r, &[]);
            if block < 2 {
                continue;
            }
            for &s in l.iter().chain(r.iter()) {
                assert!(s.is_finite() && s.abs() <= 1.5, "Output out of bounds: {s}");
                sum += s as f64;
                sum_sq += (s as f64) * (s as f64);
                count += 1;
            }
        }
        let mean = sum / count as f64;
        let rms = (sum_sq / count as f64).sqrt();
        assert!(mean.abs() < 0.05, "Mean should be ~0, got {mean}");
        // Uniform white noise has an RMS of 1/sqrt(3); the open lowpass keeps most of it.
        assert!(rms > 0.4 && rms < 0.65, "RMS should track the source, got {rms}");
    }

    #[test]
    fn volume_lfo_modulates_gain() {
        let mut c = chain();
        c.envelope_mut().set_parameters(0.1, 1.0, 1.0, 500.0);
        c.set_trigger_mode(TriggerMode::FreeRun);
        open_filter(&mut c);
        c.lfo_mut().set_depth(1.0);
        c.lfo_mut().set_rate(50.0);
        c.lfo_mut().set_target(LfoTarget::Volume);

        let mut l = [0.0_f32; BLOCK];
        let mut r = [0.0_f32; BLOCK];
        let mut peak = 0.0_f32;
        for _ in 0..20 {
            run_block(&mut c, &mut l, &mut r, &[]);
            peak = l.iter().fold(peak, |m, s| m.max(s.abs()));
        }
        assert!(peak > 1.0, "Volume LFO at full depth boosts up to 1.5x, peak {peak}");
    }

    #[test]
    fn cutoff_lfo_moves_filter() {
        let mut c = chain();
        c.lfo_mut().set_depth(1.0);
        c.lfo_mut().set_target(LfoTarget::FilterCutoff);
        let mut l = [0.0_f32; BLOCK];
        let mut r = [0.0_f32; BLOCK];
        run_block(&mut c, &mut l, &mut r, &[]);
        assert!(c.filter().modulated_cutoff() != c.filter().cutoff());

        c.lfo_mut().set_target(LfoTarget::Volume);
        run_block(&mut c, &mut l, &mut r, &[]);
        assert_eq!(c.filter().modulated_cutoff(), c.filter().cutoff());
    }

    #[test]
    fn dry_wet_blends_input() {
        let mut c = chain();
        c.set_dry_wet(0.0);
        let mut l = [0.25_f32; BLOCK];
        let mut r = [-0.25_f32; BLOCK];
        run_block(&mut c, &mut l, &mut r, &[NoteEvent::NoteOn { id: 1, velocity: 1.0 }]);
        assert!(l.iter().all(|&s| s == 0.25), "Fully dry returns the input");
        assert!(r.iter().all(|&s| s == -0.25));
    }

    #[test]
    fn wet_clears_input() {
        let mut c = chain();
        let mut l = [0.25_f32; BLOCK];
        let mut r = [0.25_f32; BLOCK];
        run_block(&mut c, &mut l, &mut r, &[]);
        assert!(l.iter().all(|&s| s == 0.0), "Fully wet discards the input");
    }

    #[test]
    fn output_gain_applied() {
        let mut a = chain();
        let mut b = chain();
        b.set_output_level_db(-6.0);
        for c in [&mut a, &mut b] {
            c.envelope_mut().set_parameters(0.1, 1.0, 1.0, 500.0);
            c.handle_event(NoteEvent::NoteOn { id: 60, velocity: 1.0 });
        }
        let (mut al, mut ar) = ([0.0_f32; BLOCK], [0.0_f32; BLOCK]);
        let (mut bl, mut br) = ([0.0_f32; BLOCK], [0.0_f32; BLOCK]);
        run_block(&mut a, &mut al, &mut ar, &[]);
        run_block(&mut b, &mut bl, &mut br, &[]);
        let gain = crate::dsp::mixer::db_to_gain(-6.0);
        for i in 0..BLOCK {
            assert!((bl[i] - al[i] * gain).abs() < 1e-5, "sample {i}");
        }
    }

    #[test]
    fn long_host_blocks_are_chunked() {
        let mut c = chain();
        c.set_dry_wet(0.5);
        c.set_trigger_mode(TriggerMode::FreeRun);
        let mut l = vec![0.1_f32; BLOCK * 3 + 17];
        let mut r = vec![0.1_f32; BLOCK * 3 + 17];
        run_block(&mut c, &mut l, &mut r, &[]);
        assert!(l[BLOCK * 3 + 10] != 0.1, "Tail past the prepared size is processed");
        assert_eq!(c.block_size(), BLOCK);
    }

    #[test]
    fn mono_buffers_are_supported() {
        let mut c = chain();
        c.set_trigger_mode(TriggerMode::FreeRun);
        c.effects_mut().set_stereo_width(0.0);
        let mut mono = [0.0_f32; BLOCK];
        let mut buffer: [&mut [f32]; 1] = [&mut mono];
        c.process(&mut buffer, &[], None);
        assert!(mono.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn parameter_feed_routes_to_components() {
        let mut c = chain();
        c.set_parameter(ParamId::Cutoff, 440.0).unwrap();
        c.set_parameter_by_id("noiseType", 2.0).unwrap();
        c.set_parameter_by_id("lfoTarget", 1.0).unwrap();
        c.set_parameter(ParamId::Bitcrush, 4.0).unwrap();
        assert_eq!(c.filter().cutoff(), 440.0);
        assert_eq!(c.noise().noise_type(), NoiseType::Brown);
        assert_eq!(c.lfo().target(), LfoTarget::FilterCutoff);
        assert_eq!(c.effects().bitcrush(), 4.0);
        assert!(c.set_parameter_by_id("filterType", 9.0).is_err());
        assert!(c.set_parameter_by_id("nope", 0.0).is_err());
    }

    #[test]
    fn snapshot_round_trips_through_components() {
        let mut c = chain();
        let params = EngineParams {
            noise_type: NoiseType::AnalogSimulation,
            trigger_mode: TriggerMode::OneShot,
            attack: 25.0,
            cutoff: 3000.0,
            lfo_sync: true,
            width: 1.5,
            output: -3.0,
            dry_wet: 0.8,
            ..EngineParams::default()
        };
        c.apply_params(&params);
        assert_eq!(c.params(), params);
    }

    #[test]
    fn prepare_with_rejects_bad_config() {
        let mut c = chain();
        let bad = EngineConfig::new(-1.0, 128);
        assert!(c.prepare_with(&bad).is_err());
        assert_eq!(c.sample_rate(), SR);
        assert!(c.prepare_with(&EngineConfig::new(48000.0, 128)).is_ok());
        assert_eq!(c.block_size(), 128);
    }
}
