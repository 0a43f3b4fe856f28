//! AudioWorklet binding for a `SignalChain` driven block by block from JS.
//!
//! The worklet calls `process` with its two output channels once per render
//! quantum. Note and transport events are queued between calls and applied
//! at the start of the next block.

use wasm_bindgen::prelude::*;

use crate::config::EngineConfig;
use crate::dsp::engine::SignalChain;
use crate::events::{NoteEvent, TransportInfo};
use crate::params::{EngineParams, ParamId};

/// Pending events never exceed this between two blocks.
const EVENT_QUEUE_CAPACITY: usize = 256;

#[wasm_bindgen]
pub struct WorkletChain {
    chain: SignalChain,
    events: Vec<NoteEvent>,
    transport: Option<TransportInfo>,
}

#[wasm_bindgen]
impl WorkletChain {
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: f64, block_size: usize) -> Result<WorkletChain, JsValue> {
        let config = EngineConfig::new(sample_rate, block_size);
        let mut chain = SignalChain::new(sample_rate);
        chain.prepare_with(&config)?;
        Ok(WorkletChain {
            chain,
            events: Vec::with_capacity(EVENT_QUEUE_CAPACITY),
            transport: None,
        })
    }

    /// Apply a full parameter snapshot given as a JS object.
    #[wasm_bindgen(js_name = setParams)]
    pub fn set_params(&mut self, params: JsValue) -> Result<(), JsValue> {
        let params: EngineParams = serde_wasm_bindgen::from_value(params)?;
        self.chain.apply_params(&params);
        Ok(())
    }

    /// Read back the current parameters as a JS object.
    #[wasm_bindgen(js_name = getParams)]
    pub fn get_params(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.chain.params())?)
    }

    #[wasm_bindgen(js_name = setParameter)]
    pub fn set_parameter(&mut self, id: &str, value: f32) -> Result<(), JsValue> {
        self.chain.set_parameter(ParamId::from_id(id)?, value)?;
        Ok(())
    }

    /// Queue a note-on with a 7-bit MIDI velocity.
    #[wasm_bindgen(js_name = noteOn)]
    pub fn note_on(&mut self, id: u8, velocity: u8) {
        self.push(NoteEvent::note_on_midi(id, velocity));
    }

    #[wasm_bindgen(js_name = noteOff)]
    pub fn note_off(&mut self, id: u8) {
        self.push(NoteEvent::NoteOff { id });
    }

    #[wasm_bindgen(js_name = allNotesOff)]
    pub fn all_notes_off(&mut self) {
        self.events.clear();
        self.events.push(NoteEvent::AllNotesOff);
    }

    #[wasm_bindgen(js_name = setTransport)]
    pub fn set_transport(&mut self, is_playing: bool, bpm: f64, beat_position: f64) {
        self.transport = Some(TransportInfo {
            is_playing,
            bpm,
            beat_position,
        });
    }

    /// Render one block into the worklet's output channels.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let mut buffer: [&mut [f32]; 2] = [left, right];
        self.chain
            .process(&mut buffer, &self.events, self.transport.take());
        self.events.clear();
    }

    /// Render a mono block.
    #[wasm_bindgen(js_name = processMono)]
    pub fn process_mono(&mut self, output: &mut [f32]) {
        let mut buffer: [&mut [f32]; 1] = [output];
        self.chain
            .process(&mut buffer, &self.events, self.transport.take());
        self.events.clear();
    }

    /// Stream stop.
    pub fn reset(&mut self) {
        self.events.clear();
        self.transport = None;
        self.chain.reset();
    }

    #[wasm_bindgen(getter, js_name = sampleRate)]
    pub fn sample_rate(&self) -> f64 {
        self.chain.sample_rate()
    }
}

impl WorkletChain {
    /// Queue an event; once the queue is full, further events until the
    /// next block are dropped.
    fn push(&mut self, event: NoteEvent) {
        if self.events.len() < EVENT_QUEUE_CAPACITY {
            self.events.push(event);
        }
    }

    pub fn chain(&self) -> &SignalChain {
        &self.chain
    }
}
