pub mod config;
pub mod dsp;
pub mod error;
pub mod events;
pub mod params;
pub mod worklet;

use crate::config::EngineConfig;
use crate::params::EngineParams;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default note gate of a preview, as a fraction of its length.
const PREVIEW_GATE: f64 = 0.5;

/// WASM-exposed: return the noiselab-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: render a parameter snapshot (JSON) to a stereo WAV byte
/// array. The note is held for the first half of the preview.
#[wasm_bindgen]
pub fn render_preview_wav(
    params_json: &str,
    sample_rate: u32,
    seconds: f64,
) -> Result<Vec<u8>, JsValue> {
    let params = EngineParams::from_json(params_json)?;
    let config = EngineConfig::new(sample_rate as f64, 512);
    Ok(dsp::renderer::render_wav(
        &params,
        &config,
        seconds,
        seconds * PREVIEW_GATE,
    )?)
}
