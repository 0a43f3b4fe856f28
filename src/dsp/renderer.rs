//! Preview renderer. Drives the real-time chain offline and encodes WAV.

use tracing::info;

use super::engine::SignalChain;
use super::noise::NoiseSource;
use crate::config::EngineConfig;
use crate::error::NoiseLabError;
use crate::events::NoteEvent;
use crate::params::EngineParams;

/// Fixed seed so the same settings always preview identically.
const PREVIEW_SEED: u64 = 0x6e6f_6973_65;
/// Note id used for the preview gate.
const PREVIEW_NOTE: u8 = 60;

/// Render `seconds` of audio as interleaved stereo f32. A note is held from
/// the start until `gate_seconds`, after which the release tail plays out.
pub fn render(
    params: &EngineParams,
    config: &EngineConfig,
    seconds: f64,
    gate_seconds: f64,
) -> Result<Vec<f32>, NoiseLabError> {
    config.validate()?;

    let noise = NoiseSource::with_seed(PREVIEW_SEED);
    let mut chain = SignalChain::with_noise_source(noise, config.sample_rate);
    chain.prepare(config.sample_rate, config.block_size);
    chain.apply_params(params);

    let total = (seconds.max(0.0) * config.sample_rate).round() as usize;
    let gate = (gate_seconds.max(0.0) * config.sample_rate).round() as usize;
    info!(total, gate, sample_rate = config.sample_rate, "rendering preview");

    let block = config.block_size;
    let mut left = vec![0.0_f32; block];
    let mut right = vec![0.0_f32; block];
    let mut out = Vec::with_capacity(total * 2);

    let mut pos = 0;
    let mut gate_open = false;
    while pos < total {
        // Split blocks on the gate so the note-off lands sample-accurately.
        let mut n = block.min(total - pos);
        if gate_open && pos < gate {
            n = n.min(gate - pos);
        }

        let mut events = Vec::new();
        if pos == 0 && gate > 0 {
            events.push(NoteEvent::NoteOn {
                id: PREVIEW_NOTE,
                velocity: 1.0,
            });
            gate_open = true;
            n = n.min(gate);
        } else if gate_open && pos >= gate {
            events.push(NoteEvent::NoteOff { id: PREVIEW_NOTE });
            gate_open = false;
        }

        left[..n].fill(0.0);
        right[..n].fill(0.0);
        if config.channels == 1 {
            let mut buffer: [&mut [f32]; 1] = [&mut left[..n]];
            chain.process(&mut buffer, &events, None);
            right[..n].copy_from_slice(&left[..n]);
        } else {
            let mut buffer: [&mut [f32]; 2] = [&mut left[..n], &mut right[..n]];
            chain.process(&mut buffer, &events, None);
        }

        for (&l, &r) in left[..n].iter().zip(&right[..n]) {
            out.push(l);
            out.push(r);
        }
        pos += n;
    }

    Ok(out)
}

/// Render a preview to a WAV file as bytes (16-bit stereo PCM).
pub fn render_wav(
    params: &EngineParams,
    config: &EngineConfig,
    seconds: f64,
    gate_seconds: f64,
) -> Result<Vec<u8>, NoiseLabError> {
    let samples = render(params, config, seconds, gate_seconds)?;
    let pcm: Vec<i16> = samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect();
    Ok(encode_wav(&pcm, config.sample_rate.round() as u32, 2))
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}
