//! The noise synthesis signal chain and its components.
//!
//! Every component follows the same lifecycle: `prepare` for a sample rate
//! and block size, `reset` on stream stop, then in-place block processing
//! over one or two channel slices.

pub mod effects;
pub mod engine;
pub mod envelope;
pub mod filter;
pub mod lfo;
pub mod mixer;
pub mod noise;
pub mod renderer;
