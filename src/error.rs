use std::fmt;

/// Errors raised by the configuration and parameter surfaces.
///
/// The DSP components themselves never fail: their setters clamp.
#[derive(Debug)]
pub enum NoiseLabError {
    Params(serde_json::Error),
    UnknownParameter(String),
    InvalidChoice { parameter: &'static str, index: i32 },
    InvalidConfig {
        sample_rate: f64,
        block_size: usize,
        channels: usize,
    },
}

impl fmt::Display for NoiseLabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoiseLabError::Params(e) => write!(f, "Parameter error: {e}"),
            NoiseLabError::UnknownParameter(id) => write!(f, "Unknown parameter '{id}'"),
            NoiseLabError::InvalidChoice { parameter, index } => {
                write!(f, "Invalid choice {index} for parameter '{parameter}'")
            }
            NoiseLabError::InvalidConfig {
                sample_rate,
                block_size,
                channels,
            } => write!(
                f,
                "Invalid engine config: sample rate {sample_rate}, block size {block_size}, {channels} channels"
            ),
        }
    }
}

impl std::error::Error for NoiseLabError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NoiseLabError::Params(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for NoiseLabError {
    fn from(e: serde_json::Error) -> Self {
        NoiseLabError::Params(e)
    }
}

impl From<NoiseLabError> for wasm_bindgen::JsValue {
    fn from(e: NoiseLabError) -> Self {
        wasm_bindgen::JsValue::from_str(&format!("{e}"))
    }
}
