//! Drive, bit-crush with sample-rate reduction, and stereo width.
//!
//! The order is fixed: each channel is driven then crushed, and the stereo
//! width is applied to the resulting pair.

/// Bit depths at or below this also get sample-and-hold decimation.
const DECIMATE_BELOW_BITS: f32 = 8.0;

/// Drive, bit-crush and stereo width, applied per sample.
#[derive(Debug, Clone)]
pub struct EffectsStage {
    /// Saturation amount [0, 1].
    drive: f32,
    /// Bit depth [1, 16]; 16 bypasses the crusher.
    bit_depth: f32,
    /// Stereo width [0, 2]; 1 leaves the image untouched.
    stereo_width: f32,

    crush_phase: [f32; 2],
    crush_held: [f32; 2],
}

impl EffectsStage {
    pub fn new() -> Self {
        EffectsStage {
            drive: 0.0,
            bit_depth: 16.0,
            stereo_width: 1.0,
            crush_phase: [0.0; 2],
            crush_held: [0.0; 2],
        }
    }

    pub fn prepare(&mut self, _sample_rate: f64, _block_size: usize) {
        self.reset();
    }

    pub fn reset(&mut self) {
        self.crush_phase = [0.0; 2];
        self.crush_held = [0.0; 2];
    }

    pub fn set_drive(&mut self, drive: f32) {
        self.drive = drive.clamp(0.0, 1.0);
    }

    pub fn set_bitcrush(&mut self, bit_depth: f32) {
        self.bit_depth = bit_depth.clamp(1.0, 16.0);
    }

    pub fn set_stereo_width(&mut self, width: f32) {
        self.stereo_width = width.clamp(0.0, 2.0);
    }

    pub fn drive(&self) -> f32 {
        self.drive
    }

    pub fn bitcrush(&self) -> f32 {
        self.bit_depth
    }

    pub fn stereo_width(&self) -> f32 {
        self.stereo_width
    }

    /// Process mono or stereo audio in place. Width needs two channels.
    pub fn process(&mut self, buffer: &mut [&mut [f32]], num_samples: usize) {
        match buffer {
            [] => {}
            [mono] => {
                let n = num_samples.min(mono.len());
                for sample in mono[..n].iter_mut() {
                    *sample = self.crush(self.saturate(*sample), 0);
                }
            }
            [left, right, ..] => {
                let n = num_samples.min(left.len()).min(right.len());
                for i in 0..n {
                    let l = self.crush(self.saturate(left[i]), 0);
                    let r = self.crush(self.saturate(right[i]), 1);
                    let (l, r) = self.widen(l, r);
                    left[i] = l;
                    right[i] = r;
                }
            }
        }
    }

    /// Soft saturation with loudness compensation.
    #[inline]
    fn saturate(&self, sample: f32) -> f32 {
        if self.drive <= 0.0 {
            return sample;
        }
        let gain = 1.0 + self.drive * 9.0;
        (sample * gain).tanh() / (0.5 * self.drive + 0.5)
    }

    fn crush(&mut self, sample: f32, channel: usize) -> f32 {
        if self.bit_depth >= 16.0 {
            return sample;
        }

        let levels = (2.0_f32.powf(self.bit_depth) - 1.0).floor();
        let crushed = (sample * levels).round() / levels;

        if self.bit_depth > DECIMATE_BELOW_BITS {
            return crushed;
        }

        // 8 bits holds every sample, 1 bit holds roughly every 18th.
        let reduction = 0.5 * (DECIMATE_BELOW_BITS - self.bit_depth) / DECIMATE_BELOW_BITS;
        let increment = 1.0 / (1.0 + reduction * 40.0);

        self.crush_phase[channel] += increment;
        if self.crush_phase[channel] >= 1.0 {
            self.crush_phase[channel] -= 1.0;
            self.crush_held[channel] = crushed;
        }
        self.crush_held[channel]
    }

    /// Mid/side width; a no-op within 0.01 of unity.
    #[inline]
    fn widen(&self, left: f32, right: f32) -> (f32, f32) {
        if (self.stereo_width - 1.0).abs() < 0.01 {
            return (left, right);
        }
        let mid = (left + right) * 0.5;
        let side = (left - right) * 0.5 * self.stereo_width;
        (mid + side, mid - side)
    }
}

impl Default for EffectsStage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(fx: &mut EffectsStage, left: &mut [f32], right: &mut [f32]) {
        let n = left.len();
        let mut buffer: [&mut [f32]; 2] = [left, right];
        fx.process(&mut buffer, n);
    }

    #[test]
    fn bypass_is_identity() {
        let mut fx = EffectsStage::new();
        let input_l: Vec<f32> = (0..256).map(|i| ((i as f32) * 0.37).sin() * 0.9).collect();
        let input_r: Vec<f32> = (0..256).map(|i| ((i as f32) * 0.11).cos() * 0.7).collect();
        let mut left = input_l.clone();
        let mut right = input_r.clone();
        run(&mut fx, &mut left, &mut right);
        assert_eq!(left, input_l);
        assert_eq!(right, input_r);
    }

    #[test]
    fn zero_width_collapses_to_mono() {
        let mut fx = EffectsStage::new();
        fx.set_stereo_width(0.0);
        let mut left = [0.8_f32, -0.2, 0.5];
        let mut right = [0.2_f32, 0.6, -0.5];
        run(&mut fx, &mut left, &mut right);
        let expected = [0.5_f32, 0.2, 0.0];
        for i in 0..3 {
            assert!((left[i] - expected[i]).abs() < 1e-6, "left[{i}] = {}", left[i]);
            assert_eq!(left[i], right[i]);
        }
    }

    #[test]
    fn double_width_doubles_side() {
        let mut fx = EffectsStage::new();
        fx.set_stereo_width(2.0);
        let mut left = [0.6_f32];
        let mut right = [0.2_f32];
        run(&mut fx, &mut left, &mut right);
        // mid 0.4, side 0.2 -> 0.4
        assert!((left[0] - 0.8).abs() < 1e-6);
        assert!((right[0] - 0.0).abs() < 1e-6);
        assert!(((left[0] - right[0]) * 0.5 - 0.4).abs() < 1e-6);
    }

    #[test]
    fn mono_skips_width() {
        let mut fx = EffectsStage::new();
        fx.set_stereo_width(0.0);
        let mut mono = [0.3_f32, -0.3];
        {
            let mut buffer: [&mut [f32]; 1] = [&mut mono];
            fx.process(&mut buffer, 2);
        }
        assert_eq!(mono, [0.3, -0.3]);
    }

    #[test]
    fn drive_saturates_and_compensates() {
        let mut fx = EffectsStage::new();
        fx.set_drive(1.0);
        let mut left = [0.05_f32, 1.0, -1.0];
        let mut right = [0.0_f32; 3];
        run(&mut fx, &mut left, &mut right);
        // Full drive: tanh(10x) / 1.0
        assert!((left[0] - 0.5_f32.tanh()).abs() < 1e-6);
        assert!((left[1] - 10.0_f32.tanh()).abs() < 1e-6);
        assert!(left.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn crush_quantizes_above_eight_bits() {
        let mut fx = EffectsStage::new();
        fx.set_bitcrush(10.0);
        let levels = 1023.0_f32;
        let mut left: Vec<f32> = (0..64).map(|i| (i as f32 / 64.0) - 0.5).collect();
        let mut right = vec![0.0_f32; 64];
        let input = left.clone();
        run(&mut fx, &mut left, &mut right);
        for (i, (&out, &inp)) in left.iter().zip(&input).enumerate() {
            assert!((out - (inp * levels).round() / levels).abs() < 1e-6, "sample {i}");
        }
    }

    #[test]
    fn low_bits_hold_samples() {
        let mut fx = EffectsStage::new();
        fx.set_bitcrush(1.0);
        let mut left: Vec<f32> = (0..200).map(|i| if i % 2 == 0 { 0.9 } else { -0.9 }).collect();
        let mut right = left.clone();
        run(&mut fx, &mut left, &mut right);
        let changes = left.windows(2).filter(|w| w[0] != w[1]).count();
        assert!(changes < 20, "1-bit crush should decimate, saw {changes} changes");
        assert_eq!(left, right, "Both channels decimate in step");
    }

    #[test]
    fn setters_clamp() {
        let mut fx = EffectsStage::new();
        fx.set_drive(2.0);
        fx.set_bitcrush(0.0);
        fx.set_stereo_width(5.0);
        assert_eq!(fx.drive(), 1.0);
        assert_eq!(fx.bitcrush(), 1.0);
        assert_eq!(fx.stereo_width(), 2.0);
    }
}
