use crate::capture::Frame;
use crate::error::{ReceiverError, Result};
use realfft::RealFftPlanner;

/// Dominant-frequency detector.
///
/// Runs a real FFT over the whole frame and reports the frequency of the
/// strongest bin as `k / N * sample_rate`. The input is real, so the spectrum
/// is symmetric and the first maximum always lies in bins `0..=N/2`; only that
/// half is computed. Silence resolves to the DC bin (0 Hz).
///
/// Plans are cached by the planner, so one analyzer should live for the whole
/// session rather than being rebuilt per frame.
pub struct SpectralAnalyzer {
    planner: RealFftPlanner<f64>,
}

impl SpectralAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: RealFftPlanner::new(),
        }
    }

    /// Dominant frequency of one captured frame (Hz)
    pub fn dominant(&mut self, frame: &Frame) -> Result<f64> {
        self.dominant_frequency(&frame.samples, frame.sample_rate)
    }

    /// Dominant frequency of raw 16-bit PCM samples (Hz)
    pub fn dominant_frequency(&mut self, samples: &[i16], sample_rate: u32) -> Result<f64> {
        let n = samples.len();
        if n == 0 {
            return Ok(0.0);
        }

        let r2c = self.planner.plan_fft_forward(n);
        let mut input = r2c.make_input_vec();
        for (slot, &sample) in input.iter_mut().zip(samples) {
            *slot = sample as f64;
        }
        let mut spectrum = r2c.make_output_vec();
        r2c.process(&mut input, &mut spectrum)
            .map_err(|e| ReceiverError::FftError(format!("forward FFT failed: {:?}", e)))?;

        // Strict comparison keeps the first bin on ties.
        let mut peak_bin = 0;
        let mut peak_power = f64::NEG_INFINITY;
        for (bin, value) in spectrum.iter().enumerate() {
            let power = value.norm_sqr();
            if power > peak_power {
                peak_power = power;
                peak_bin = bin;
            }
        }

        Ok((peak_bin as f64 / n as f64 * sample_rate as f64).abs())
    }
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
