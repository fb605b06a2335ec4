use crate::config::ReceiverConfig;

/// Maps dominant frequencies onto the data band and recognizes handshake tones.
///
/// Symbol `k` is carried by `start_hz + k * step_hz` for `k` in `[0, 2^bits)`.
#[derive(Debug, Clone)]
pub struct SymbolQuantizer {
    start_hz: f64,
    step_hz: f64,
    symbol_count: u32,
    handshake_start_hz: f64,
    handshake_end_hz: f64,
    tolerance_hz: f64,
}

impl SymbolQuantizer {
    pub fn new(config: &ReceiverConfig) -> Self {
        Self {
            start_hz: config.start_hz,
            step_hz: config.step_hz,
            symbol_count: config.symbol_count(),
            handshake_start_hz: config.handshake_start_hz,
            handshake_end_hz: config.handshake_end_hz,
            tolerance_hz: config.tolerance_hz,
        }
    }

    /// Nearest symbol for `freq`, or `None` outside the band.
    ///
    /// Halfway points round to the even index. Rejections are expected
    /// during tone transitions and are not errors.
    pub fn quantize(&self, freq: f64) -> Option<u32> {
        let index = ((freq - self.start_hz) / self.step_hz).round_ties_even();
        if index.is_nan() || index < 0.0 || index >= self.symbol_count as f64 {
            return None;
        }
        Some(index as u32)
    }

    pub fn is_handshake_start(&self, freq: f64) -> bool {
        matches(freq, self.handshake_start_hz, self.tolerance_hz)
    }

    pub fn is_handshake_end(&self, freq: f64) -> bool {
        matches(freq, self.handshake_end_hz, self.tolerance_hz)
    }
}

/// Strict absolute-tolerance comparison
fn matches(freq: f64, target: f64, tolerance: f64) -> bool {
    (freq - target).abs() < tolerance
}
