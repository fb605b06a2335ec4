use crate::error::{ReceiverError, Result};
use crate::{
    BITS, FEC_BYTES, HANDSHAKE_END_HZ, HANDSHAKE_START_HZ, MATCH_TOLERANCE_HZ, START_HZ, STEP_HZ,
    SYMBOL_INTERVAL_SECS,
};

/// Session configuration shared with the sender.
///
/// Nothing here is negotiated in-band: every field has to match the
/// transmitter exactly, and changing a field means restarting the receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverConfig {
    /// Tone that opens a packet (Hz)
    pub handshake_start_hz: f64,
    /// Tone that closes a packet (Hz)
    pub handshake_end_hz: f64,
    /// Frequency of symbol 0 (Hz)
    pub start_hz: f64,
    /// Spacing between adjacent symbols (Hz)
    pub step_hz: f64,
    /// Bits carried by one symbol
    pub bits: u32,
    /// Absolute tolerance for handshake matching (Hz)
    pub tolerance_hz: f64,
    /// Duration of one transmitted tone (seconds)
    pub symbol_interval_secs: f64,
    /// Reed-Solomon parity bytes appended by the sender
    pub fec_bytes: usize,
    /// Drop an unterminated packet once it holds more than this many frequencies.
    /// `None` accumulates until the end handshake, end of stream or cancellation.
    pub max_packet_frequencies: Option<usize>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            handshake_start_hz: HANDSHAKE_START_HZ,
            handshake_end_hz: HANDSHAKE_END_HZ,
            start_hz: START_HZ,
            step_hz: STEP_HZ,
            bits: BITS,
            tolerance_hz: MATCH_TOLERANCE_HZ,
            symbol_interval_secs: SYMBOL_INTERVAL_SECS,
            fec_bytes: FEC_BYTES,
            max_packet_frequencies: None,
        }
    }
}

impl ReceiverConfig {
    /// Number of distinct symbols in the data band (2^bits)
    pub fn symbol_count(&self) -> u32 {
        1u32 << self.bits
    }

    /// Highest data tone (Hz)
    pub fn band_top_hz(&self) -> f64 {
        self.start_hz + (self.symbol_count() - 1) as f64 * self.step_hz
    }

    /// Samples per analysis frame at the given capture rate.
    ///
    /// A frame covers half a symbol interval, so every tone is seen twice.
    pub fn frame_samples(&self, sample_rate: u32) -> Result<usize> {
        let samples = (self.symbol_interval_secs / 2.0 * sample_rate as f64).round();
        if !samples.is_finite() || samples < 1.0 {
            return Err(ReceiverError::InvalidConfig(format!(
                "symbol interval {}s at {} Hz yields an empty frame",
                self.symbol_interval_secs, sample_rate
            )));
        }
        Ok(samples as usize)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=16).contains(&self.bits) {
            return Err(ReceiverError::InvalidConfig(format!(
                "symbol width must be 1..=16 bits, got {}",
                self.bits
            )));
        }
        if !(self.step_hz > 0.0) {
            return Err(ReceiverError::InvalidConfig(format!(
                "step must be positive, got {} Hz",
                self.step_hz
            )));
        }
        if !(self.tolerance_hz > 0.0) {
            return Err(ReceiverError::InvalidConfig(format!(
                "match tolerance must be positive, got {} Hz",
                self.tolerance_hz
            )));
        }
        if !(self.symbol_interval_secs > 0.0) {
            return Err(ReceiverError::InvalidConfig(format!(
                "symbol interval must be positive, got {}s",
                self.symbol_interval_secs
            )));
        }
        if (self.handshake_start_hz - self.handshake_end_hz).abs() < 2.0 * self.tolerance_hz {
            return Err(ReceiverError::InvalidConfig(format!(
                "handshake tones {} Hz and {} Hz overlap within tolerance",
                self.handshake_start_hz, self.handshake_end_hz
            )));
        }

        // Half a step of margin: anything closer would quantize to a data symbol.
        let band_low = self.start_hz - self.step_hz / 2.0;
        let band_high = self.band_top_hz() + self.step_hz / 2.0;
        for (name, tone) in [
            ("start", self.handshake_start_hz),
            ("end", self.handshake_end_hz),
        ] {
            if tone >= band_low && tone < band_high {
                return Err(ReceiverError::InvalidConfig(format!(
                    "{} handshake {} Hz lies inside the data band {}..{} Hz",
                    name, tone, self.start_hz, self.band_top_hz()
                )));
            }
        }

        if self.max_packet_frequencies == Some(0) {
            return Err(ReceiverError::InvalidConfig(
                "max packet length must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
