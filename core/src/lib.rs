//! Acoustic modem receiver
//!
//! Recovers short binary payloads from audio by treating single FSK tones as
//! symbols. Each frame of audio is reduced to its dominant frequency, a pair of
//! reserved handshake tones delimits a packet, and the data tones inside the
//! packet are quantized to fixed-width symbols and packed back into bytes
//! before Reed-Solomon correction.

pub mod error;
pub mod config;
pub mod spectrum;
pub mod quantize;
pub mod bitchunk;
pub mod framer;
pub mod fec;
pub mod capture;
pub mod receiver;

pub use bitchunk::assemble;
pub use capture::{CaptureSource, Frame, MemoryCapture};
pub use config::ReceiverConfig;
pub use error::{ReceiverError, Result};
pub use fec::{Correction, ErrorCorrector, PassThrough, ReedSolomonCorrector};
pub use framer::{FramerEvent, FramerState, Packet, PacketFramer};
pub use quantize::SymbolQuantizer;
pub use receiver::{to_hex, CancellationToken, PayloadSink, Receiver, ReceiverStats};
pub use spectrum::SpectralAnalyzer;

// Handshake tones, outside the data band
pub const HANDSHAKE_START_HZ: f64 = 8192.0;
pub const HANDSHAKE_END_HZ: f64 = 8192.0 + 512.0; // 8704

// Data band: START_HZ + k * STEP_HZ for k in [0, 2^BITS)
pub const START_HZ: f64 = 1024.0;
pub const STEP_HZ: f64 = 256.0;
pub const BITS: u32 = 4;

/// Absolute tolerance for handshake tone matching
pub const MATCH_TOLERANCE_HZ: f64 = 20.0;

// FEC configuration
pub const FEC_BYTES: usize = 4;
pub const RS_MAX_BLOCK_BYTES: usize = 255;

// Timing: every tone lasts one symbol interval and is sampled as two frames
pub const SYMBOL_INTERVAL_SECS: f64 = 0.1;
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
