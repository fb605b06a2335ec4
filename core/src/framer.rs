use crate::bitchunk::assemble;
use crate::config::ReceiverConfig;
use crate::quantize::SymbolQuantizer;
use log::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    /// Waiting for a start handshake; nothing is buffered
    Idle,
    /// Collecting frequencies until the end handshake
    InPacket,
}

/// Dominant frequencies collected between the two handshakes.
///
/// Every tone is held for two frames, so only the even-indexed entries
/// carry data; the odd ones are guard copies taken across tone transitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Packet {
    frequencies: Vec<f64>,
}

impl Packet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, freq: f64) {
        self.frequencies.push(freq);
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Data-bearing frequencies (indices 0, 2, 4, ...)
    pub fn data_frequencies(&self) -> impl Iterator<Item = f64> + '_ {
        self.frequencies.iter().copied().step_by(2)
    }

    /// Quantized data symbols; out-of-band frequencies are skipped
    pub fn symbols(&self, quantizer: &SymbolQuantizer) -> Vec<u32> {
        self.data_frequencies()
            .filter_map(|freq| quantizer.quantize(freq))
            .collect()
    }

    /// Reassembled byte stream of this packet
    pub fn to_bytes(&self, quantizer: &SymbolQuantizer, bits: u32) -> Vec<u8> {
        assemble(bits, &self.symbols(quantizer))
    }
}

/// Result of feeding one frequency into the framer
#[derive(Debug, Clone, PartialEq)]
pub enum FramerEvent {
    /// Start handshake recognized
    Started,
    /// End handshake recognized; carries the packet's byte stream
    Completed(Vec<u8>),
    /// Packet grew past the configured bound and was discarded
    Overflowed { frequencies: usize },
}

/// Handshake-driven packet delimiter.
///
/// | state    | input           | next     |
/// |----------|-----------------|----------|
/// | Idle     | start handshake | InPacket |
/// | Idle     | anything else   | Idle     |
/// | InPacket | end handshake   | Idle (packet finalized) |
/// | InPacket | anything else   | InPacket (frequency appended) |
///
/// The framer always returns to `Idle` after an end handshake, whatever
/// happens to the bytes afterwards.
pub struct PacketFramer {
    quantizer: SymbolQuantizer,
    bits: u32,
    max_frequencies: Option<usize>,
    state: FramerState,
    packet: Packet,
}

impl PacketFramer {
    pub fn new(config: &ReceiverConfig) -> Self {
        Self {
            quantizer: SymbolQuantizer::new(config),
            bits: config.bits,
            max_frequencies: config.max_packet_frequencies,
            state: FramerState::Idle,
            packet: Packet::new(),
        }
    }

    pub fn state(&self) -> FramerState {
        self.state
    }

    /// Packet being collected, if any
    pub fn packet(&self) -> Option<&Packet> {
        match self.state {
            FramerState::InPacket => Some(&self.packet),
            FramerState::Idle => None,
        }
    }

    pub fn quantizer(&self) -> &SymbolQuantizer {
        &self.quantizer
    }

    /// Advance the state machine by one frame's dominant frequency
    pub fn feed(&mut self, freq: f64) -> Option<FramerEvent> {
        match self.state {
            FramerState::Idle => {
                if self.quantizer.is_handshake_start(freq) {
                    debug!("start handshake at {:.1} Hz", freq);
                    self.state = FramerState::InPacket;
                    Some(FramerEvent::Started)
                } else {
                    None
                }
            }
            FramerState::InPacket => {
                if self.quantizer.is_handshake_end(freq) {
                    let packet = std::mem::take(&mut self.packet);
                    self.state = FramerState::Idle;

                    let bytes = packet.to_bytes(&self.quantizer, self.bits);
                    debug!(
                        "end handshake at {:.1} Hz: {} frequencies, {} bytes",
                        freq,
                        packet.len(),
                        bytes.len()
                    );
                    return Some(FramerEvent::Completed(bytes));
                }

                self.packet.push(freq);
                match self.max_frequencies {
                    Some(max) if self.packet.len() > max => {
                        let frequencies = self.packet.len();
                        warn!(
                            "dropping unterminated packet after {} frequencies",
                            frequencies
                        );
                        self.reset();
                        Some(FramerEvent::Overflowed { frequencies })
                    }
                    _ => None,
                }
            }
        }
    }

    /// Return to `Idle`, discarding any partial packet
    pub fn reset(&mut self) -> Option<Packet> {
        let discarded = match self.state {
            FramerState::InPacket => Some(std::mem::take(&mut self.packet)),
            FramerState::Idle => None,
        };
        self.state = FramerState::Idle;
        self.packet = Packet::new();
        discarded
    }
}
