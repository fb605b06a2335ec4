use crate::RS_MAX_BLOCK_BYTES;
use log::debug;
use reed_solomon::Decoder;

/// Outcome of running a packet's byte stream through error correction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correction {
    /// Payload with parity stripped and errors repaired
    Corrected(Vec<u8>),
    /// The stream could not be validated; `raw` is what was received
    Failed { raw: Vec<u8>, reason: String },
}

impl Correction {
    pub fn is_corrected(&self) -> bool {
        matches!(self, Correction::Corrected(_))
    }
}

/// Error-correction stage applied to every completed packet
pub trait ErrorCorrector {
    fn decode(&self, bytes: &[u8]) -> Correction;
}

impl<T: ErrorCorrector + ?Sized> ErrorCorrector for Box<T> {
    fn decode(&self, bytes: &[u8]) -> Correction {
        (**self).decode(bytes)
    }
}

/// Reed-Solomon decoder over GF(2^8) for a single shortened block.
///
/// The sender appends `ecc_len` parity bytes to the payload; up to
/// `ecc_len / 2` corrupted bytes anywhere in the block are repaired.
pub struct ReedSolomonCorrector {
    ecc_len: usize,
    decoder: Decoder,
}

impl ReedSolomonCorrector {
    pub fn new(ecc_len: usize) -> Self {
        Self {
            ecc_len,
            decoder: Decoder::new(ecc_len),
        }
    }

    pub fn ecc_len(&self) -> usize {
        self.ecc_len
    }
}

impl Default for ReedSolomonCorrector {
    fn default() -> Self {
        Self::new(crate::FEC_BYTES)
    }
}

impl ErrorCorrector for ReedSolomonCorrector {
    /// Correct a stream of one or more blocks.
    ///
    /// Long payloads are sent as consecutive `RS_MAX_BLOCK_BYTES` blocks, each
    /// with its own parity; only the last block may be shorter. A single
    /// uncorrectable block fails the whole packet.
    fn decode(&self, bytes: &[u8]) -> Correction {
        let last_block = match bytes.len() % RS_MAX_BLOCK_BYTES {
            0 if !bytes.is_empty() => RS_MAX_BLOCK_BYTES,
            rest => rest,
        };
        if last_block <= self.ecc_len {
            return Correction::Failed {
                raw: bytes.to_vec(),
                reason: format!(
                    "final block of {} bytes is too short for {} parity bytes",
                    last_block, self.ecc_len
                ),
            };
        }

        let mut payload = Vec::with_capacity(bytes.len());
        let mut repaired = 0;
        for (index, block) in bytes.chunks(RS_MAX_BLOCK_BYTES).enumerate() {
            match self.decoder.correct_err_count(block, None) {
                Ok((corrected, fixed)) => {
                    repaired += fixed;
                    payload.extend_from_slice(corrected.data());
                }
                Err(e) => {
                    return Correction::Failed {
                        raw: bytes.to_vec(),
                        reason: format!("Reed-Solomon decode failure in block {}: {:?}", index, e),
                    };
                }
            }
        }

        if repaired > 0 {
            debug!("Reed-Solomon repaired {} byte(s)", repaired);
        }
        Correction::Corrected(payload)
    }
}

/// Accepts every byte stream unchanged, for senders without FEC
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl ErrorCorrector for PassThrough {
    fn decode(&self, bytes: &[u8]) -> Correction {
        Correction::Corrected(bytes.to_vec())
    }
}
