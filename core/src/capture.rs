use crate::error::Result;

/// One block of mono 16-bit PCM and the rate it was captured at
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl Frame {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Source of mono audio frames.
///
/// `read_frame` blocks until `frame_samples` samples are available. It
/// returns `Ok(None)` once the stream has ended and `Err` when the device
/// fails; the receiver has no recovery for the latter.
pub trait CaptureSource {
    /// Fixed capture rate, known once the source is open
    fn sample_rate(&self) -> u32;

    fn read_frame(&mut self, frame_samples: usize) -> Result<Option<Frame>>;
}

/// Capture source over an in-memory sample buffer.
///
/// A short final block is still delivered as a frame, as a recorder
/// flushing at end of stream would.
#[derive(Debug, Clone)]
pub struct MemoryCapture {
    samples: Vec<i16>,
    sample_rate: u32,
    position: usize,
}

impl MemoryCapture {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            position: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.samples.len() - self.position
    }
}

impl CaptureSource for MemoryCapture {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_frame(&mut self, frame_samples: usize) -> Result<Option<Frame>> {
        if self.position >= self.samples.len() || frame_samples == 0 {
            return Ok(None);
        }
        let end = (self.position + frame_samples).min(self.samples.len());
        let block = self.samples[self.position..end].to_vec();
        self.position = end;
        Ok(Some(Frame::new(block, self.sample_rate)))
    }
}
