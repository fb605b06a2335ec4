use hound::{SampleFormat, WavIntoSamples, WavReader};
use sonicrx_core::{CaptureSource, Frame, ReceiverError};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported WAV format: {bits}-bit {format:?}")]
    UnsupportedFormat { bits: u16, format: SampleFormat },
}

impl From<InputError> for ReceiverError {
    fn from(e: InputError) -> Self {
        ReceiverError::Capture(e.to_string())
    }
}

enum SampleStream {
    Int16(WavIntoSamples<BufReader<File>, i16>),
    Float32(WavIntoSamples<BufReader<File>, f32>),
}

impl SampleStream {
    fn next_sample(&mut self) -> Option<Result<i16, InputError>> {
        match self {
            SampleStream::Int16(samples) => samples.next().map(|s| s.map_err(InputError::from)),
            SampleStream::Float32(samples) => samples.next().map(|s| {
                // Clamp to [-1.0, 1.0] before scaling to the i16 range
                s.map(|v| (v.clamp(-1.0, 1.0) * 32767.0) as i16)
                    .map_err(InputError::from)
            }),
        }
    }
}

/// WAV file capture.
///
/// Multi-channel files are reduced to mono by keeping the first channel.
pub struct WavCapture {
    stream: SampleStream,
    channels: u16,
    sample_rate: u32,
}

impl WavCapture {
    pub fn open(path: &Path) -> Result<Self, InputError> {
        let reader = WavReader::open(path)?;
        let spec = reader.spec();
        log::info!(
            "Read WAV: {} Hz, {} channels, {} bits",
            spec.sample_rate, spec.channels, spec.bits_per_sample
        );

        let stream = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 16) => SampleStream::Int16(reader.into_samples()),
            (SampleFormat::Float, 32) => SampleStream::Float32(reader.into_samples()),
            (format, bits) => return Err(InputError::UnsupportedFormat { bits, format }),
        };

        Ok(Self {
            stream,
            channels: spec.channels.max(1),
            sample_rate: spec.sample_rate,
        })
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Next sample of the first channel, skipping the others
    fn next_mono(&mut self) -> Result<Option<i16>, InputError> {
        let first = match self.stream.next_sample() {
            Some(sample) => sample?,
            None => return Ok(None),
        };
        for _ in 1..self.channels {
            if let Some(sample) = self.stream.next_sample() {
                sample?;
            }
        }
        Ok(Some(first))
    }
}

impl CaptureSource for WavCapture {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_frame(&mut self, frame_samples: usize) -> sonicrx_core::Result<Option<Frame>> {
        let mut samples = Vec::with_capacity(frame_samples);
        while samples.len() < frame_samples {
            match self.next_mono()? {
                Some(sample) => samples.push(sample),
                None => break,
            }
        }
        if samples.is_empty() {
            return Ok(None);
        }
        Ok(Some(Frame::new(samples, self.sample_rate)))
    }
}

/// Raw signed 16-bit little-endian mono PCM from a byte stream
pub struct RawCapture<R> {
    reader: R,
    sample_rate: u32,
}

impl<R: Read> RawCapture<R> {
    pub fn new(reader: R, sample_rate: u32) -> Self {
        Self {
            reader,
            sample_rate,
        }
    }

    /// Fill `buf` as far as the stream allows; returns the bytes read
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize, InputError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }
}

impl<R: Read> CaptureSource for RawCapture<R> {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_frame(&mut self, frame_samples: usize) -> sonicrx_core::Result<Option<Frame>> {
        let mut bytes = vec![0u8; frame_samples * 2];
        let filled = self.fill(&mut bytes)?;
        // A dangling odd byte at end of stream is not a sample
        let samples: Vec<i16> = bytes[..filled - filled % 2]
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        if samples.is_empty() {
            return Ok(None);
        }
        Ok(Some(Frame::new(samples, self.sample_rate)))
    }
}
