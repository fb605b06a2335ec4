use crate::capture::{CaptureSource, Frame};
use crate::config::ReceiverConfig;
use crate::error::Result;
use crate::fec::{Correction, ErrorCorrector};
use crate::framer::{FramerEvent, PacketFramer};
use crate::spectrum::SpectralAnalyzer;
use log::{debug, info, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative stop flag shared between the receiver and its controller
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Consumer of decoded payloads
pub trait PayloadSink {
    /// Hand over a successfully corrected payload
    fn present(&mut self, payload: &[u8]);

    /// Notification that a packet failed correction; `raw` is the uncorrected stream
    fn report_failure(&mut self, _raw: &[u8], _reason: &str) {}
}

impl PayloadSink for Vec<Vec<u8>> {
    fn present(&mut self, payload: &[u8]) {
        self.push(payload.to_vec());
    }
}

/// Counters for one receiver session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub frames: u64,
    pub packets_started: u64,
    pub packets_decoded: u64,
    pub packets_failed: u64,
    /// Packets dropped for exceeding the configured length bound
    pub packets_dropped: u64,
    /// Packets still open when the session ended
    pub packets_incomplete: u64,
}

/// Frame-by-frame receive loop.
///
/// Owns the only framer instance. Each frame is analyzed, framed and, on an
/// end handshake, corrected and dispatched before the next frame is read.
pub struct Receiver<C, F, S> {
    capture: C,
    corrector: F,
    sink: S,
    analyzer: SpectralAnalyzer,
    framer: PacketFramer,
    frame_samples: usize,
    stats: ReceiverStats,
}

impl<C, F, S> Receiver<C, F, S>
where
    C: CaptureSource,
    F: ErrorCorrector,
    S: PayloadSink,
{
    pub fn new(config: &ReceiverConfig, capture: C, corrector: F, sink: S) -> Result<Self> {
        config.validate()?;
        let frame_samples = config.frame_samples(capture.sample_rate())?;
        Ok(Self {
            capture,
            corrector,
            sink,
            analyzer: SpectralAnalyzer::new(),
            framer: PacketFramer::new(config),
            frame_samples,
            stats: ReceiverStats::default(),
        })
    }

    pub fn frame_samples(&self) -> usize {
        self.frame_samples
    }

    pub fn framer(&self) -> &PacketFramer {
        &self.framer
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Run until the capture ends or `cancel` is observed.
    ///
    /// Cancellation is checked once per frame, after that frame has been fully
    /// processed. A packet still open when the loop stops is discarded. Capture
    /// failures end the session and are returned to the caller.
    pub fn run(&mut self, cancel: &CancellationToken) -> Result<ReceiverStats> {
        info!(
            "listening at {} Hz, {} samples per frame",
            self.capture.sample_rate(),
            self.frame_samples
        );

        loop {
            let frame = match self.capture.read_frame(self.frame_samples)? {
                Some(frame) => frame,
                None => {
                    debug!("capture stream ended");
                    break;
                }
            };

            self.process_frame(&frame)?;

            if cancel.is_cancelled() {
                info!("cancellation requested, stopping");
                break;
            }
        }

        if let Some(packet) = self.framer.reset() {
            debug!("discarding unterminated packet of {} frequencies", packet.len());
            self.stats.packets_incomplete += 1;
        }

        info!(
            "session ended: {} frames, {} decoded, {} failed, {} dropped",
            self.stats.frames,
            self.stats.packets_decoded,
            self.stats.packets_failed,
            self.stats.packets_dropped
        );
        Ok(self.stats.clone())
    }

    /// Analyze one frame and feed its dominant frequency to the framer
    pub fn process_frame(&mut self, frame: &Frame) -> Result<f64> {
        let freq = self.analyzer.dominant(frame)?;
        trace!("frame {} => {:.1} Hz", self.stats.frames, freq);
        self.stats.frames += 1;
        self.process_frequency(freq);
        Ok(freq)
    }

    /// Feed one dominant frequency and dispatch any completed packet
    pub fn process_frequency(&mut self, freq: f64) {
        match self.framer.feed(freq) {
            Some(FramerEvent::Started) => self.stats.packets_started += 1,
            Some(FramerEvent::Completed(bytes)) => self.dispatch(&bytes),
            Some(FramerEvent::Overflowed { .. }) => self.stats.packets_dropped += 1,
            None => {}
        }
    }

    fn dispatch(&mut self, bytes: &[u8]) {
        match self.corrector.decode(bytes) {
            Correction::Corrected(payload) => {
                info!("decoded packet: {} bytes", payload.len());
                self.stats.packets_decoded += 1;
                self.sink.present(&payload);
            }
            Correction::Failed { raw, reason } => {
                warn!("{}: {}", reason, to_hex(&raw));
                self.stats.packets_failed += 1;
                self.sink.report_failure(&raw, &reason);
            }
        }
    }
}

/// Lowercase hex rendering used in failure reports
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
