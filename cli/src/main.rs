mod input;
mod output;

use clap::{Args, Parser, Subcommand};
use input::{RawCapture, WavCapture};
use output::{Display, OutputFormat};
use serde::Serialize;
use sonicrx_core::{
    CancellationToken, CaptureSource, ErrorCorrector, PassThrough, Receiver, ReceiverConfig,
    ReceiverStats, ReedSolomonCorrector, SpectralAnalyzer,
};
use std::io::BufReader;
use std::path::{Path, PathBuf};

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "sonicrx")]
#[command(about = "Acoustic modem receiver: decode FSK tone transmissions from audio")]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode packets from a WAV file or raw PCM on stdin
    Listen {
        /// Input WAV file (omit with --raw to read stdin)
        #[arg(value_name = "INPUT.WAV", required_unless_present = "raw")]
        input: Option<PathBuf>,

        /// Read signed 16-bit little-endian mono PCM from stdin
        #[arg(long, conflicts_with = "input")]
        raw: bool,

        /// Sample rate of raw stdin input (Hz)
        #[arg(long, default_value_t = sonicrx_core::DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,

        /// Output format for decoded packets
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Skip Reed-Solomon correction and print byte streams as received
        #[arg(long)]
        no_fec: bool,

        #[command(flatten)]
        protocol: ProtocolArgs,
    },

    /// Print the dominant frequency of every frame in a WAV file
    Scan {
        /// Input WAV file
        #[arg(value_name = "INPUT.WAV")]
        input: PathBuf,

        /// Emit JSON lines instead of `index => Hz`
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        protocol: ProtocolArgs,
    },
}

/// Protocol constants; these must match the sender exactly
#[derive(Args, Clone)]
struct ProtocolArgs {
    /// Start handshake tone (Hz)
    #[arg(long, default_value_t = sonicrx_core::HANDSHAKE_START_HZ)]
    handshake_start: f64,

    /// End handshake tone (Hz)
    #[arg(long, default_value_t = sonicrx_core::HANDSHAKE_END_HZ)]
    handshake_end: f64,

    /// Frequency of data symbol 0 (Hz)
    #[arg(long, default_value_t = sonicrx_core::START_HZ)]
    start_hz: f64,

    /// Spacing between data symbols (Hz)
    #[arg(long, default_value_t = sonicrx_core::STEP_HZ)]
    step_hz: f64,

    /// Bits per symbol
    #[arg(long, default_value_t = sonicrx_core::BITS)]
    bits: u32,

    /// Handshake match tolerance (Hz)
    #[arg(long, default_value_t = sonicrx_core::MATCH_TOLERANCE_HZ)]
    tolerance: f64,

    /// Duration of one tone (seconds); frames are half of this
    #[arg(long, default_value_t = sonicrx_core::SYMBOL_INTERVAL_SECS)]
    interval: f64,

    /// Reed-Solomon parity bytes
    #[arg(long, default_value_t = sonicrx_core::FEC_BYTES)]
    fec_bytes: usize,

    /// Drop a packet with no end handshake once it exceeds this many frames
    #[arg(long, value_name = "FRAMES")]
    max_packet: Option<usize>,
}

impl ProtocolArgs {
    fn to_config(&self) -> ReceiverConfig {
        ReceiverConfig {
            handshake_start_hz: self.handshake_start,
            handshake_end_hz: self.handshake_end,
            start_hz: self.start_hz,
            step_hz: self.step_hz,
            bits: self.bits,
            tolerance_hz: self.tolerance,
            symbol_interval_secs: self.interval,
            fec_bytes: self.fec_bytes,
            max_packet_frequencies: self.max_packet,
        }
    }
}

#[derive(Serialize)]
struct ScanLine {
    frame: u64,
    hz: f64,
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Listen {
            input,
            raw,
            sample_rate,
            format,
            no_fec,
            protocol,
        } => {
            let config = protocol.to_config();
            let cancel = CancellationToken::new();

            // Ctrl-C stops the loop after the frame in progress
            let signal_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    signal_token.cancel();
                }
            });

            let stats = tokio::task::spawn_blocking(move || {
                listen_command(input, raw, sample_rate, format, no_fec, &config, &cancel)
            })
            .await??;
            log::info!(
                "{} packets decoded, {} failed, {} dropped, {} incomplete",
                stats.packets_decoded,
                stats.packets_failed,
                stats.packets_dropped,
                stats.packets_incomplete
            );
        }
        Commands::Scan {
            input,
            json,
            protocol,
        } => scan_command(&input, json, &protocol.to_config())?,
    }

    Ok(())
}

fn listen_command(
    input: Option<PathBuf>,
    raw: bool,
    sample_rate: u32,
    format: OutputFormat,
    no_fec: bool,
    config: &ReceiverConfig,
    cancel: &CancellationToken,
) -> CliResult<ReceiverStats> {
    let corrector: Box<dyn ErrorCorrector + Send> = if no_fec {
        Box::new(PassThrough)
    } else {
        Box::new(ReedSolomonCorrector::new(config.fec_bytes))
    };

    match input {
        Some(path) if !raw => {
            let capture = WavCapture::open(&path)?;
            run_receiver(capture, corrector, format, config, cancel)
        }
        _ => {
            let stdin = BufReader::new(std::io::stdin().lock());
            let capture = RawCapture::new(stdin, sample_rate);
            run_receiver(capture, corrector, format, config, cancel)
        }
    }
}

fn run_receiver<C: CaptureSource>(
    capture: C,
    corrector: Box<dyn ErrorCorrector + Send>,
    format: OutputFormat,
    config: &ReceiverConfig,
    cancel: &CancellationToken,
) -> CliResult<ReceiverStats> {
    let mut receiver = Receiver::new(config, capture, corrector, Display::new(format))?;
    Ok(receiver.run(cancel)?)
}

fn scan_command(input: &Path, json: bool, config: &ReceiverConfig) -> CliResult<()> {
    let mut capture = WavCapture::open(input)?;
    let frame_samples = config.frame_samples(capture.sample_rate())?;
    let mut analyzer = SpectralAnalyzer::new();

    let mut index = 0u64;
    while let Some(frame) = capture.read_frame(frame_samples)? {
        let hz = analyzer.dominant(&frame)?;
        if json {
            println!("{}", serde_json::to_string(&ScanLine { frame: index, hz })?);
        } else {
            println!("{} => {:.1}", index, hz);
        }
        index += 1;
    }

    log::info!("Scanned {} frames of {} samples", index, frame_samples);
    Ok(())
}
