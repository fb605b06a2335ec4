// End-to-end receiver tests over synthesized transmissions.
//
// Each tone is held for one symbol interval (two analysis frames), framed by
// the start and end handshake tones, the way the sender emits them.

use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use reed_solomon::Encoder;
use sonicrx_core::{
    CancellationToken, CaptureSource, Frame, MemoryCapture, PassThrough, Receiver,
    ReceiverConfig, ReedSolomonCorrector, Result, FEC_BYTES,
};
use std::f64::consts::PI;

const SAMPLE_RATE: u32 = 44100;
const AMPLITUDE: f64 = 12000.0;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn tone(freq: f64, len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| (2.0 * PI * freq * i as f64 / SAMPLE_RATE as f64).sin() * AMPLITUDE)
        .collect()
}

fn symbol_samples(config: &ReceiverConfig) -> usize {
    (config.symbol_interval_secs * SAMPLE_RATE as f64).round() as usize
}

/// Split bytes into `bits`-wide symbols, most significant first
fn to_symbols(bytes: &[u8], bits: u32) -> Vec<u32> {
    let mut symbols = Vec::new();
    let mut acc: u32 = 0;
    let mut acc_bits = 0;
    for &byte in bytes {
        acc = (acc << 8) | byte as u32;
        acc_bits += 8;
        while acc_bits >= bits {
            acc_bits -= bits;
            symbols.push((acc >> acc_bits) & ((1 << bits) - 1));
        }
        acc &= (1 << acc_bits) - 1;
    }
    symbols
}

/// Tone sequence for one transmission: start handshake, data, end handshake
fn transmission_tones(config: &ReceiverConfig, symbols: &[u32]) -> Vec<f64> {
    let mut tones = vec![config.handshake_start_hz];
    tones.extend(
        symbols
            .iter()
            .map(|&s| config.start_hz + s as f64 * config.step_hz),
    );
    tones.push(config.handshake_end_hz);
    tones
}

fn render(config: &ReceiverConfig, tones: &[f64]) -> Vec<f64> {
    let len = symbol_samples(config);
    tones.iter().flat_map(|&f| tone(f, len)).collect()
}

fn to_pcm(samples: &[f64]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| s.clamp(i16::MIN as f64, i16::MAX as f64) as i16)
        .collect()
}

fn rs_encode(payload: &[u8]) -> Vec<u8> {
    Encoder::new(FEC_BYTES).encode(payload).to_vec()
}

fn transmit(config: &ReceiverConfig, payload: &[u8]) -> Vec<f64> {
    let symbols = to_symbols(&rs_encode(payload), config.bits);
    render(config, &transmission_tones(config, &symbols))
}

fn receive(config: &ReceiverConfig, samples: Vec<i16>) -> (Vec<Vec<u8>>, sonicrx_core::ReceiverStats) {
    let capture = MemoryCapture::new(samples, SAMPLE_RATE);
    let mut receiver = Receiver::new(
        config,
        capture,
        ReedSolomonCorrector::new(config.fec_bytes),
        Vec::new(),
    )
    .expect("Failed to create receiver");
    let stats = receiver
        .run(&CancellationToken::new())
        .expect("Receiver failed");
    (receiver.into_sink(), stats)
}

#[test]
fn test_receive_single_packet() {
    init_logger();
    let config = ReceiverConfig::default();
    let mut audio = vec![0.0; 4410];
    audio.extend(transmit(&config, b"hello"));
    audio.extend(vec![0.0; 4410]);

    let (payloads, stats) = receive(&config, to_pcm(&audio));
    assert_eq!(payloads, vec![b"hello".to_vec()]);
    assert_eq!(stats.packets_decoded, 1);
    assert_eq!(stats.packets_failed, 0);
    assert_eq!(stats.packets_incomplete, 0);
}

#[test]
fn test_receive_with_unaligned_start() {
    let config = ReceiverConfig::default();
    // Tones straddle frame boundaries by 300 samples
    let mut audio = vec![0.0; 300];
    audio.extend(transmit(&config, b"offset"));
    audio.extend(vec![0.0; 4410]);

    let (payloads, _) = receive(&config, to_pcm(&audio));
    assert_eq!(payloads, vec![b"offset".to_vec()]);
}

#[test]
fn test_receive_back_to_back_packets() {
    let config = ReceiverConfig::default();
    let mut audio = Vec::new();
    for payload in [&b"first"[..], &b"second"[..], &[0x00, 0xFF, 0x7E][..]] {
        audio.extend(transmit(&config, payload));
        audio.extend(vec![0.0; 2205]);
    }

    let (payloads, stats) = receive(&config, to_pcm(&audio));
    assert_eq!(
        payloads,
        vec![b"first".to_vec(), b"second".to_vec(), vec![0x00, 0xFF, 0x7E]]
    );
    assert_eq!(stats.packets_started, 3);
}

#[test]
fn test_receive_with_noise() {
    let config = ReceiverConfig::default();
    let mut audio = vec![0.0; 4410];
    audio.extend(transmit(&config, b"noisy channel"));
    audio.extend(vec![0.0; 4410]);

    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let noise = Normal::new(0.0, 1500.0).unwrap();
    for sample in audio.iter_mut() {
        *sample += noise.sample(&mut rng);
    }

    let (payloads, _) = receive(&config, to_pcm(&audio));
    assert_eq!(payloads, vec![b"noisy channel".to_vec()]);
}

#[test]
fn test_fec_repairs_corrupted_symbol() {
    let config = ReceiverConfig::default();
    let mut symbols = to_symbols(&rs_encode(b"repair me"), config.bits);
    // Flip one nibble: a single corrupted byte is within correction capacity
    symbols[3] ^= 0x9;

    let audio = render(&config, &transmission_tones(&config, &symbols));
    let (payloads, stats) = receive(&config, to_pcm(&audio));
    assert_eq!(payloads, vec![b"repair me".to_vec()]);
    assert_eq!(stats.packets_failed, 0);
}

#[test]
fn test_uncorrectable_packet_does_not_block_next() {
    let config = ReceiverConfig::default();
    let mut garbage = to_symbols(&rs_encode(b"broken"), config.bits);
    // Corrupt four separate bytes, beyond what 4 parity bytes can repair
    for i in [0, 2, 4, 6] {
        garbage[i * 2] ^= 0xF;
    }

    let mut audio = render(&config, &transmission_tones(&config, &garbage));
    audio.extend(transmit(&config, b"intact"));

    let (payloads, stats) = receive(&config, to_pcm(&audio));
    assert_eq!(payloads.last(), Some(&b"intact".to_vec()));
    assert!(!payloads.contains(&b"broken".to_vec()));
    assert_eq!(stats.packets_started, 2);
}

#[test]
fn test_unterminated_packet_is_discarded() {
    let config = ReceiverConfig::default();
    let symbols = to_symbols(&rs_encode(b"lost"), config.bits);
    let mut tones = transmission_tones(&config, &symbols);
    tones.pop();

    let audio = render(&config, &tones);
    let (payloads, stats) = receive(&config, to_pcm(&audio));
    assert!(payloads.is_empty());
    assert_eq!(stats.packets_started, 1);
    assert_eq!(stats.packets_incomplete, 1);
}

#[test]
fn test_unterminated_packet_bounded_by_config() {
    let config = ReceiverConfig {
        max_packet_frequencies: Some(40),
        ..ReceiverConfig::default()
    };
    // A start tone followed by a long run of data with no end handshake
    let mut tones = vec![config.handshake_start_hz];
    tones.extend(std::iter::repeat(config.start_hz).take(30));
    let mut audio = render(&config, &tones);
    audio.extend(transmit(&config, b"after"));

    let (payloads, stats) = receive(&config, to_pcm(&audio));
    assert_eq!(stats.packets_dropped, 1);
    assert_eq!(payloads, vec![b"after".to_vec()]);
}

#[test]
fn test_narrow_symbols_without_fec() {
    let config = ReceiverConfig {
        bits: 2,
        fec_bytes: 0,
        ..ReceiverConfig::default()
    };
    let symbols = to_symbols(b"2b", config.bits);
    assert_eq!(symbols.len(), 8);
    let audio = render(&config, &transmission_tones(&config, &symbols));

    let capture = MemoryCapture::new(to_pcm(&audio), SAMPLE_RATE);
    let mut receiver = Receiver::new(&config, capture, PassThrough, Vec::<Vec<u8>>::new()).unwrap();
    receiver.run(&CancellationToken::new()).unwrap();
    assert_eq!(receiver.into_sink(), vec![b"2b".to_vec()]);
}

/// Capture that requests cancellation after a fixed number of frames
struct CancelAfter {
    inner: MemoryCapture,
    frames_left: usize,
    token: CancellationToken,
}

impl CaptureSource for CancelAfter {
    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn read_frame(&mut self, frame_samples: usize) -> Result<Option<Frame>> {
        if self.frames_left == 0 {
            self.token.cancel();
        } else {
            self.frames_left -= 1;
        }
        self.inner.read_frame(frame_samples)
    }
}

#[test]
fn test_cancellation_mid_packet_discards_packet() {
    let config = ReceiverConfig::default();
    let audio = transmit(&config, b"cancelled");
    let token = CancellationToken::new();
    let capture = CancelAfter {
        inner: MemoryCapture::new(to_pcm(&audio), SAMPLE_RATE),
        frames_left: 10,
        token: token.clone(),
    };

    let mut receiver = Receiver::new(
        &config,
        capture,
        ReedSolomonCorrector::new(config.fec_bytes),
        Vec::<Vec<u8>>::new(),
    )
    .unwrap();
    let stats = receiver.run(&token).unwrap();

    assert_eq!(stats.frames, 11);
    assert_eq!(stats.packets_incomplete, 1);
    assert!(receiver.into_sink().is_empty());
}
