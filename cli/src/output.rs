use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use sonicrx_core::{to_hex, PayloadSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Decoded payloads as text, one per line
    Text,
    /// One JSON object per packet
    Json,
}

/// Prints decoded payloads as (lossy) UTF-8 text
pub struct TextSink;

impl PayloadSink for TextSink {
    fn present(&mut self, payload: &[u8]) {
        println!("{}", String::from_utf8_lossy(payload));
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PacketEvent {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PacketEvent {
    pub fn decoded(payload: &[u8]) -> Self {
        Self {
            status: "decoded",
            text: std::str::from_utf8(payload).ok().map(str::to_string),
            payload_base64: Some(STANDARD.encode(payload)),
            raw_hex: None,
            reason: None,
        }
    }

    pub fn failed(raw: &[u8], reason: &str) -> Self {
        Self {
            status: "failed",
            text: None,
            payload_base64: None,
            raw_hex: Some(to_hex(raw)),
            reason: Some(reason.to_string()),
        }
    }
}

/// Emits one JSON line per packet, including failures
pub struct JsonSink;

impl JsonSink {
    fn emit(&self, event: &PacketEvent) {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => log::error!("failed to serialize packet event: {}", e),
        }
    }
}

impl PayloadSink for JsonSink {
    fn present(&mut self, payload: &[u8]) {
        self.emit(&PacketEvent::decoded(payload));
    }

    fn report_failure(&mut self, raw: &[u8], reason: &str) {
        self.emit(&PacketEvent::failed(raw, reason));
    }
}

/// Sink selected at runtime from `--format`
pub enum Display {
    Text(TextSink),
    Json(JsonSink),
}

impl Display {
    pub fn new(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => Display::Text(TextSink),
            OutputFormat::Json => Display::Json(JsonSink),
        }
    }
}

impl PayloadSink for Display {
    fn present(&mut self, payload: &[u8]) {
        match self {
            Display::Text(sink) => sink.present(payload),
            Display::Json(sink) => sink.present(payload),
        }
    }

    fn report_failure(&mut self, raw: &[u8], reason: &str) {
        match self {
            Display::Text(sink) => sink.report_failure(raw, reason),
            Display::Json(sink) => sink.report_failure(raw, reason),
        }
    }
}
