//! Decode an email file and print its readable form
//!
//! Run with: cargo run --example decode_eml -- message.eml
//!
//! The file must start with an opening line (an mbox `From ` line, for
//! instance) followed by CRLF and the message itself.

use std::io::Write;

use mimetar::{DecodeConfig, MessageDecoder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: decode_eml <message.eml> [--content-type]")?;
    let echo_content_type = std::env::args().any(|arg| arg == "--content-type");

    let config = if echo_content_type {
        DecodeConfig::with_content_type()
    } else {
        DecodeConfig::default()
    };
    let config = match std::env::var("MIMETAR_MAX_DEPTH") {
        Ok(depth) => config.max_depth(depth.parse()?),
        Err(_) => config,
    };

    let raw = std::fs::read(&path)?;
    let message = MessageDecoder::new(config).decode(&raw)?;

    eprintln!(
        "{}: {} header(s), {} body byte(s)",
        path,
        message.headers.len(),
        message.body.len()
    );
    std::io::stdout().write_all(&message.to_bytes())?;
    Ok(())
}
