//! List a tar archive while streaming it through the chunk bridge
//!
//! Run with: cargo run --example list_tar -- archive.tar
//!
//! Entries ending in `.eml` are decoded and their subject lines printed.

use mimetar::{AsyncReadSource, MessageDecoder, open_archive};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: list_tar <archive.tar>")?;
    let file = tokio::fs::File::open(&path).await?;
    let mut reader = open_archive(AsyncReadSource::with_chunk_size(file, 16 * 1024));
    let decoder = MessageDecoder::default();

    let mut count = 0;
    while let Some(entry) = reader.next_entry().await? {
        count += 1;
        println!("{} {:>10} {}", entry.type_flag, entry.size, entry.name);

        if entry.is_file() && entry.name.ends_with(".eml") {
            let raw = reader.read_entry_to_end().await?;
            match decoder.decode(&raw) {
                Ok(message) => {
                    for (name, value) in &message.headers {
                        if name == "Subject" {
                            println!("           subject: {value}");
                        }
                    }
                }
                Err(e) => println!("           not decodable: {e}"),
            }
        }
    }

    println!("{count} entries");
    Ok(())
}
