//! Decode a local MP3 or ADTS file and report what came out.
//!
//! ```sh
//! cargo run --example play_file -- path/to/stream.mp3
//! ```

use std::fs::File;
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chime_audio::{PlayerCallbacks, StreamPlayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: play_file <audio file>")?;
    let mut file = File::open(&path)?;

    let samples = Arc::new(AtomicU64::new(0));
    let samples_out = Arc::clone(&samples);

    let callbacks = PlayerCallbacks {
        configure: Box::new(|audio_type, _config| {
            info!(?audio_type, "stream classified");
        }),
        input: Box::new(move |stream| {
            let mut chunk = [0u8; 4096];
            match file.read(&mut chunk) {
                Ok(n) => stream.write(&chunk[..n]),
                Err(_) => 0,
            }
        }),
        output: Box::new(move |block| {
            samples_out.fetch_add(block.sample_count() as u64, Ordering::Relaxed);
        }),
    };

    let mut player = StreamPlayer::new(256 * 1024, callbacks);
    player.run()?;
    player.finish();

    info!(
        path = %path,
        samples = samples.load(Ordering::Relaxed),
        "playback complete"
    );
    Ok(())
}
