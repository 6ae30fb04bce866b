//! # chime-audio
//!
//! Streaming MP3/AAC(ADTS) elementary-frame demultiplexer and player core.
//!
//! Features:
//! - Bit-exact MP3 and ADTS header parsing with validated frame sizing
//! - Bounded forward-scan resynchronization with multi-frame confirmation
//! - Producer/consumer byte buffering with speculative (non-consuming) probes
//! - Pull-decode-emit player loop that survives corrupt frames

pub mod buffer;
pub mod decode;
pub mod detect;
pub mod engine;
pub mod extract;
pub mod header;
pub mod sync;

pub use buffer::{DequeueGuard, StreamBuffer};
pub use decode::{DecoderConfig, FrameDecoder};
pub use engine::{PlayerCallbacks, StreamPlayer};
