//! Core domain types for chime.

use serde::{Deserialize, Serialize};

/// Elementary-stream framing recognized by the demultiplexer.
///
/// Detected once per session; immutable after the first successful
/// classification.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AudioType {
    /// Not yet classified (or unclassifiable).
    #[default]
    Unknown,
    /// MPEG audio (Layer 1-3) elementary frames.
    Mp3,
    /// AAC with ADTS per-frame headers.
    Aac,
}

impl AudioType {
    /// Whether this is a concrete, decodable stream type.
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// One decoded block of PCM audio, delivered to the output callback.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PcmBlock {
    /// Interleaved samples (frame-major, channel-minor).
    pub samples: Vec<f32>,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl PcmBlock {
    pub const fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    /// Total interleaved sample count.
    pub const fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Number of PCM frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }
}

/// Lifecycle of a player session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlayerState {
    /// Created, stream type not yet classified.
    #[default]
    Idle,
    /// Stream type classified, decoder not yet initialized.
    TypeDetected,
    /// Decoder initialized and synced to the first frame.
    DecoderReady,
    /// Pull-decode-emit loop in progress.
    Running,
    /// End of stream reached or session torn down.
    Finished,
}
