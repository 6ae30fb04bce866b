//! Frame decoding behind a trait seam.
//!
//! The player loop only sees [`FrameDecoder`]; the concrete backend
//! ([`SymphoniaDecoder`]) is chosen by [`make_decoder`] from the detected
//! stream type. Tests substitute their own implementations.

mod symphonia;

pub use self::symphonia::SymphoniaDecoder;

use chime_core::{AudioType, Error, PcmBlock, Result};

/// Decoder parameters negotiated before the first frame.
///
/// Fields left `None` are discovered by the decoder from the frame headers
/// themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecoderConfig {
    /// Output channel count hint.
    pub channels: Option<u16>,
    /// Sample rate hint in Hz.
    pub sample_rate: Option<u32>,
}

/// A stateful elementary-frame decoder.
pub trait FrameDecoder: Send {
    /// Drop internal predictor/overlap state, e.g. after a resync gap.
    fn reset(&mut self);

    /// Decode one complete frame (header included) into interleaved PCM.
    fn decode(&mut self, frame: &[u8]) -> Result<PcmBlock>;
}

impl std::fmt::Debug for dyn FrameDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FrameDecoder")
    }
}

/// Instantiate the decoder backend for a classified stream.
pub fn make_decoder(
    audio_type: AudioType,
    config: &DecoderConfig,
) -> Result<Box<dyn FrameDecoder>> {
    match audio_type {
        AudioType::Mp3 => Ok(Box::new(SymphoniaDecoder::mp3(config)?)),
        AudioType::Aac => Ok(Box::new(SymphoniaDecoder::aac(config)?)),
        AudioType::Unknown => Err(Error::Init(
            "no decoder for an unclassified stream".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_decoder_mp3() {
        let config = DecoderConfig {
            channels: Some(2),
            sample_rate: Some(44_100),
        };
        assert!(make_decoder(AudioType::Mp3, &config).is_ok());
    }

    #[test]
    fn test_make_decoder_unknown_rejected() {
        let err = make_decoder(AudioType::Unknown, &DecoderConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Init(_)));
    }
}
