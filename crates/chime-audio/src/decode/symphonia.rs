//! Symphonia-backed decoder for MP3 and raw AAC frames.
//!
//! Frames arrive as self-contained packets straight from the extractor, so
//! no symphonia format reader is involved; packets are built by hand and
//! fed to the codec registry's decoder. ADTS frames have their transport
//! header stripped first because the AAC decoder expects a raw data block.

use symphonia::core::audio::{AudioBufferRef, Channels, Signal};
use symphonia::core::codecs::{
    CodecParameters, CodecType, Decoder, DecoderOptions, CODEC_TYPE_AAC, CODEC_TYPE_MP3,
};
use symphonia::core::formats::Packet;
use tracing::{trace, warn};

use super::{DecoderConfig, FrameDecoder};
use chime_core::{Error, PcmBlock, Result};

pub struct SymphoniaDecoder {
    decoder: Box<dyn Decoder>,
    /// ADTS transport headers are removed before decoding.
    strip_adts: bool,
    next_ts: u64,
}

impl SymphoniaDecoder {
    pub fn mp3(config: &DecoderConfig) -> Result<Self> {
        Self::new(CODEC_TYPE_MP3, config, false)
    }

    pub fn aac(config: &DecoderConfig) -> Result<Self> {
        Self::new(CODEC_TYPE_AAC, config, true)
    }

    fn new(codec: CodecType, config: &DecoderConfig, strip_adts: bool) -> Result<Self> {
        let mut params = CodecParameters::new();
        params.for_codec(codec);
        if let Some(rate) = config.sample_rate {
            params.with_sample_rate(rate);
        }
        if let Some(channels) = config.channels {
            params.with_channels(channel_layout(channels));
        }

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| Error::Init(e.to_string()))?;

        Ok(Self {
            decoder,
            strip_adts,
            next_ts: 0,
        })
    }
}

impl FrameDecoder for SymphoniaDecoder {
    fn reset(&mut self) {
        self.decoder.reset();
        self.next_ts = 0;
    }

    fn decode(&mut self, frame: &[u8]) -> Result<PcmBlock> {
        let payload = if self.strip_adts {
            adts_payload(frame)?
        } else {
            frame
        };

        let packet = Packet::new_from_slice(0, self.next_ts, 0, payload);
        let decoded = self
            .decoder
            .decode(&packet)
            .map_err(|e| Error::Decode(e.to_string()))?;

        let block = interleave_f32(&decoded);
        trace!(
            frames = block.frame_count(),
            rate = block.sample_rate,
            "frame decoded"
        );
        self.next_ts += block.frame_count() as u64;
        Ok(block)
    }
}

/// Strip the ADTS transport header, honoring the protection_absent bit (a
/// present CRC extends the header from 7 to 9 bytes).
fn adts_payload(frame: &[u8]) -> Result<&[u8]> {
    let header_len = if frame.len() > 1 && frame[1] & 0x01 == 1 {
        7
    } else {
        9
    };
    if frame.len() < header_len {
        return Err(Error::Decode("adts frame shorter than its header".into()));
    }
    Ok(&frame[header_len..])
}

fn channel_layout(channels: u16) -> Channels {
    match channels {
        1 => Channels::FRONT_LEFT,
        _ => Channels::FRONT_LEFT | Channels::FRONT_RIGHT,
    }
}

/// Interleave a planar decoded buffer into frame-major f32 samples.
fn interleave_f32(decoded: &AudioBufferRef<'_>) -> PcmBlock {
    let spec = decoded.spec();
    let channels = spec.channels.count();
    let frames = decoded.frames();
    let mut samples = vec![0.0f32; frames * channels];

    macro_rules! interleave {
        ($buf:expr, $convert:expr) => {
            for ch in 0..channels {
                for (i, &s) in $buf.chan(ch).iter().enumerate() {
                    samples[i * channels + ch] = $convert(s);
                }
            }
        };
    }

    match decoded {
        AudioBufferRef::F32(buf) => interleave!(buf, |s: f32| s),
        AudioBufferRef::F64(buf) => interleave!(buf, |s: f64| s as f32),
        AudioBufferRef::S32(buf) => {
            interleave!(buf, |s: i32| s as f32 / i32::MAX as f32);
        }
        AudioBufferRef::S16(buf) => {
            interleave!(buf, |s: i16| f32::from(s) / f32::from(i16::MAX));
        }
        AudioBufferRef::U8(buf) => {
            interleave!(buf, |s: u8| (f32::from(s) - 128.0) / 128.0);
        }
        _ => {
            warn!("unsupported decoded sample format, dropping block");
            samples.clear();
        }
    }

    PcmBlock::new(samples, channels as u16, spec.rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adts_payload_without_crc() {
        // protection_absent set: 7-byte header
        let frame = [0xff, 0xf1, 0, 0, 0x04, 0x20, 0, 0xAA, 0xBB];
        assert_eq!(adts_payload(&frame).unwrap(), &[0xAA, 0xBB]);
    }

    #[test]
    fn test_adts_payload_with_crc() {
        // protection_absent clear: 9-byte header including CRC
        let frame = [0xff, 0xf0, 0, 0, 0x04, 0x20, 0, 0, 0, 0xCC];
        assert_eq!(adts_payload(&frame).unwrap(), &[0xCC]);
    }

    #[test]
    fn test_adts_payload_truncated() {
        assert!(adts_payload(&[0xff, 0xf1, 0]).is_err());
    }

    #[test]
    fn test_channel_layout() {
        assert_eq!(channel_layout(1).count(), 1);
        assert_eq!(channel_layout(2).count(), 2);
    }
}
