//! Content-based stream classification.
//!
//! Detection probes the head of the stream without consuming it: commit-on-
//! read is suppressed for the duration of each probe so the classified bytes
//! are still there for the extractor. MP3 is probed before ADTS because a
//! raw AAC sync word (0xFFF) is a subset of the MP3 sync pattern; the
//! stricter MP3 successor chain disambiguates.

use tracing::{debug, trace};

use crate::buffer::StreamBuffer;
use crate::header::{id3_tag_size, ID3_TAG_HEADER_LEN};
use crate::sync::{resync_adts, resync_mp3};
use chime_core::AudioType;

/// Classify the stream's head bytes.
///
/// Returns [`AudioType::Unknown`] when neither format can be confirmed
/// within the resynchronization window.
pub fn detect_audio_type(stream: &StreamBuffer) -> AudioType {
    if is_mp3_stream(stream) {
        debug!("stream classified as mp3");
        return AudioType::Mp3;
    }
    if is_adts_stream(stream) {
        debug!("stream classified as aac (adts)");
        return AudioType::Aac;
    }
    debug!("stream classification failed");
    AudioType::Unknown
}

/// True when the stream opens with an ID3v2 tag or a confirmable MP3 frame
/// chain. The probe does not consume any bytes.
pub fn is_mp3_stream(stream: &StreamBuffer) -> bool {
    let _guard = stream.suppress_dequeue();

    let mut head = [0u8; ID3_TAG_HEADER_LEN];
    if stream.read_at(0, &mut head) == head.len() && id3_tag_size(&head).is_some() {
        trace!("leading ID3v2 tag, assuming mp3");
        return true;
    }

    resync_mp3(stream, 0, 0).is_some()
}

/// True when the stream opens with a confirmable ADTS frame chain. ADIF
/// streams carry no frame boundaries and are rejected outright. The probe
/// does not consume any bytes.
pub fn is_adts_stream(stream: &StreamBuffer) -> bool {
    let _guard = stream.suppress_dequeue();

    let mut head = [0u8; 4];
    if stream.read_at(0, &mut head) == head.len() && &head == b"ADIF" {
        trace!("ADIF stream, not frame-addressable");
        return false;
    }

    resync_adts(stream, 0).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::tests::{adts_frame, mp3_frame, H128};

    fn stream_with(data: &[u8]) -> StreamBuffer {
        let stream = StreamBuffer::new(64 * 1024);
        assert_eq!(stream.write(data), data.len());
        stream
    }

    #[test]
    fn test_detect_mp3() {
        let mut data = Vec::new();
        for _ in 0..3 {
            data.extend_from_slice(&mp3_frame(H128));
        }
        let stream = stream_with(&data);
        assert_eq!(detect_audio_type(&stream), AudioType::Mp3);
    }

    #[test]
    fn test_detect_mp3_by_id3_tag() {
        // The tag alone classifies the stream, even before audio arrives.
        let mut data = Vec::new();
        data.extend_from_slice(b"ID3");
        data.extend_from_slice(&[3, 0, 0, 0, 0, 0, 50]);
        let stream = stream_with(&data);
        assert_eq!(detect_audio_type(&stream), AudioType::Mp3);
    }

    #[test]
    fn test_detect_adts() {
        let mut data = Vec::new();
        for size in [128usize, 96, 256] {
            data.extend_from_slice(&adts_frame(size));
        }
        let stream = stream_with(&data);
        assert_eq!(detect_audio_type(&stream), AudioType::Aac);
    }

    #[test]
    fn test_detect_rejects_adif() {
        let mut data = Vec::new();
        data.extend_from_slice(b"ADIF");
        data.extend_from_slice(&[0u8; 512]);
        let stream = stream_with(&data);
        assert!(!is_adts_stream(&stream));
        assert_eq!(detect_audio_type(&stream), AudioType::Unknown);
    }

    #[test]
    fn test_detect_garbage_is_unknown() {
        let stream = stream_with(&[0x42u8; 2048]);
        assert_eq!(detect_audio_type(&stream), AudioType::Unknown);
    }

    #[test]
    fn test_detection_does_not_consume() {
        let mut data = Vec::new();
        for _ in 0..3 {
            data.extend_from_slice(&mp3_frame(H128));
        }
        let stream = stream_with(&data);

        assert_eq!(detect_audio_type(&stream), AudioType::Mp3);
        assert_eq!(stream.committed(), 0);
        assert_eq!(stream.available_data(), data.len());

        // The head bytes are still readable for the extractor.
        let mut head = [0u8; 4];
        assert_eq!(stream.read_at(0, &mut head), 4);
        assert_eq!(u32::from_be_bytes(head), H128);
    }
}
