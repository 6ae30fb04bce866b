//! Pure header codecs for MPEG audio and AAC(ADTS) elementary frames.
//!
//! Everything here is side-effect free: callers hand in raw header bytes and
//! get back validated frame identity and size. The arithmetic is unsigned
//! integer with floor division throughout, matching the decoder libraries'
//! frame sizing exactly.

/// Length of an MP3 frame header in bytes.
pub const MP3_HEADER_LEN: usize = 4;

/// Length of an AAC ADTS frame header in bytes (CRC form).
pub const ADTS_HEADER_LEN: usize = 9;

/// Length of an ID3v2 tag header in bytes.
pub const ID3_TAG_HEADER_LEN: usize = 10;

/// All eleven sync bits must be set for any MP3 frame.
const MP3_SYNC_VERIFY_MASK: u32 = 0xffe0_0000;

/// Version, layer and sample-rate bits. Identical for every frame of one
/// stream segment; bitrate and padding vary per frame under VBR.
pub const MP3_FIXED_HEADER_MASK: u32 = 0xfffe_0c00;

/// Smallest frame_length an ADTS header can legally declare (its own
/// CRC-less header).
const ADTS_MIN_FRAME_LEN: usize = 7;

const BITRATE_IDX_FREE: u32 = 0x0;
const BITRATE_IDX_BAD: u32 = 0xf;
const SAMPLE_RATE_IDX_UNDEFINED: u32 = 0x3;

// Sample rate (Hz) tables, indexed by the 2-bit sample-rate field.
const SAMPLE_RATES_V1: [u32; 3] = [44100, 48000, 32000];
const SAMPLE_RATES_V2: [u32; 3] = [22050, 24000, 16000];
const SAMPLE_RATES_V2_5: [u32; 3] = [11025, 12000, 8000];

// Bitrate (kbps) tables, indexed by (bitrate field - 1); index 0 is the
// unsupported free-format encoding and is rejected before lookup.
const BITRATES_V1_L1: [u32; 14] = [
    32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448,
];
const BITRATES_V2_L1: [u32; 14] = [
    32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256,
];
const BITRATES_V1_L2: [u32; 14] = [
    32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384,
];
const BITRATES_V1_L3: [u32; 14] = [
    32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];
const BITRATES_V2_L3: [u32; 14] = [8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

/// MPEG version encoded in an MP3 frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    V1,
    V2,
    V2_5,
}

/// MPEG layer encoded in an MP3 frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegLayer {
    L1,
    L2,
    L3,
}

/// Validated identity and size of one MP3 frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mp3FrameInfo {
    /// Total frame size in bytes, header included.
    pub frame_size: usize,
    pub version: MpegVersion,
    pub layer: MpegLayer,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub padding: bool,
}

/// Interpret four big-endian bytes as an MP3 header value.
pub fn mp3_header_at(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Validate a 32-bit MP3 frame header and compute the frame size.
///
/// Rejects headers with clear sync bits, undefined version or layer,
/// free/bad bitrate index, or undefined sample-rate index.
pub fn parse_mp3_header(header: u32) -> Option<Mp3FrameInfo> {
    if header & MP3_SYNC_VERIFY_MASK != MP3_SYNC_VERIFY_MASK {
        return None;
    }

    let version = match (header >> 19) & 0x3 {
        0 => MpegVersion::V2_5,
        2 => MpegVersion::V2,
        3 => MpegVersion::V1,
        _ => return None, // reserved
    };

    let layer = match (header >> 17) & 0x3 {
        1 => MpegLayer::L3,
        2 => MpegLayer::L2,
        3 => MpegLayer::L1,
        _ => return None, // reserved
    };

    let bitrate_index = (header >> 12) & 0xf;
    if bitrate_index == BITRATE_IDX_FREE || bitrate_index == BITRATE_IDX_BAD {
        return None;
    }

    let sample_rate_index = (header >> 10) & 0x3;
    if sample_rate_index == SAMPLE_RATE_IDX_UNDEFINED {
        return None;
    }

    let sample_rate = match version {
        MpegVersion::V1 => SAMPLE_RATES_V1[sample_rate_index as usize],
        MpegVersion::V2 => SAMPLE_RATES_V2[sample_rate_index as usize],
        MpegVersion::V2_5 => SAMPLE_RATES_V2_5[sample_rate_index as usize],
    };

    let padding = (header >> 9) & 0x1 == 1;
    let idx = (bitrate_index - 1) as usize;

    // Frame size = samples-per-frame * bitrate / 8 / sample rate + padding,
    // with 384 samples for Layer 1 (4-byte slots), 1152 for Layer 2 and
    // MPEG1 Layer 3, and 576 for MPEG2/2.5 Layer 3.
    let (bitrate_kbps, frame_size) = match (layer, version) {
        (MpegLayer::L1, MpegVersion::V1) => {
            let br = BITRATES_V1_L1[idx];
            (br, layer1_size(sample_rate, br, padding))
        }
        (MpegLayer::L1, _) => {
            let br = BITRATES_V2_L1[idx];
            (br, layer1_size(sample_rate, br, padding))
        }
        (MpegLayer::L2, MpegVersion::V1) => {
            let br = BITRATES_V1_L2[idx];
            (br, full_rate_size(sample_rate, br, padding))
        }
        (MpegLayer::L3, MpegVersion::V1) => {
            let br = BITRATES_V1_L3[idx];
            (br, full_rate_size(sample_rate, br, padding))
        }
        (MpegLayer::L3, _) => {
            let br = BITRATES_V2_L3[idx];
            (br, half_rate_size(sample_rate, br, padding))
        }
        (MpegLayer::L2, _) => {
            let br = BITRATES_V2_L3[idx];
            (br, full_rate_size(sample_rate, br, padding))
        }
    };

    Some(Mp3FrameInfo {
        frame_size,
        version,
        layer,
        bitrate_kbps,
        sample_rate,
        padding,
    })
}

fn layer1_size(sample_rate: u32, bitrate_kbps: u32, padding: bool) -> usize {
    (384 * (bitrate_kbps as usize) * 1000 / 8 / sample_rate as usize) + usize::from(padding) * 4
}

fn full_rate_size(sample_rate: u32, bitrate_kbps: u32, padding: bool) -> usize {
    (1152 * (bitrate_kbps as usize) * 1000 / 8 / sample_rate as usize) + usize::from(padding)
}

fn half_rate_size(sample_rate: u32, bitrate_kbps: u32, padding: bool) -> usize {
    (576 * (bitrate_kbps as usize) * 1000 / 8 / sample_rate as usize) + usize::from(padding)
}

/// Check the two-byte ADTS sync word.
pub fn adts_sync_ok(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0xff && (bytes[1] & 0xf6) == 0xf0
}

/// Validate an ADTS frame header and extract the declared frame length.
///
/// The length is a 13-bit field spanning bytes 3-5 and includes the header
/// itself; declared lengths shorter than a header are rejected.
pub fn parse_adts_header(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < ADTS_HEADER_LEN || !adts_sync_ok(bytes) {
        return None;
    }

    let frame_size = ((bytes[3] & 0x03) as usize) << 11 | (bytes[4] as usize) << 3 | (bytes[5] >> 5) as usize;
    if frame_size < ADTS_MIN_FRAME_LEN {
        return None;
    }

    Some(frame_size)
}

/// Total size (header plus body) of an ID3v2 tag starting at `bytes`, or
/// `None` if no tag signature is present.
///
/// The body length is stored 7 bits per byte, big-endian, in bytes 6-9 of
/// the 10-byte tag header.
pub fn id3_tag_size(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < ID3_TAG_HEADER_LEN || &bytes[..3] != b"ID3" {
        return None;
    }

    let body = ((bytes[6] & 0x7f) as usize) << 21
        | ((bytes[7] & 0x7f) as usize) << 14
        | ((bytes[8] & 0x7f) as usize) << 7
        | (bytes[9] & 0x7f) as usize;

    Some(ID3_TAG_HEADER_LEN + body)
}
