//! Stateful frame extraction from the shared byte stream.
//!
//! A [`FrameReader`] owns the session's read cursor. Each pull validates a
//! header at the cursor, falls back to resynchronization when validation
//! fails, reads exactly one frame, and commits the consumed range back to
//! the stream so the ring can reclaim it.

use bytes::Bytes;
use tracing::{debug, trace};

use crate::buffer::StreamBuffer;
use crate::header::{
    mp3_header_at, parse_adts_header, parse_mp3_header, ADTS_HEADER_LEN, MP3_FIXED_HEADER_MASK,
    MP3_HEADER_LEN,
};
use crate::sync::{resync_adts, resync_mp3};
use chime_core::{AudioType, Error, Result};

/// One demultiplexed elementary frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Stream offset of the first frame byte.
    pub offset: u64,
    /// Raw frame bytes, header included.
    pub data: Bytes,
}

/// The session's exclusively-owned read position, plus (for MP3) the fixed
/// header captured at the last confirmed sync point.
#[derive(Debug, Clone, Copy)]
pub struct StreamCursor {
    pub pos: u64,
    pub fixed_header: u32,
}

/// Format-specific frame reader over the shared stream.
pub enum FrameReader {
    Mp3(StreamCursor),
    Adts { pos: u64 },
}

impl FrameReader {
    /// Sync to the first confirmable frame and commit the found offset.
    ///
    /// For MP3 this also captures the session's fixed header value, which
    /// every subsequent frame must agree with.
    pub fn init(audio_type: AudioType, stream: &StreamBuffer) -> Result<Self> {
        match audio_type {
            AudioType::Mp3 => {
                let sp = resync_mp3(stream, 0, 0).ok_or(Error::SyncLost)?;
                stream.commit(sp.offset);
                debug!(offset = sp.offset, header = format_args!("{:#010x}", sp.header), "mp3 stream synced");
                Ok(Self::Mp3(StreamCursor {
                    pos: sp.offset,
                    fixed_header: sp.header,
                }))
            }
            AudioType::Aac => {
                let sp = resync_adts(stream, 0).ok_or(Error::SyncLost)?;
                stream.commit(sp.offset);
                debug!(offset = sp.offset, "adts stream synced");
                Ok(Self::Adts { pos: sp.offset })
            }
            AudioType::Unknown => Err(Error::UnsupportedFormat(
                "cannot extract frames from an unclassified stream".into(),
            )),
        }
    }

    /// Current cursor position.
    pub const fn position(&self) -> u64 {
        match self {
            Self::Mp3(cursor) => cursor.pos,
            Self::Adts { pos } => *pos,
        }
    }

    /// Pull the next frame, resynchronizing through garbage as needed.
    ///
    /// Returns `None` at end of stream: either the bytes ran out mid-frame
    /// or no confirmable frame exists within the scan window.
    pub fn next_frame(&mut self, stream: &StreamBuffer) -> Option<Frame> {
        match self {
            Self::Mp3(cursor) => next_mp3_frame(stream, cursor),
            Self::Adts { pos } => next_adts_frame(stream, pos),
        }
    }
}

fn next_mp3_frame(stream: &StreamBuffer, cursor: &mut StreamCursor) -> Option<Frame> {
    let frame_size;
    loop {
        let mut header_bytes = [0u8; MP3_HEADER_LEN];
        if stream.read_at(cursor.pos, &mut header_bytes) < MP3_HEADER_LEN {
            return None;
        }

        let header = mp3_header_at(&header_bytes);
        if header & MP3_FIXED_HEADER_MASK == cursor.fixed_header & MP3_FIXED_HEADER_MASK {
            if let Some(info) = parse_mp3_header(header) {
                frame_size = info.frame_size;
                break;
            }
        }

        // Lost sync: scan forward under the session's fixed-field filter.
        debug!(pos = cursor.pos, "mp3 sync lost, rescanning");
        let sp = resync_mp3(stream, cursor.fixed_header, cursor.pos)?;
        cursor.pos = sp.offset;
        stream.commit(cursor.pos);
        // Try again at the new position.
    }

    read_frame_at(stream, cursor.pos, frame_size).map(|data| {
        let frame = Frame {
            offset: cursor.pos,
            data,
        };
        cursor.pos += frame_size as u64;
        stream.commit(cursor.pos);
        frame
    })
}

fn next_adts_frame(stream: &StreamBuffer, pos: &mut u64) -> Option<Frame> {
    let frame_size;
    loop {
        let mut header_bytes = [0u8; ADTS_HEADER_LEN];
        if stream.read_at(*pos, &mut header_bytes) < ADTS_HEADER_LEN {
            return None;
        }

        if let Some(size) = parse_adts_header(&header_bytes) {
            frame_size = size;
            break;
        }

        debug!(pos = *pos, "adts sync lost, rescanning");
        let sp = resync_adts(stream, *pos)?;
        *pos = sp.offset;
        stream.commit(*pos);
    }

    read_frame_at(stream, *pos, frame_size).map(|data| {
        let frame = Frame { offset: *pos, data };
        *pos += frame_size as u64;
        stream.commit(*pos);
        frame
    })
}

fn read_frame_at(stream: &StreamBuffer, pos: u64, frame_size: usize) -> Option<Bytes> {
    let mut data = vec![0u8; frame_size];
    let n = stream.read_at(pos, &mut data);
    if n < frame_size {
        trace!(pos, frame_size, got = n, "short read on frame body");
        return None;
    }
    Some(data.into())
}
