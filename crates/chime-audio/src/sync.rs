//! Bounded forward-scan resynchronization.
//!
//! Both formats share one scanning shape: slide a candidate window one byte
//! at a time through a bounded region of the stream, and accept a candidate
//! only when two successor headers (located by chaining frame sizes) also
//! check out. A single plausible header is not enough: natural audio data
//! contains byte patterns that look like sync words, and two successive
//! confirmations is the established reliability threshold for these
//! formats.

use tracing::{debug, trace};

use crate::buffer::StreamBuffer;
use crate::header::{
    self, adts_sync_ok, id3_tag_size, mp3_header_at, parse_adts_header, parse_mp3_header,
    ADTS_HEADER_LEN, ID3_TAG_HEADER_LEN, MP3_FIXED_HEADER_MASK, MP3_HEADER_LEN,
};

/// Bytes fetched from the stream per scan refill.
const RESYNC_CHUNK_LEN: usize = 1024;

/// Maximum distance scanned past the search start before giving up.
const RESYNC_MAX_SCAN: u64 = 8 * 1024;

/// Successor headers that must confirm a candidate.
const FRAME_MATCH_REQUIRED: usize = 2;

/// A confirmed synchronization point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPoint {
    /// Stream offset of the first byte of the confirmed frame.
    pub offset: u64,
    /// The confirmed 32-bit header value (MP3 only; zero for ADTS).
    pub header: u32,
}

/// Format-specific header checks plugged into the shared scan.
trait SyncFormat {
    const HEADER_LEN: usize;

    /// Validate a candidate header window; returns the header value carried
    /// forward to successor checks and the candidate's frame size.
    fn candidate(&self, window: &[u8]) -> Option<(u32, usize)>;

    /// Validate a successor header window against the candidate.
    fn successor(&self, candidate: u32, window: &[u8]) -> Option<usize>;
}

struct Mp3Sync {
    /// Fixed-field filter; zero disables filtering (first sync of a session).
    match_header: u32,
}

impl SyncFormat for Mp3Sync {
    const HEADER_LEN: usize = MP3_HEADER_LEN;

    fn candidate(&self, window: &[u8]) -> Option<(u32, usize)> {
        let header = mp3_header_at(window);
        if self.match_header != 0
            && header & MP3_FIXED_HEADER_MASK != self.match_header & MP3_FIXED_HEADER_MASK
        {
            return None;
        }
        parse_mp3_header(header).map(|info| (header, info.frame_size))
    }

    fn successor(&self, candidate: u32, window: &[u8]) -> Option<usize> {
        let header = mp3_header_at(window);
        if header & MP3_FIXED_HEADER_MASK != candidate & MP3_FIXED_HEADER_MASK {
            return None;
        }
        parse_mp3_header(header).map(|info| info.frame_size)
    }
}

struct AdtsSync;

impl SyncFormat for AdtsSync {
    const HEADER_LEN: usize = ADTS_HEADER_LEN;

    fn candidate(&self, window: &[u8]) -> Option<(u32, usize)> {
        parse_adts_header(window).map(|size| (0, size))
    }

    fn successor(&self, _candidate: u32, window: &[u8]) -> Option<usize> {
        if !adts_sync_ok(window) {
            return None;
        }
        parse_adts_header(window)
    }
}

/// Locate the next confirmable MP3 frame at or after `start`.
///
/// A non-zero `match_header` restricts candidates (and their successors) to
/// headers whose fixed fields agree with it. At offset 0 any leading ID3v2
/// tags are skipped first. The stream's committed position is untouched;
/// callers commit the returned offset explicitly.
pub fn resync_mp3(stream: &StreamBuffer, match_header: u32, start: u64) -> Option<SyncPoint> {
    trace!(match_header, start, "mp3 resync");
    let start = if start == 0 {
        skip_id3_tags(stream)?
    } else {
        start
    };
    scan(stream, &Mp3Sync { match_header }, start)
}

/// Locate the next confirmable ADTS frame at or after `start`.
pub fn resync_adts(stream: &StreamBuffer, start: u64) -> Option<SyncPoint> {
    trace!(start, "adts resync");
    scan(stream, &AdtsSync, start)
}

/// Skip any ID3v2 tags stacked at the head of the stream; returns the offset
/// of the first post-tag byte, or `None` when a tag header cannot be fully
/// read.
fn skip_id3_tags(stream: &StreamBuffer) -> Option<u64> {
    let mut pos = 0u64;
    loop {
        let mut tag_header = [0u8; ID3_TAG_HEADER_LEN];
        if stream.read_at(pos, &mut tag_header) < tag_header.len() {
            return None;
        }
        match id3_tag_size(&tag_header) {
            Some(len) => {
                debug!(pos, len, "skipping ID3v2 tag");
                pos += len as u64;
            }
            None => return Some(pos),
        }
    }
}

fn scan<F: SyncFormat>(stream: &StreamBuffer, format: &F, start: u64) -> Option<SyncPoint> {
    let mut pos = start;
    let mut buf = [0u8; RESYNC_CHUNK_LEN];
    // Window into `buf`: bytes at consumed..filled are still unscanned.
    let mut filled = 0usize;
    let mut consumed = 0usize;
    let mut reach_eos = false;

    loop {
        if pos >= start + RESYNC_MAX_SCAN {
            debug!(start, "resync scan window exhausted");
            return None;
        }

        if filled - consumed < F::HEADER_LEN {
            if reach_eos {
                return None;
            }

            // Carry unconsumed tail bytes over instead of re-reading them.
            let remaining = filled - consumed;
            buf.copy_within(consumed..filled, 0);
            filled = remaining;
            consumed = 0;

            let wanted = RESYNC_CHUNK_LEN - remaining;
            let n = stream.read_at(pos + remaining as u64, &mut buf[remaining..]);
            if n == 0 {
                return None;
            }
            reach_eos = n != wanted;
            filled += n;
            continue;
        }

        let window = &buf[consumed..consumed + F::HEADER_LEN];
        if let Some((candidate, frame_size)) = format.candidate(window) {
            trace!(pos, frame_size, "plausible frame header, probing successors");
            if confirm_successors(stream, format, pos, candidate, frame_size) {
                debug!(offset = pos, header = candidate, "resync confirmed");
                return Some(SyncPoint {
                    offset: pos,
                    header: candidate,
                });
            }
        }

        pos += 1;
        consumed += 1;
    }
}

/// Probe `FRAME_MATCH_REQUIRED` successor positions chained from a
/// candidate. Any failure rejects the candidate outright; scanning resumes
/// one byte past it, never past a failed probe position.
fn confirm_successors<F: SyncFormat>(
    stream: &StreamBuffer,
    format: &F,
    pos: u64,
    candidate: u32,
    frame_size: usize,
) -> bool {
    let mut test_pos = pos + frame_size as u64;
    let mut window = [0u8; ADTS_HEADER_LEN];
    let window = &mut window[..F::HEADER_LEN];

    for _ in 0..FRAME_MATCH_REQUIRED {
        if stream.read_at(test_pos, window) < window.len() {
            trace!(test_pos, "successor header unreadable");
            return false;
        }
        let Some(size) = format.successor(candidate, window) else {
            trace!(test_pos, "successor header invalid");
            return false;
        };
        test_pos += size as u64;
    }

    true
}
