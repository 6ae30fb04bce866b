//! Byte ring buffer addressed by logical stream offsets.
//!
//! Unlike a plain FIFO, this ring retains bytes after they are read so the
//! demultiplexer can probe ahead and re-read frame boundaries. Bytes are
//! reclaimed two ways: eagerly by [`ByteRing::discard_to`] (an explicit
//! cursor commit) and lazily from the read watermark when a write needs
//! space. All methods take `&mut self`; shared access and locking live in
//! [`super::stream::StreamBuffer`].

/// Fixed-capacity byte ring over a contiguous logical stream.
pub struct ByteRing {
    /// The underlying storage.
    buffer: Box<[u8]>,
    /// Buffer capacity (power of 2 for efficient modulo).
    capacity: usize,
    /// Mask for efficient modulo (capacity - 1).
    mask: usize,
    /// Logical stream offset of the first retained byte.
    base: u64,
    /// Storage index of the first retained byte.
    start: usize,
    /// Number of retained bytes.
    len: usize,
    /// Highest read start position; bytes below it may be reclaimed under
    /// write pressure.
    watermark: u64,
}

impl ByteRing {
    /// Create a ring with the specified capacity, rounded up to the next
    /// power of 2.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.next_power_of_two();
        Self {
            buffer: vec![0u8; capacity].into_boxed_slice(),
            capacity,
            mask: capacity - 1,
            base: 0,
            start: 0,
            len: 0,
            watermark: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained bytes.
    pub const fn available_data(&self) -> usize {
        self.len
    }

    /// Free bytes before writes start reclaiming read data.
    pub const fn free_space(&self) -> usize {
        self.capacity - self.len
    }

    /// Logical offset of the first retained byte.
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Logical offset one past the last retained byte.
    pub const fn end(&self) -> u64 {
        self.base + self.len as u64
    }

    /// Append bytes at the logical end of the stream.
    ///
    /// When free space runs out, bytes below the read watermark are
    /// reclaimed; anything beyond that is refused and the short count
    /// returned.
    pub fn write(&mut self, data: &[u8]) -> usize {
        if data.len() > self.free_space() {
            let needed = data.len() - self.free_space();
            let reclaimable = (self.watermark - self.base) as usize;
            let reclaim = needed.min(reclaimable);
            self.pop_front(reclaim);
        }

        let to_write = data.len().min(self.free_space());
        if to_write == 0 {
            return 0;
        }

        let write_idx = (self.start + self.len) & self.mask;
        let first = to_write.min(self.capacity - write_idx);
        self.buffer[write_idx..write_idx + first].copy_from_slice(&data[..first]);
        if first < to_write {
            self.buffer[..to_write - first].copy_from_slice(&data[first..to_write]);
        }

        self.len += to_write;
        to_write
    }

    /// Copy retained bytes starting at logical `offset` into `out`.
    ///
    /// Returns the number of bytes copied; zero when `offset` lies below the
    /// retained range (already reclaimed) or at/past the logical end.
    pub fn read_at(&self, offset: u64, out: &mut [u8]) -> usize {
        if offset < self.base || offset >= self.end() {
            return 0;
        }

        let available = (self.end() - offset) as usize;
        let to_read = out.len().min(available);
        if to_read == 0 {
            return 0;
        }

        let read_idx = (self.start + (offset - self.base) as usize) & self.mask;
        let first = to_read.min(self.capacity - read_idx);
        out[..first].copy_from_slice(&self.buffer[read_idx..read_idx + first]);
        if first < to_read {
            out[first..to_read].copy_from_slice(&self.buffer[..to_read - first]);
        }

        to_read
    }

    /// Record that a read started at `offset`, making everything below it
    /// eligible for lazy reclamation.
    pub fn mark_read(&mut self, offset: u64) {
        let clamped = offset.min(self.end());
        if clamped > self.watermark {
            self.watermark = clamped;
        }
    }

    /// Eagerly discard every byte below logical `offset` (cursor commit).
    ///
    /// Commits are monotonic; an `offset` at or below the current base is a
    /// no-op, and one past the end clamps to the end.
    pub fn discard_to(&mut self, offset: u64) {
        let clamped = offset.min(self.end());
        if clamped > self.base {
            self.pop_front((clamped - self.base) as usize);
        }
    }

    fn pop_front(&mut self, count: usize) {
        let count = count.min(self.len);
        self.start = (self.start + count) & self.mask;
        self.len -= count;
        self.base += count as u64;
        if self.watermark < self.base {
            self.watermark = self.base;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_at() {
        let mut ring = ByteRing::new(64);
        assert_eq!(ring.write(b"hello world"), 11);
        assert_eq!(ring.available_data(), 11);

        let mut out = [0u8; 5];
        assert_eq!(ring.read_at(6, &mut out), 5);
        assert_eq!(&out, b"world");

        // Reads do not consume
        assert_eq!(ring.read_at(0, &mut out), 5);
        assert_eq!(&out, b"hello");
    }

    #[test]
    fn test_read_out_of_range() {
        let mut ring = ByteRing::new(64);
        ring.write(b"abcdef");

        let mut out = [0u8; 8];
        assert_eq!(ring.read_at(6, &mut out), 0);
        assert_eq!(ring.read_at(100, &mut out), 0);

        // Short read at the tail
        assert_eq!(ring.read_at(4, &mut out), 2);
        assert_eq!(&out[..2], b"ef");
    }

    #[test]
    fn test_wrap_around() {
        let mut ring = ByteRing::new(8);
        assert_eq!(ring.capacity(), 8);

        ring.write(b"01234567");
        ring.discard_to(6);
        assert_eq!(ring.write(b"abcdef"), 6);
        assert_eq!(ring.available_data(), 8);

        let mut out = [0u8; 8];
        assert_eq!(ring.read_at(6, &mut out), 8);
        assert_eq!(&out, b"67abcdef");
    }

    #[test]
    fn test_discard_monotonic() {
        let mut ring = ByteRing::new(32);
        ring.write(b"0123456789");
        ring.discard_to(4);
        assert_eq!(ring.base(), 4);

        // Going backwards is a no-op
        ring.discard_to(2);
        assert_eq!(ring.base(), 4);

        let mut out = [0u8; 4];
        assert_eq!(ring.read_at(0, &mut out), 0);
        assert_eq!(ring.read_at(4, &mut out), 4);
        assert_eq!(&out, b"4567");
    }

    #[test]
    fn test_lazy_reclamation() {
        let mut ring = ByteRing::new(16);
        ring.write(b"0123456789abcdef");
        assert_eq!(ring.free_space(), 0);

        // Nothing marked read yet: writes are refused
        assert_eq!(ring.write(b"xy"), 0);

        ring.mark_read(6);
        assert_eq!(ring.write(b"XYZZ"), 4);
        assert_eq!(ring.base(), 4);

        let mut out = [0u8; 4];
        assert_eq!(ring.read_at(16, &mut out), 4);
        assert_eq!(&out, b"XYZZ");
        // Bytes below the new base are gone
        assert_eq!(ring.read_at(0, &mut out), 0);
    }

    #[test]
    fn test_watermark_tracks_base() {
        let mut ring = ByteRing::new(16);
        ring.write(b"0123456789");
        ring.mark_read(3);
        ring.discard_to(8);
        // Watermark never trails the base after an eager commit
        ring.write(b"abcdefgh");
        assert_eq!(ring.base(), 8);
    }
}
