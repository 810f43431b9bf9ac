use std::cmp::min;
use std::io::{Read, Write};

/// Fixed-capacity circular buffer sitting between the serial stream and the frame decoder.
///
/// Bytes are appended at the tail by [`read_from`](RingByteBuffer::read_from) or `Write`,
/// and consumed from the head with [`skip_bytes`](RingByteBuffer::skip_bytes) once the
/// decoder has looked at them.
#[derive(Debug, Clone, PartialEq)]
pub struct RingByteBuffer {
    buf: Vec<u8>,
    head: usize,
    size: usize,
}

impl RingByteBuffer {
    /// Creates an empty buffer able to hold `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> RingByteBuffer {
        RingByteBuffer {
            buf: vec![0; capacity],
            head: 0,
            size: 0,
        }
    }

    /// Number of unread bytes.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes that can still be written before the buffer is full.
    pub fn free_space(&self) -> usize {
        self.buf.len() - self.size
    }

    /// Discards all unread bytes.
    pub fn clear(&mut self) {
        self.head = 0;
        self.size = 0;
    }

    fn tail(&self) -> usize {
        (self.head + self.size) % self.buf.len()
    }

    /// The oldest unread bytes, up to the physical end of the storage.
    ///
    /// When the unread region wraps, only the first part is returned; skip it and
    /// call again to reach the rest.
    pub fn current_read_slice(&self) -> &[u8] {
        let end = min(self.head + self.size, self.buf.len());
        &self.buf[self.head..end]
    }

    /// Drops up to `bytes` unread bytes from the head, returning how many were dropped.
    pub fn skip_bytes(&mut self, bytes: usize) -> usize {
        let skipped = min(self.size, bytes);
        if skipped > 0 {
            self.head = (self.head + skipped) % self.buf.len();
            self.size -= skipped;
        }
        skipped
    }

    fn current_write_slice(&mut self) -> &mut [u8] {
        if self.free_space() == 0 {
            return &mut [];
        }
        let start = self.tail();
        let end = min(self.buf.len(), start + self.free_space());
        &mut self.buf[start..end]
    }

    fn mark_bytes_as_written(&mut self, bytes: usize) {
        self.size += min(self.free_space(), bytes);
    }

    fn fill_once(&mut self, upstream: &mut impl Read) -> std::io::Result<usize> {
        let slice = self.current_write_slice();
        if slice.is_empty() {
            return Ok(0);
        }

        match upstream.read(slice) {
            Ok(read) => {
                self.mark_bytes_as_written(read);
                Ok(read)
            }
            Err(err) if err.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(err) => Err(err),
        }
    }

    /// Pulls bytes from `upstream` into the free space, wrapping around the end of storage.
    ///
    /// A stream read that times out counts as zero bytes read.
    pub fn read_from(&mut self, upstream: &mut impl Read) -> std::io::Result<usize> {
        let first = self.fill_once(upstream)?;
        if first == 0 {
            return Ok(0);
        }
        let second = self.fill_once(upstream)?;
        Ok(first + second)
    }
}

impl Write for RingByteBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut written = 0;
        // Two passes cover the wrap-around at the end of storage.
        for _ in 0..2 {
            let slice = self.current_write_slice();
            let n = min(slice.len(), buf.len() - written);
            slice[..n].copy_from_slice(&buf[written..written + n]);
            self.mark_bytes_as_written(n);
            written += n;
        }
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn write_then_skip_tracks_length() {
        let mut buffer = RingByteBuffer::with_capacity(8);
        assert_eq!(buffer.write(&[0x46, 0x01, 0x47]).unwrap(), 3);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.current_read_slice(), &[0x46, 0x01, 0x47]);

        assert_eq!(buffer.skip_bytes(2), 2);
        assert_eq!(buffer.current_read_slice(), &[0x47]);
        assert_eq!(buffer.free_space(), 7);
    }

    #[test]
    fn write_wraps_around_end_of_storage() {
        let mut buffer = RingByteBuffer::with_capacity(4);
        buffer.write(&[1, 2, 3]).unwrap();
        buffer.skip_bytes(3);

        assert_eq!(buffer.write(&[4, 5, 6]).unwrap(), 3);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.current_read_slice(), &[4]);
        buffer.skip_bytes(1);
        assert_eq!(buffer.current_read_slice(), &[5, 6]);
    }

    #[test]
    fn write_stops_when_full() {
        let mut buffer = RingByteBuffer::with_capacity(2);
        assert_eq!(buffer.write(&[1, 2, 3]).unwrap(), 2);
        assert_eq!(buffer.free_space(), 0);
    }

    #[test]
    fn read_from_fills_from_stream() {
        let mut buffer = RingByteBuffer::with_capacity(16);
        let mut stream = Cursor::new(vec![0x56, 0x01, 0x02, 0x03, 0x5C]);
        assert_eq!(buffer.read_from(&mut stream).unwrap(), 5);
        assert_eq!(buffer.current_read_slice(), &[0x56, 0x01, 0x02, 0x03, 0x5C]);
    }

    #[test]
    fn clear_discards_unread_bytes() {
        let mut buffer = RingByteBuffer::with_capacity(4);
        buffer.write(&[1, 2]).unwrap();
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 4);
    }
}
