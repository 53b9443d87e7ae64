use std::io;

use log::trace;

const KIB: usize = 1 << 10;
const MIB: u64 = 1 << 20;

/// The read buffer capacity used when the size of the data is unknown.
pub(crate) const DEFAULT_CAPACITY: usize = 64 * KIB;

/// Choose a read buffer capacity for a source of `len` bytes.
///
/// Up to 1 MiB gets 8 KiB, up to 64 MiB gets 64 KiB and anything larger
/// gets 1 MiB. An unknown length gets `DEFAULT_CAPACITY`.
pub(crate) fn capacity_for_len(len: Option<u64>) -> usize {
    match len {
        None => DEFAULT_CAPACITY,
        Some(len) if len <= MIB => 8 * KIB,
        Some(len) if len <= 64 * MIB => 64 * KIB,
        Some(_) => 1024 * KIB,
    }
}

/// A fixed capacity read buffer over a byte source.
///
/// This is `io::BufReader` with the one extra question the row assembler
/// needs to ask, `has_unread`. The buffer is allocated once and never
/// shrinks. `pos <= filled <= buf.len()` always holds, and `pos == filled`
/// means the next `fill_buf` reads from the source.
#[derive(Debug)]
pub(crate) struct ByteBuffer<R> {
    rdr: R,
    buf: Vec<u8>,
    pos: usize,
    filled: usize,
}

impl<R: io::Read> ByteBuffer<R> {
    pub fn with_capacity(rdr: R, capacity: usize) -> ByteBuffer<R> {
        ByteBuffer { rdr, buf: vec![0; capacity], pos: 0, filled: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Returns true when bytes read from the source have not been consumed.
    pub fn has_unread(&self) -> bool {
        self.pos < self.filled
    }

    /// Returns the unconsumed bytes, reading from the source first if there
    /// are none.
    ///
    /// An empty slice means the source is exhausted.
    pub fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if !self.has_unread() {
            self.filled = loop {
                match self.rdr.read(&mut self.buf) {
                    Ok(n) => break n,
                    Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {
                        continue
                    }
                    Err(err) => return Err(err),
                }
            };
            self.pos = 0;
            trace!("refilled read buffer with {} bytes", self.filled);
        }
        Ok(&self.buf[self.pos..self.filled])
    }

    /// Mark `amt` bytes of the slice returned by `fill_buf` as consumed.
    pub fn consume(&mut self, amt: usize) {
        debug_assert!(self.pos + amt <= self.filled);
        self.pos = std::cmp::min(self.pos + amt, self.filled);
    }
}

impl<R> ByteBuffer<R> {
    pub fn get_ref(&self) -> &R {
        &self.rdr
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.rdr
    }

    /// Unwraps the source. Bytes that were read but not consumed are lost.
    pub fn into_inner(self) -> R {
        self.rdr
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::{capacity_for_len, ByteBuffer, DEFAULT_CAPACITY};

    /// A source that interrupts every other read.
    struct Flaky<'a> {
        data: &'a [u8],
        interrupt: bool,
    }

    impl<'a> io::Read for Flaky<'a> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "again"));
            }
            self.data.read(buf)
        }
    }

    #[test]
    fn capacity_policy() {
        assert_eq!(DEFAULT_CAPACITY, capacity_for_len(None));
        assert_eq!(8 * 1024, capacity_for_len(Some(0)));
        assert_eq!(8 * 1024, capacity_for_len(Some(1 << 20)));
        assert_eq!(64 * 1024, capacity_for_len(Some((1 << 20) + 1)));
        assert_eq!(64 * 1024, capacity_for_len(Some(64 << 20)));
        assert_eq!(1 << 20, capacity_for_len(Some((64 << 20) + 1)));
    }

    #[test]
    fn refill_and_consume() {
        let mut buf = ByteBuffer::with_capacity(&b"abcdefg"[..], 3);
        assert!(!buf.has_unread());
        assert_eq!(b"abc", buf.fill_buf().unwrap());
        assert!(buf.has_unread());
        buf.consume(2);
        // Unconsumed bytes are handed out again without reading.
        assert_eq!(b"c", buf.fill_buf().unwrap());
        buf.consume(1);
        assert!(!buf.has_unread());
        assert_eq!(b"def", buf.fill_buf().unwrap());
        buf.consume(3);
        assert_eq!(b"g", buf.fill_buf().unwrap());
        buf.consume(1);
        assert_eq!(b"", buf.fill_buf().unwrap());
        assert_eq!(b"", buf.fill_buf().unwrap());
    }

    #[test]
    fn retries_interrupted_reads() {
        let src = Flaky { data: b"ab", interrupt: false };
        let mut buf = ByteBuffer::with_capacity(src, 8);
        assert_eq!(b"ab", buf.fill_buf().unwrap());
        buf.consume(2);
        assert_eq!(b"", buf.fill_buf().unwrap());
    }

    #[test]
    fn zero_capacity_reads_nothing() {
        let mut buf = ByteBuffer::with_capacity(&b"abc"[..], 0);
        assert_eq!(0, buf.capacity());
        assert_eq!(b"", buf.fill_buf().unwrap());
    }
}
