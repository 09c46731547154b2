//! Newline framing for the event stream
//!
//! Socket reads arrive in arbitrary chunks: a chunk may hold half a record,
//! several records, or nothing at all. The [`Framer`] accumulates bytes and
//! hands out every complete `\n`-terminated frame, keeping the trailing
//! partial record for the next read.

use bytes::{Buf, Bytes, BytesMut};

use crate::DELIMITER;

/// Accumulates raw bytes and splits them into frames
///
/// Frames exclude the delimiter. Consecutive delimiters produce empty
/// frames; skipping blank input is the decoder's job. No size limit is
/// enforced here, callers check [`Framer::pending`] against their own bound.
#[derive(Debug, Default)]
pub struct Framer {
    buf: BytesMut,
    /// Prefix of `buf` already searched for a delimiter
    scanned: usize,
}

impl Framer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            scanned: 0,
        }
    }

    /// Append a chunk and iterate over the frames it completes
    ///
    /// The iterator is lazy: frames are split off as it is advanced. Frames
    /// left unconsumed when it is dropped stay buffered and are returned by
    /// the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Frames<'_> {
        self.buf.extend_from_slice(chunk);
        Frames { framer: self }
    }

    /// Split off the next complete frame, if one is buffered
    pub fn next_frame(&mut self) -> Option<Bytes> {
        match self.buf[self.scanned..]
            .iter()
            .position(|&byte| byte == DELIMITER)
        {
            Some(offset) => {
                let frame = self.buf.split_to(self.scanned + offset).freeze();
                self.buf.advance(1);
                self.scanned = 0;
                Some(frame)
            }
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    /// Number of buffered bytes not yet returned as a frame
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drop any buffered partial data
    pub fn clear(&mut self) {
        self.buf.clear();
        self.scanned = 0;
    }
}

/// Frames completed by a [`Framer::feed`] call
#[derive(Debug)]
pub struct Frames<'a> {
    framer: &'a mut Framer,
}

impl Iterator for Frames<'_> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Self::Item> {
        self.framer.next_frame()
    }
}
