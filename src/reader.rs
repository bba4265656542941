//! Bounded byte sources for the decoder.
//!
//! Both readers report [`CodecError::Eof`] when a field gets no bytes at all and
//! [`CodecError::UnexpectedEof`] when it gets some but not all of them.
//!
//! A length prefix read from the wire is never trusted for allocation:
//! [`SliceReader`] checks the remaining input before copying, and
//! [`StreamReader`] reads in chunks of [`READ_CHUNK_SIZE`] so a short input that
//! claims 2^32-1 bytes fails after at most one chunk.

use crate::codec::CodecError;
use std::io::{ErrorKind, Read};

/// Largest single read (and allocation step) when pulling from a stream.
pub const READ_CHUNK_SIZE: usize = 4096;

/// A source the decoder can pull exact byte counts from.
pub trait BoundedRead {
    fn read_byte(&mut self) -> Result<u8, CodecError>;

    /// Read exactly `n` bytes into a new buffer.
    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, CodecError>;

    /// Read exactly `N` bytes (fixed-width fields).
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError>;
}

impl<T: BoundedRead> BoundedRead for &mut T {
    fn read_byte(&mut self) -> Result<u8, CodecError> {
        (**self).read_byte()
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, CodecError> {
        (**self).read_exact(n)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        (**self).read_array::<N>()
    }
}

/// Reader over an in-memory buffer.
#[derive(Debug, Clone)]
pub struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        SliceReader { data, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Unconsumed tail of the buffer.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Borrow the next `n` bytes without copying.
    pub fn read_view(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n == 0 {
            return Ok(&[]);
        }
        let available = self.data.len() - self.pos;
        if available == 0 {
            return Err(CodecError::Eof);
        }
        if available < n {
            return Err(CodecError::UnexpectedEof);
        }
        let view = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(view)
    }
}

impl BoundedRead for SliceReader<'_> {
    fn read_byte(&mut self) -> Result<u8, CodecError> {
        let b = *self.data.get(self.pos).ok_or(CodecError::Eof)?;
        self.pos += 1;
        Ok(b)
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, CodecError> {
        self.read_view(n).map(<[u8]>::to_vec)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_view(N)?);
        Ok(out)
    }
}

/// Reader over any [`Read`]. Does not buffer beyond the current call; wrap the
/// source in a `BufReader` when it is expensive to read from in small pieces.
#[derive(Debug)]
pub struct StreamReader<R> {
    inner: R,
}

impl<R: Read> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        StreamReader { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Fill `buf` as far as the source allows; returns the number of bytes read.
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize, CodecError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(CodecError::Io(e)),
            }
        }
        Ok(filled)
    }
}

fn short_read(got: usize) -> CodecError {
    if got == 0 {
        CodecError::Eof
    } else {
        CodecError::UnexpectedEof
    }
}

impl<R: Read> BoundedRead for StreamReader<R> {
    fn read_byte(&mut self) -> Result<u8, CodecError> {
        let [b] = self.read_array::<1>()?;
        Ok(b)
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(n.min(READ_CHUNK_SIZE));
        while out.len() < n {
            let start = out.len();
            let chunk = (n - start).min(READ_CHUNK_SIZE);
            out.resize(start + chunk, 0);
            let got = self.fill(&mut out[start..])?;
            if got < chunk {
                return Err(short_read(start + got));
            }
        }
        Ok(out)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        let got = self.fill(&mut out)?;
        if got < N {
            return Err(short_read(got));
        }
        Ok(out)
    }
}
