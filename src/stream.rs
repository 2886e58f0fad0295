use crate::buffer::SecureBuffer;
use crate::bytes::SecretBytes;
use crate::error::{Result, SecretError};
use log::debug;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Smallest capacity a writable stream starts with.
pub const MIN_STREAM_CAPACITY: usize = 256;

/// Largest length, capacity or position a stream can address.
pub const MAX_STREAM_LENGTH: usize = i32::MAX as usize;

/// Copies up to this many bytes one element at a time.
const SHORT_COPY_LEN: usize = 8;

fn copy_bytes(dst: &mut [u8], src: &[u8]) {
    if src.len() <= SHORT_COPY_LEN {
        for (d, s) in dst.iter_mut().zip(src) {
            *d = *s;
        }
    } else {
        dst.copy_from_slice(src);
    }
}

/// A growable, seekable byte store whose backing memory is a
/// [`SecureBuffer`].
///
/// Growth allocates a fresh secure buffer, copies the live bytes across and
/// wipes the old one, so no stale copy of the data survives a resize. The
/// stream implements [`Read`], [`Write`] and [`Seek`] and can be handed to any
/// code written against those traits.
///
/// # Examples
///
/// ```rust
/// use securesecrets::SecretMemoryStream;
/// use std::io::{Read, Seek, SeekFrom, Write};
///
/// let mut stream = SecretMemoryStream::new().unwrap();
/// stream.write_all(b"sensitive").unwrap();
/// stream.seek(SeekFrom::Start(0)).unwrap();
///
/// let mut out = [0u8; 9];
/// stream.read_exact(&mut out).unwrap();
/// assert_eq!(&out, b"sensitive");
/// ```
pub struct SecretMemoryStream {
    buffer: SecureBuffer<u8>,
    len: usize,
    position: usize,
    writable: bool,
}

impl SecretMemoryStream {
    /// Creates an empty writable stream with the minimum capacity.
    pub fn new() -> Result<Self> {
        Self::with_capacity(MIN_STREAM_CAPACITY)
    }

    /// Creates an empty writable stream with at least `capacity` bytes reserved.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity > MAX_STREAM_LENGTH {
            return Err(SecretError::Range(format!(
                "capacity {} exceeds the maximum stream length",
                capacity
            )));
        }
        Ok(Self {
            buffer: SecureBuffer::new(capacity.max(MIN_STREAM_CAPACITY))?,
            len: 0,
            position: 0,
            writable: true,
        })
    }

    /// Wraps an existing secret for reading, taking over its buffer without
    /// copying. The stream cannot be written to.
    pub fn from_secret(secret: SecretBytes) -> Self {
        let buffer = secret.into_buffer();
        Self {
            len: buffer.len(),
            buffer,
            position: 0,
            writable: false,
        }
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn is_disposed(&self) -> bool {
        self.buffer.is_released()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.buffer.is_released() {
            return Err(SecretError::Released("secret memory stream"));
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<()> {
        self.ensure_live()?;
        if !self.writable {
            return Err(SecretError::ReadOnly);
        }
        Ok(())
    }

    /// Number of bytes stored.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the cursor. Positions past the end are allowed; a later write
    /// there grows the stream.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        self.ensure_live()?;
        if position > MAX_STREAM_LENGTH {
            return Err(SecretError::Range(format!(
                "position {} exceeds the maximum stream length",
                position
            )));
        }
        self.position = position;
        Ok(())
    }

    /// Bytes available without reallocating.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Reallocates the backing buffer to exactly `capacity` bytes.
    ///
    /// Fails with a range error below the current length or above
    /// [`MAX_STREAM_LENGTH`].
    pub fn set_capacity(&mut self, capacity: usize) -> Result<()> {
        self.ensure_writable()?;
        if capacity < self.len {
            return Err(SecretError::Range(format!(
                "capacity {} is smaller than the stream length {}",
                capacity, self.len
            )));
        }
        if capacity > MAX_STREAM_LENGTH {
            return Err(SecretError::Range(format!(
                "capacity {} exceeds the maximum stream length",
                capacity
            )));
        }
        if capacity == self.capacity() {
            return Ok(());
        }

        let mut replacement = SecureBuffer::new(capacity)?;
        copy_bytes(
            &mut replacement.as_mut_slice()?[..self.len],
            &self.buffer.as_slice()?[..self.len],
        );
        let mut old = std::mem::replace(&mut self.buffer, replacement);
        old.dispose();

        debug!("secret stream capacity {} -> {}", old.capacity(), capacity);
        Ok(())
    }

    /// Grows the capacity so `required` bytes fit, doubling where possible.
    fn ensure_capacity(&mut self, required: usize) -> Result<()> {
        let current = self.capacity();
        if required <= current {
            return Ok(());
        }
        self.set_capacity(grow_target(current, required))
    }

    /// Truncates or extends the stream. Extended bytes read as zero.
    pub fn set_len(&mut self, len: usize) -> Result<()> {
        self.ensure_writable()?;
        if len > MAX_STREAM_LENGTH {
            return Err(SecretError::Range(format!(
                "length {} exceeds the maximum stream length",
                len
            )));
        }
        self.ensure_capacity(len)?;
        if len > self.len {
            self.buffer.as_mut_slice()?[self.len..len].fill(0);
        }
        self.len = len;
        if self.position > len {
            self.position = len;
        }
        Ok(())
    }

    /// Copies from the current position into `buf`, returning the byte count.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_live()?;
        if self.position >= self.len {
            return Ok(0);
        }
        let count = (self.len - self.position).min(buf.len());
        let start = self.position;
        copy_bytes(&mut buf[..count], &self.buffer.as_slice()?[start..start + count]);
        self.position += count;
        Ok(count)
    }

    /// Writes all of `data` at the current position, growing as needed.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        if data.is_empty() {
            return Ok(());
        }
        let end = self
            .position
            .checked_add(data.len())
            .filter(|&end| end <= MAX_STREAM_LENGTH)
            .ok_or_else(|| {
                SecretError::Range("write would exceed the maximum stream length".to_string())
            })?;

        if end > self.len {
            self.ensure_capacity(end)?;
            if self.position > self.len {
                let gap_start = self.len;
                self.buffer.as_mut_slice()?[gap_start..self.position].fill(0);
            }
            self.len = end;
        }

        let start = self.position;
        copy_bytes(&mut self.buffer.as_mut_slice()?[start..end], data);
        self.position = end;
        Ok(())
    }

    /// Resolves a seek target, rejecting positions before the start or past
    /// [`MAX_STREAM_LENGTH`].
    pub fn seek_to(&mut self, target: SeekFrom) -> Result<usize> {
        self.ensure_live()?;
        let (base, offset) = match target {
            SeekFrom::Start(offset) => {
                let position = usize::try_from(offset)
                    .ok()
                    .filter(|&p| p <= MAX_STREAM_LENGTH)
                    .ok_or_else(|| {
                        SecretError::Range(format!("seek to {} exceeds the maximum stream length", offset))
                    })?;
                self.position = position;
                return Ok(position);
            }
            SeekFrom::Current(offset) => (self.position, offset),
            SeekFrom::End(offset) => (self.len, offset),
        };

        let position = i128::try_from(base).unwrap_or(i128::MAX) + i128::from(offset);
        if position < 0 {
            return Err(SecretError::Range("seek before the start of the stream".to_string()));
        }
        let position = usize::try_from(position)
            .ok()
            .filter(|&p| p <= MAX_STREAM_LENGTH)
            .ok_or_else(|| SecretError::Range("seek beyond the maximum stream length".to_string()))?;
        self.position = position;
        Ok(position)
    }

    /// Borrows the stored bytes.
    pub fn as_slice(&self) -> Result<&[u8]> {
        Ok(&self.buffer.as_slice()?[..self.len])
    }

    pub(crate) fn as_mut_slice(&mut self) -> Result<&mut [u8]> {
        let len = self.len;
        Ok(&mut self.buffer.as_mut_slice()?[..len])
    }

    /// Hands the stored bytes over as a [`SecretBytes`] without copying.
    /// Spare capacity stays hidden behind the secret's logical length.
    pub fn into_secret(mut self) -> Result<SecretBytes> {
        self.ensure_live()?;
        self.buffer.set_logical_len(self.len)?;
        Ok(SecretBytes::from_buffer(self.buffer))
    }

    #[cfg(test)]
    pub(crate) fn probe(&mut self) -> crate::buffer::ReleaseProbe {
        self.buffer.probe()
    }

    /// Wipes the backing buffer. Idempotent.
    pub fn dispose(&mut self) {
        self.buffer.dispose();
        self.len = 0;
        self.position = 0;
    }
}

/// Capacity to grow to from `current` so that `required` bytes fit.
///
/// Doubling stops at [`MAX_STREAM_LENGTH`]; a `required` above it is passed
/// through for `set_capacity` to reject.
fn grow_target(current: usize, required: usize) -> usize {
    let doubled = current.saturating_mul(2).min(MAX_STREAM_LENGTH);
    required.max(doubled).max(MIN_STREAM_CAPACITY)
}

impl Read for SecretMemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_bytes(buf)?)
    }
}

impl Write for SecretMemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for SecretMemoryStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.seek_to(pos)? as u64)
    }
}

impl fmt::Debug for SecretMemoryStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretMemoryStream")
            .field("len", &self.len)
            .field("position", &self.position)
            .field("capacity", &self.capacity())
            .field("writable", &self.writable)
            .finish_non_exhaustive()
    }
}
