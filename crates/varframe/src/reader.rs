use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use crate::codec::decode_packet;
use crate::config::{MaxPacketLength, ReaderConfig};
use crate::error::{FrameError, Result};

/// Reads complete packets from any `Read` source.
///
/// Handles partial reads internally, so callers always get whole packets.
/// After `Overflow`, `TooLong` or `Eof` the reader should be discarded: the
/// offending bytes stay buffered and the same error comes back.
pub struct PacketReader<T> {
    inner: T,
    buf: BytesMut,
    scratch: Box<[u8]>,
    limit: MaxPacketLength,
    failed: bool,
}

impl<T: Read> PacketReader<T> {
    /// Create a new packet reader with a 1024-byte read buffer.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, ReaderConfig::default())
    }

    /// Create a new packet reader requesting `size` bytes per read.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn with_capacity(inner: T, size: usize) -> Self {
        Self::with_config(
            inner,
            ReaderConfig {
                buffer_size: size,
                ..ReaderConfig::default()
            },
        )
    }

    /// Create a new packet reader with explicit configuration.
    ///
    /// # Panics
    ///
    /// Panics if `config.buffer_size` is zero.
    pub fn with_config(inner: T, config: ReaderConfig) -> Self {
        assert!(config.buffer_size > 0, "size must be greater than 0");
        Self {
            inner,
            buf: BytesMut::new(),
            scratch: vec![0u8; config.buffer_size].into_boxed_slice(),
            limit: MaxPacketLength::new(config.max_packet_length),
            failed: false,
        }
    }

    /// Read the next complete packet (blocking).
    ///
    /// Returns `Err(FrameError::Eof { .. })` when the source is exhausted.
    pub fn read_packet(&mut self) -> Result<Bytes> {
        loop {
            if let Err(err) = self.limit.check(self.buf.len()) {
                debug!(buffered = self.buf.len(), max = self.limit.get(), "packet too long");
                return Err(err);
            }

            match decode_packet(&mut self.buf) {
                Ok(Some(packet)) => {
                    trace!(len = packet.len(), "decoded packet");
                    return Ok(packet);
                }
                Ok(None) => {}
                Err(err) => {
                    debug!(error = %err, buffered = self.buf.len(), "malformed frame header");
                    return Err(err);
                }
            }

            let read = match self.inner.read(&mut self.scratch[..]) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                let pending = self.buf.len();
                debug!(pending, "end of input");
                return Err(FrameError::Eof { pending });
            }

            trace!(read, "read chunk");
            self.buf.extend_from_slice(&self.scratch[..read]);
        }
    }

    /// Bytes read from the source but not yet resolved into a packet.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// Bytes requested from the source per read.
    pub fn buffer_size(&self) -> usize {
        self.scratch.len()
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner source.
    ///
    /// Buffered bytes are discarded.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update the maximum packet length for subsequent reads; zero is unlimited.
    pub fn set_max_packet_length(&mut self, max_packet_length: usize) {
        self.limit.set(max_packet_length);
    }

    /// Current maximum packet length; zero is unlimited.
    pub fn max_packet_length(&self) -> usize {
        self.limit.get()
    }

    /// Current packet reader configuration.
    pub fn config(&self) -> ReaderConfig {
        ReaderConfig {
            buffer_size: self.buffer_size(),
            max_packet_length: self.max_packet_length(),
        }
    }

    pub(crate) fn limit_handle(&self) -> MaxPacketLength {
        self.limit.clone()
    }
}

/// Yields packets until the first error, which is yielded once.
impl<T: Read> Iterator for PacketReader<T> {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let result = self.read_packet();
        self.failed = result.is_err();
        Some(result)
    }
}
