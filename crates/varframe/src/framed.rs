//! `tokio_util::codec` integration.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_packet, encode_packet_into, LengthHeader};
use crate::config::MaxPacketLength;
use crate::error::{FrameError, Result};

/// Varint length-prefixed packet codec for `FramedRead` / `FramedWrite`.
///
/// Decoding applies the same maximum packet length guard as
/// [`PacketReader`](crate::PacketReader): once the read buffer holds more
/// unresolved bytes than the limit, decoding fails with `TooLong`.
#[derive(Debug, Clone, Default)]
pub struct PacketCodec {
    limit: MaxPacketLength,
}

impl PacketCodec {
    /// Create a codec with no maximum packet length.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with a maximum packet length; zero is unlimited.
    pub fn with_max_packet_length(max_packet_length: usize) -> Self {
        Self {
            limit: MaxPacketLength::new(max_packet_length),
        }
    }

    /// Update the maximum packet length; zero is unlimited.
    ///
    /// Clones of this codec share the limit.
    pub fn set_max_packet_length(&self, max_packet_length: usize) {
        self.limit.set(max_packet_length);
    }

    /// Current maximum packet length; zero is unlimited.
    pub fn max_packet_length(&self) -> usize {
        self.limit.get()
    }

    pub(crate) fn limit_handle(&self) -> MaxPacketLength {
        self.limit.clone()
    }
}

impl Decoder for PacketCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        self.limit.check(src.len())?;
        decode_packet(src)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        match self.decode(src)? {
            Some(packet) => Ok(Some(packet)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::Eof { pending: src.len() }),
        }
    }
}

impl Encoder<Bytes> for PacketCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        encode_packet_into(&item, dst);
        Ok(())
    }
}

impl<'a> Encoder<&'a [u8]> for PacketCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &'a [u8], dst: &mut BytesMut) -> Result<()> {
        encode_packet_into(item, dst);
        Ok(())
    }
}

/// Write `payload` as one frame to an async sink: the header, then the payload.
///
/// Same truncation semantics as [`write_packet`](crate::write_packet).
pub async fn write_packet_async<W>(sink: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let header = LengthHeader::new(payload.len());
    sink.write_all(header.as_bytes()).await?;
    sink.write_all(payload).await?;
    Ok(())
}
