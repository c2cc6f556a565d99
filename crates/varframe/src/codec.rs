use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::varint::{decode_uvarint, encode_uvarint, uvarint_len, Uvarint};

/// Upper bound on the size of a frame length header on the wire.
///
/// Decoding is stricter: a header not terminated by its
/// [`MAX_VARINT_LEN`](crate::varint::MAX_VARINT_LEN)th byte is already
/// `Overflow`, so no valid header ever comes near this bound.
pub const MAX_HEADER_LEN: usize = 16;

/// Encoded length header for one frame.
#[derive(Debug, Clone, Copy)]
pub struct LengthHeader {
    bytes: [u8; MAX_HEADER_LEN],
    len: usize,
}

impl LengthHeader {
    /// Encode the header for a payload of `payload_len` bytes.
    pub fn new(payload_len: usize) -> Self {
        let mut bytes = [0u8; MAX_HEADER_LEN];
        let len = encode_uvarint(payload_len as u64, &mut bytes);
        Self { bytes, len }
    }

    /// The header as it appears on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// Position of one complete frame at the front of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpan {
    /// Bytes taken by the varint length header.
    pub header_len: usize,
    /// Bytes of payload following the header.
    pub payload_len: usize,
}

impl FrameSpan {
    /// Header plus payload.
    pub fn total(&self) -> usize {
        self.header_len + self.payload_len
    }
}

/// Total wire size of a frame carrying `payload_len` bytes.
pub fn frame_len(payload_len: usize) -> usize {
    uvarint_len(payload_len as u64) + payload_len
}

/// Encode a payload into a complete frame.
///
/// Wire format:
/// ```text
/// ┌──────────────────────┬──────────────────┐
/// │ Length (uvarint)     │ Payload           │
/// │ 1..=10 bytes         │ (Length bytes)    │
/// └──────────────────────┴──────────────────┘
/// ```
///
/// An empty payload encodes as the single byte `0x00`.
pub fn encode_packet(payload: &[u8]) -> Bytes {
    let mut dst = BytesMut::with_capacity(frame_len(payload.len()));
    encode_packet_into(payload, &mut dst);
    dst.freeze()
}

/// Append the frame for `payload` to `dst`.
pub fn encode_packet_into(payload: &[u8], dst: &mut BytesMut) {
    let header = LengthHeader::new(payload.len());
    dst.reserve(header.as_bytes().len() + payload.len());
    dst.put_slice(header.as_bytes());
    dst.put_slice(payload);
}

/// Locate the first frame in `buf` without consuming anything.
///
/// `FrameError::TooShort` means more bytes may complete the frame;
/// `FrameError::Overflow` means they never will.
pub fn parse_frame(buf: &[u8]) -> Result<FrameSpan> {
    let Some(&first) = buf.first() else {
        return Err(FrameError::TooShort);
    };
    if first == 0 {
        return Ok(FrameSpan {
            header_len: 1,
            payload_len: 0,
        });
    }

    let (declared, header_len) = match decode_uvarint(buf) {
        Uvarint::Complete { value, len } => (value, len),
        Uvarint::Incomplete => return Err(FrameError::TooShort),
        Uvarint::Overflow => return Err(FrameError::Overflow),
    };

    // Lengths are classified in the signed range: zero (a non-canonical
    // empty header) and anything past isize::MAX are both overflow.
    let length = match isize::try_from(declared) {
        Ok(length) if length > 0 => length,
        _ => return Err(FrameError::Overflow),
    };
    let total = length
        .checked_add(header_len as isize)
        .ok_or(FrameError::Overflow)?;
    if total as usize > buf.len() {
        return Err(FrameError::TooShort);
    }

    Ok(FrameSpan {
        header_len,
        payload_len: length as usize,
    })
}

/// Split the first frame off `buf`, returning `(payload, remainder)`.
pub fn split_frame(buf: &[u8]) -> Result<(&[u8], &[u8])> {
    let span = parse_frame(buf)?;
    let (frame, remainder) = buf.split_at(span.total());
    Ok((&frame[span.header_len..], remainder))
}

/// Decode one frame from the front of a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer and leaves any
/// trailing bytes in place.
pub fn decode_packet(src: &mut BytesMut) -> Result<Option<Bytes>> {
    let span = match parse_frame(&src[..]) {
        Ok(span) => span,
        Err(FrameError::TooShort) => return Ok(None), // Need more data
        Err(err) => return Err(err),
    };

    src.advance(span.header_len);
    Ok(Some(src.split_to(span.payload_len).freeze()))
}
