//! Varint length-prefixed packet framing over byte streams.
//!
//! Every packet is framed as:
//! - An unsigned varint holding the payload length (7 bits per byte,
//!   high bit set on all but the last byte, at most 10 bytes)
//! - The payload bytes
//!
//! An empty payload is the single byte `0x00`. There is no magic number,
//! checksum or version byte.
//!
//! [`PacketReader`] turns any `Read` into whole packets, and [`PacketStream`]
//! runs one on a background thread, handing packets to the consumer one at a
//! time. With the `async` feature, `PacketCodec` and `AsyncPacketStream`
//! do the same on tokio.

pub mod codec;
pub mod config;
pub mod error;
pub mod reader;
pub mod stream;
pub mod varint;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_stream;
#[cfg(feature = "async")]
pub mod framed;

pub use codec::{
    decode_packet, encode_packet, encode_packet_into, frame_len, parse_frame, split_frame,
    FrameSpan, LengthHeader, MAX_HEADER_LEN,
};
pub use config::{MaxPacketLength, ReaderConfig, DEFAULT_BUFFER_SIZE};
pub use error::{FrameError, Result};
pub use reader::PacketReader;
pub use stream::PacketStream;
pub use writer::{write_packet, PacketWriter};

#[cfg(feature = "async")]
pub use async_stream::AsyncPacketStream;
#[cfg(feature = "async")]
pub use framed::{write_packet_async, PacketCodec};
