use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_packet_into, LengthHeader};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Write `payload` as one frame: the length header, then the payload.
///
/// The two parts go out as separate writes. If the header fails the payload
/// is not attempted. If the payload fails the frame is left truncated on the
/// sink, which must then be considered unusable for framing.
pub fn write_packet<W: Write + ?Sized>(sink: &mut W, payload: &[u8]) -> Result<()> {
    let header = LengthHeader::new(payload.len());
    sink.write_all(header.as_bytes())?;
    sink.write_all(payload)?;
    Ok(())
}

/// Writes complete packets to any `Write` sink.
///
/// Each packet is encoded into an internal buffer and written in one pass,
/// then the sink is flushed.
pub struct PacketWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> PacketWriter<T> {
    /// Create a new packet writer.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Encode and send a payload as one frame (blocking).
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_packet_into(payload, &mut self.buf);

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::Io(ErrorKind::WriteZero.into())),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner sink.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::codec::{encode_packet, split_frame};
    use crate::reader::PacketReader;

    #[test]
    fn write_packet_matches_encode() {
        for payload in [&b""[..], &[1, 2, 3, 4][..], &[b'0'; 258][..]] {
            let mut sink = Vec::new();
            write_packet(&mut sink, payload).unwrap();
            assert_eq!(sink, encode_packet(payload).to_vec());
        }
    }

    #[test]
    fn write_packet_issues_header_then_payload() {
        let mut sink = RecordingWriter::default();
        write_packet(&mut sink, b"text").unwrap();
        assert_eq!(sink.writes, vec![vec![4], b"text".to_vec()]);
    }

    #[test]
    fn write_packet_header_error_skips_payload() {
        let mut sink = FailingWriter { fail_after: 0, writes: 0 };
        let err = write_packet(&mut sink, b"text").unwrap_err();
        assert!(matches!(&err, FrameError::Io(e) if e.to_string() == "test error"));
        assert_eq!(sink.writes, 0);
    }

    #[test]
    fn write_packet_payload_error_leaves_header() {
        let mut sink = FailingWriter { fail_after: 1, writes: 0 };
        let err = write_packet(&mut sink, b"text").unwrap_err();
        assert!(matches!(err, FrameError::Io(_)));
        assert_eq!(sink.writes, 1);
    }

    #[test]
    fn write_single_packet() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut writer = PacketWriter::new(cursor);

        writer.send(b"hello").unwrap();

        let wire = writer.into_inner().into_inner();
        let (packet, rest) = split_frame(&wire).unwrap();
        assert_eq!(packet, b"hello");
        assert!(rest.is_empty());
    }

    #[test]
    fn write_multiple_packets() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut writer = PacketWriter::new(cursor);

        writer.send(b"one").unwrap();
        writer.send(b"").unwrap();
        writer.send(b"three").unwrap();

        let wire = writer.into_inner().into_inner();
        let mut reader = PacketReader::new(Cursor::new(wire));

        assert_eq!(reader.read_packet().unwrap().as_ref(), b"one");
        assert!(reader.read_packet().unwrap().is_empty());
        assert_eq!(reader.read_packet().unwrap().as_ref(), b"three");
        assert!(reader.read_packet().unwrap_err().is_eof());
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = PacketWriter::new(sink);

        writer.send(b"x").unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut writer = PacketWriter::new(cursor);

        let _ = writer.get_ref();
        let _ = writer.get_mut();
        let _inner = writer.into_inner();
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let writer_impl = InterruptedWriteThenFlush {
            wrote_once: false,
            flush_interrupted: false,
            data: Vec::new(),
        };

        let mut writer = PacketWriter::new(writer_impl);
        writer.send(b"retry").unwrap();

        let inner = writer.into_inner();
        assert_eq!(inner.data, encode_packet(b"retry").to_vec());
    }

    #[test]
    fn write_zero_is_an_error() {
        let mut writer = PacketWriter::new(ZeroWriter);
        let err = writer.send(b"x").unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WriteZero));
    }

    #[derive(Default)]
    struct RecordingWriter {
        writes: Vec<Vec<u8>>,
    }

    impl Write for RecordingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct FailingWriter {
        fail_after: usize,
        writes: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.writes >= self.fail_after {
                return Err(std::io::Error::other("test error"));
            }
            self.writes += 1;
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
