//! Background packet streaming.
//!
//! A [`PacketStream`] owns a [`PacketReader`] running on its own thread. Each
//! packet is handed to the consumer over a rendezvous channel, so the thread
//! only reads further once the previous packet has been received. The first
//! read error ends the stream: it is recorded, then the channel is closed.

use std::io::Read;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use bytes::Bytes;
use tracing::debug;

use crate::config::{MaxPacketLength, ReaderConfig};
use crate::error::FrameError;
use crate::reader::PacketReader;

/// Terminal state shared between a stream's producer and its consumer.
#[derive(Debug, Default)]
pub(crate) struct Terminal {
    state: Mutex<TerminalState>,
}

#[derive(Debug, Default)]
struct TerminalState {
    err: Option<Arc<FrameError>>,
    closed: bool,
}

impl Terminal {
    fn lock(&self) -> MutexGuard<'_, TerminalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the terminal error and close the output by dropping `sender`.
    ///
    /// The first error wins; later calls only drop their sender.
    pub(crate) fn close<S>(&self, err: FrameError, sender: S) {
        let mut state = self.lock();
        if !state.closed {
            state.err = Some(Arc::new(err));
            state.closed = true;
        }
        drop(sender);
    }

    pub(crate) fn err(&self) -> Option<Arc<FrameError>> {
        self.lock().err.clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

/// Streams packets from a byte source on a background thread.
///
/// Iterating the stream (or [`recv`](Self::recv)) yields packets in wire
/// order and ends when the source fails or reaches end of input; call
/// [`err`](Self::err) afterwards to tell which.
///
/// A consumer that stops receiving leaves the thread blocked on the hand-off
/// until the stream is dropped. A read blocked on the source is only released
/// by the source itself (closing it or a read timeout).
pub struct PacketStream {
    rx: Receiver<Bytes>,
    terminal: Arc<Terminal>,
    limit: MaxPacketLength,
    buffer_size: usize,
}

impl PacketStream {
    /// Start streaming packets from `source` with a 1024-byte read buffer.
    pub fn new<R>(source: R) -> Self
    where
        R: Read + Send + 'static,
    {
        Self::from_reader(PacketReader::new(source))
    }

    /// Start streaming packets from `source` requesting `size` bytes per read.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn with_capacity<R>(source: R, size: usize) -> Self
    where
        R: Read + Send + 'static,
    {
        Self::from_reader(PacketReader::with_capacity(source, size))
    }

    /// Start streaming packets from `source` with explicit configuration.
    ///
    /// # Panics
    ///
    /// Panics if `config.buffer_size` is zero.
    pub fn with_config<R>(source: R, config: ReaderConfig) -> Self
    where
        R: Read + Send + 'static,
    {
        Self::from_reader(PacketReader::with_config(source, config))
    }

    /// Start streaming from an existing reader, keeping any bytes it buffered.
    pub fn from_reader<R>(reader: PacketReader<R>) -> Self
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(0);
        let terminal = Arc::new(Terminal::default());
        let limit = reader.limit_handle();
        let buffer_size = reader.buffer_size();

        let shared = Arc::clone(&terminal);
        thread::spawn(move || run(reader, tx, &shared));

        Self {
            rx,
            terminal,
            limit,
            buffer_size,
        }
    }

    /// Receive the next packet, blocking until one is available.
    ///
    /// Returns `None` once the stream has terminated.
    pub fn recv(&self) -> Option<Bytes> {
        self.rx.recv().ok()
    }

    /// The receiving side of the packet channel.
    pub fn packets(&self) -> &Receiver<Bytes> {
        &self.rx
    }

    /// The error that terminated the stream, or `None` while it is running.
    pub fn err(&self) -> Option<Arc<FrameError>> {
        self.terminal.err()
    }

    /// Returns true once the stream has recorded its terminal error.
    pub fn is_terminated(&self) -> bool {
        self.terminal.is_closed()
    }

    /// Update the maximum packet length; applies from the next read attempt.
    pub fn set_max_packet_length(&self, max_packet_length: usize) {
        self.limit.set(max_packet_length);
    }

    /// Current maximum packet length; zero is unlimited.
    pub fn max_packet_length(&self) -> usize {
        self.limit.get()
    }

    /// Bytes requested from the source per read.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

impl Iterator for PacketStream {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        self.recv()
    }
}

impl<'a> IntoIterator for &'a PacketStream {
    type Item = Bytes;
    type IntoIter = mpsc::Iter<'a, Bytes>;

    fn into_iter(self) -> Self::IntoIter {
        self.rx.iter()
    }
}

impl std::fmt::Debug for PacketStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketStream")
            .field("terminated", &self.is_terminated())
            .field("max_packet_length", &self.max_packet_length())
            .field("buffer_size", &self.buffer_size)
            .finish()
    }
}

fn run<R: Read>(mut reader: PacketReader<R>, tx: SyncSender<Bytes>, terminal: &Terminal) {
    debug!(buffer_size = reader.buffer_size(), "packet stream started");
    loop {
        match reader.read_packet() {
            Ok(packet) => {
                if tx.send(packet).is_err() {
                    debug!("packet stream receiver dropped");
                    return;
                }
            }
            Err(err) => {
                debug!(error = %err, "packet stream terminated");
                terminal.close(err, tx);
                return;
            }
        }
    }
}
