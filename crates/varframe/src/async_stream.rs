use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::Stream;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tracing::debug;

use crate::config::{MaxPacketLength, ReaderConfig};
use crate::error::FrameError;
use crate::framed::PacketCodec;
use crate::stream::Terminal;

/// Async counterpart of [`PacketStream`](crate::PacketStream).
///
/// A spawned tokio task decodes packets from the source and hands them over a
/// single-slot channel. The task reserves the slot before reading, so it only
/// reads further once the consumer has taken the previous packet, and the
/// terminal error is recorded only after every decoded packet was delivered.
/// Must be created inside a tokio runtime.
pub struct AsyncPacketStream {
    rx: mpsc::Receiver<Bytes>,
    terminal: Arc<Terminal>,
    limit: MaxPacketLength,
}

impl AsyncPacketStream {
    /// Start streaming packets from `source` with default configuration.
    pub fn new<R>(source: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self::with_config(source, ReaderConfig::default())
    }

    /// Start streaming packets from `source` with explicit configuration.
    ///
    /// # Panics
    ///
    /// Panics if `config.buffer_size` is zero, or when called outside a
    /// tokio runtime.
    pub fn with_config<R>(source: R, config: ReaderConfig) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        assert!(config.buffer_size > 0, "size must be greater than 0");
        let codec = PacketCodec::with_max_packet_length(config.max_packet_length);
        let limit = codec.limit_handle();
        let framed = FramedRead::with_capacity(source, codec, config.buffer_size);

        let (tx, rx) = mpsc::channel(1);
        let terminal = Arc::new(Terminal::default());
        tokio::spawn(run(framed, tx, Arc::clone(&terminal)));

        Self {
            rx,
            terminal,
            limit,
        }
    }

    /// Receive the next packet; `None` once the stream has terminated.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// The error that terminated the stream, or `None` while it is running.
    pub fn err(&self) -> Option<Arc<FrameError>> {
        self.terminal.err()
    }

    /// Returns true once the stream has recorded its terminal error.
    pub fn is_terminated(&self) -> bool {
        self.terminal.is_closed()
    }

    /// Update the maximum packet length; applies from the next decode.
    pub fn set_max_packet_length(&self, max_packet_length: usize) {
        self.limit.set(max_packet_length);
    }

    /// Current maximum packet length; zero is unlimited.
    pub fn max_packet_length(&self) -> usize {
        self.limit.get()
    }
}

impl Stream for AsyncPacketStream {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        self.rx.poll_recv(cx)
    }
}

async fn run<R>(
    mut framed: FramedRead<R, PacketCodec>,
    tx: mpsc::Sender<Bytes>,
    terminal: Arc<Terminal>,
) where
    R: AsyncRead + Unpin,
{
    debug!("async packet stream started");
    loop {
        // The slot frees only once the previous packet has been received, so
        // the source is not read ahead of the consumer.
        let Ok(permit) = tx.reserve().await else {
            debug!("async packet stream receiver dropped");
            return;
        };

        let err = match poll_fn(|cx| Pin::new(&mut framed).poll_next(cx)).await {
            Some(Ok(packet)) => {
                permit.send(packet);
                continue;
            }
            Some(Err(err)) => err,
            None => FrameError::Eof { pending: 0 },
        };

        drop(permit);
        debug!(error = %err, "async packet stream terminated");
        terminal.close(err, tx);
        return;
    }
}
