/// Errors that can occur during packet framing and reading.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Not enough bytes yet to resolve a complete frame.
    ///
    /// Readers absorb this by pulling more input; it is never returned from
    /// [`PacketReader::read_packet`](crate::PacketReader::read_packet).
    #[error("data too short")]
    TooShort,

    /// The length header cannot be represented, declares a non-positive
    /// length, or overflows together with the header length.
    #[error("packet overflow")]
    Overflow,

    /// Unresolved buffered bytes exceed the configured maximum packet length.
    #[error("data too long ({buffered} bytes buffered, max {max})")]
    TooLong { buffered: usize, max: usize },

    /// An I/O error occurred on the byte source or sink.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte source reached end of input.
    ///
    /// `pending` counts buffered bytes that never formed a complete frame.
    #[error("end of input ({pending} unparsed bytes)")]
    Eof { pending: usize },
}

impl FrameError {
    /// Returns true if the source ended, cleanly or mid-frame.
    pub fn is_eof(&self) -> bool {
        matches!(self, FrameError::Eof { .. })
    }

    /// Returns true if reading more input cannot recover from this error.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FrameError::TooShort)
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
