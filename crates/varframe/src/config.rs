use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{FrameError, Result};

/// Default scratch read buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Configuration for packet readers and streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Bytes requested from the source per read. Must be greater than zero.
    /// Default: 1024.
    pub buffer_size: usize,
    /// Maximum unresolved bytes buffered before failing with `TooLong`.
    /// Zero means unlimited. Default: 0.
    pub max_packet_length: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_packet_length: 0,
        }
    }
}

/// Shared, runtime-adjustable maximum packet length.
///
/// Clones observe the same value, so a stream can retune the reader owned by
/// its background task.
#[derive(Debug, Clone, Default)]
pub struct MaxPacketLength(Arc<AtomicUsize>);

impl MaxPacketLength {
    /// Create a limit; zero is unlimited.
    pub fn new(max: usize) -> Self {
        Self(Arc::new(AtomicUsize::new(max)))
    }

    /// Current limit; zero is unlimited.
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    /// Replace the limit; zero is unlimited.
    pub fn set(&self, max: usize) {
        self.0.store(max, Ordering::Relaxed);
    }

    /// Fail with `TooLong` if `buffered` exceeds a non-zero limit.
    pub fn check(&self, buffered: usize) -> Result<()> {
        let max = self.get();
        if max > 0 && buffered > max {
            return Err(FrameError::TooLong { buffered, max });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = ReaderConfig::default();
        assert_eq!(cfg.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(cfg.max_packet_length, 0);
    }

    #[test]
    fn zero_limit_is_unlimited() {
        let limit = MaxPacketLength::default();
        assert!(limit.check(usize::MAX).is_ok());
    }

    #[test]
    fn limit_is_exclusive_of_boundary() {
        let limit = MaxPacketLength::new(5);
        assert!(limit.check(5).is_ok());
        assert!(matches!(
            limit.check(6),
            Err(FrameError::TooLong {
                buffered: 6,
                max: 5
            })
        ));
    }

    #[test]
    fn clones_share_updates() {
        let limit = MaxPacketLength::new(0);
        let handle = limit.clone();
        handle.set(3);
        assert_eq!(limit.get(), 3);
        assert!(limit.check(4).is_err());
    }
}
