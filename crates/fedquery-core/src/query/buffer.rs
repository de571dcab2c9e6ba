//! Offset cursor for relation-first discovery.
//!
//! A page of relation rows sorted by a relation field may map to far fewer
//! distinct roots than rows, because several rows can share one root. The
//! buffer strategy hands out successive offset windows so discovery can keep
//! reading until enough distinct roots are known.

/// One relation fetch window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferWindow {
    /// Rows to request.
    pub limit: u64,
    /// Rows to skip.
    pub offset: u64,
}

/// Stateful offset cursor bounded by a hard maximum offset.
#[derive(Debug, Clone)]
pub struct BufferStrategy {
    batch_size: u64,
    current_offset: u64,
    max_offset: u64,
}

impl BufferStrategy {
    /// Create a cursor reading `user_limit` rows per window.
    pub fn new(user_limit: u64, max_offset: u64) -> Self {
        Self {
            batch_size: user_limit.max(1),
            current_offset: 0,
            max_offset,
        }
    }

    /// Return the next window and move the cursor past it.
    pub fn advance(&mut self) -> BufferWindow {
        let window = BufferWindow {
            limit: self.batch_size,
            offset: self.current_offset,
        };
        self.current_offset = self.current_offset.saturating_add(self.batch_size);
        window
    }

    /// Check whether the cursor has reached the offset cap.
    pub fn has_reached_limit(&self) -> bool {
        self.current_offset >= self.max_offset
    }

    /// Offset the next window will start at.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Rows per window.
    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_widens_offset() {
        let mut buffer = BufferStrategy::new(10, 100);
        assert_eq!(buffer.advance(), BufferWindow { limit: 10, offset: 0 });
        assert_eq!(buffer.advance(), BufferWindow { limit: 10, offset: 10 });
        assert_eq!(buffer.current_offset(), 20);
        assert!(!buffer.has_reached_limit());
    }

    #[test]
    fn test_reaches_offset_cap() {
        let mut buffer = BufferStrategy::new(40, 100);
        buffer.advance();
        buffer.advance();
        assert!(!buffer.has_reached_limit());
        buffer.advance();
        assert!(buffer.has_reached_limit());
    }

    #[test]
    fn test_zero_limit_still_advances() {
        let mut buffer = BufferStrategy::new(0, 5);
        assert_eq!(buffer.batch_size(), 1);
        assert_eq!(buffer.advance().limit, 1);
        assert_eq!(buffer.current_offset(), 1);
    }
}
