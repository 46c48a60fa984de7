//! Caller-side sync cursor.
//!
//! The server keeps no session: the cursor is the whole of the client's
//! sync state. It enforces the loop discipline the protocol needs — drive
//! chunks sequentially, never move backwards — and makes the one ambiguous
//! server behavior explicit: a watermark lower than one previously observed
//! is a signal to discard local state and resync from USN 0, not an error
//! and not something to paper over.

use quillpad_domain::{QuillpadError, Result, SyncChunk, SyncState};

/// What a fresh look at the server watermark means for this cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorDisposition {
    /// The cursor already covers the watermark; nothing to fetch.
    UpToDate,
    /// Changes are pending past the cursor; keep fetching chunks.
    ChunksPending,
    /// The server changelog moved backwards (or the last sync predates
    /// `full_sync_before`). Discard local state, [`SyncCursor::reset`], and
    /// sync from USN 0.
    FullResyncRequired,
}

/// Monotonic progress tracker for a chunk-fetch loop.
///
/// Drive it sequentially: observe the state, then fetch and
/// [`advance`](Self::advance) one chunk at a time until
/// [`is_caught_up`](Self::is_caught_up). Issuing two fetches concurrently
/// against one cursor is undefined with respect to which result is
/// "latest"; nothing here makes that safe.
#[derive(Debug, Clone)]
pub struct SyncCursor {
    after_usn: i32,
    watermark: Option<i32>,
    highest_watermark_seen: i32,
    last_synced_at: i64,
    last_update_count: Option<i32>,
}

impl Default for SyncCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncCursor {
    /// Cursor for a cold start: nothing synced yet.
    #[must_use]
    pub fn new() -> Self {
        Self::resume_from(0)
    }

    /// Cursor resuming from a persisted `after_usn`.
    #[must_use]
    pub fn resume_from(after_usn: i32) -> Self {
        Self {
            after_usn,
            watermark: None,
            highest_watermark_seen: after_usn,
            last_synced_at: 0,
            last_update_count: None,
        }
    }

    /// The exclusive lower bound for the next chunk request.
    #[must_use]
    pub fn after_usn(&self) -> i32 {
        self.after_usn
    }

    /// Fold a fresh [`SyncState`] into the cursor and classify it.
    pub fn observe_state(&mut self, state: &SyncState) -> CursorDisposition {
        if state.update_count < self.highest_watermark_seen {
            return CursorDisposition::FullResyncRequired;
        }
        if self.last_synced_at > 0 && state.full_sync_before > self.last_synced_at {
            return CursorDisposition::FullResyncRequired;
        }

        self.highest_watermark_seen = state.update_count;
        self.watermark = Some(state.update_count);
        if state.update_count <= self.after_usn {
            CursorDisposition::UpToDate
        } else {
            CursorDisposition::ChunksPending
        }
    }

    /// Step the cursor past a received chunk: `after_usn = chunk_high_usn`.
    ///
    /// # Errors
    /// `Protocol` when the chunk would move the cursor backwards; the loop
    /// must stop rather than refetch ground already covered.
    pub fn advance(&mut self, chunk: &SyncChunk) -> Result<()> {
        if chunk.chunk_high_usn < self.after_usn {
            return Err(QuillpadError::Protocol(format!(
                "chunk high usn {} behind cursor {}",
                chunk.chunk_high_usn, self.after_usn
            )));
        }
        self.after_usn = chunk.chunk_high_usn;
        self.last_synced_at = chunk.current_time;
        self.last_update_count = Some(chunk.update_count);
        Ok(())
    }

    /// Whether the loop can stop: the observed watermark is covered, or the
    /// last chunk reported no changes pending past its own cursor.
    #[must_use]
    pub fn is_caught_up(&self) -> bool {
        if self.last_update_count == Some(0) {
            return true;
        }
        self.watermark.is_some_and(|w| self.after_usn >= w)
    }

    /// Forget everything and start over from USN 0, after the caller has
    /// discarded its local state in response to
    /// [`CursorDisposition::FullResyncRequired`].
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the sync cursor.
    use super::*;

    fn state(update_count: i32) -> SyncState {
        SyncState { current_time: 100, full_sync_before: 0, update_count, uploaded: 0 }
    }

    fn chunk(high: i32, update_count: i32) -> SyncChunk {
        SyncChunk {
            current_time: 100,
            chunk_high_usn: high,
            update_count,
            ..SyncChunk::default()
        }
    }

    /// Validates the ordinary observe/advance loop.
    #[test]
    fn observe_then_advance_to_watermark() {
        let mut cursor = SyncCursor::new();
        assert_eq!(cursor.observe_state(&state(120)), CursorDisposition::ChunksPending);
        assert!(!cursor.is_caught_up());

        cursor.advance(&chunk(50, 120)).unwrap();
        assert_eq!(cursor.after_usn(), 50);
        assert!(!cursor.is_caught_up());

        cursor.advance(&chunk(120, 20)).unwrap();
        assert!(cursor.is_caught_up());
        assert_eq!(cursor.observe_state(&state(120)), CursorDisposition::UpToDate);
    }

    /// Validates the monotonic-progress guard.
    #[test]
    fn advance_rejects_backwards_chunk() {
        let mut cursor = SyncCursor::resume_from(80);
        let err = cursor.advance(&chunk(50, 10)).unwrap_err();
        assert!(matches!(err, QuillpadError::Protocol(_)));
        // The cursor did not move.
        assert_eq!(cursor.after_usn(), 80);
    }

    /// Validates the watermark-regression signal (the open question made
    /// explicit): a lower watermark than previously observed demands a full
    /// resync, and reset starts over from USN 0.
    #[test]
    fn watermark_regression_requires_full_resync() {
        let mut cursor = SyncCursor::new();
        cursor.observe_state(&state(120));
        cursor.advance(&chunk(120, 0)).unwrap();

        assert_eq!(cursor.observe_state(&state(40)), CursorDisposition::FullResyncRequired);

        cursor.reset();
        assert_eq!(cursor.after_usn(), 0);
        assert_eq!(cursor.observe_state(&state(40)), CursorDisposition::ChunksPending);
    }

    /// A `full_sync_before` ahead of the last sync is the same signal.
    #[test]
    fn stale_sync_requires_full_resync() {
        let mut cursor = SyncCursor::new();
        cursor.observe_state(&state(10));
        cursor.advance(&chunk(10, 0)).unwrap();

        let compacted = SyncState {
            current_time: 500,
            full_sync_before: 400,
            update_count: 30,
            uploaded: 0,
        };
        assert_eq!(cursor.observe_state(&compacted), CursorDisposition::FullResyncRequired);
    }

    /// A resumed cursor treats its own baseline as an observed watermark.
    #[test]
    fn resumed_cursor_detects_regression_without_state_history() {
        let mut cursor = SyncCursor::resume_from(90);
        assert_eq!(cursor.observe_state(&state(60)), CursorDisposition::FullResyncRequired);
    }

    /// An empty account is up to date immediately.
    #[test]
    fn empty_account_is_up_to_date() {
        let mut cursor = SyncCursor::new();
        assert_eq!(cursor.observe_state(&state(0)), CursorDisposition::UpToDate);
        assert!(cursor.is_caught_up());
    }
}
