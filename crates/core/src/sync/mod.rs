//! The USN-based incremental sync protocol.
//!
//! Progress is a caller-held cursor, not a server session: every chunk
//! fetch is stateless and idempotent for the same `after_usn`. The pieces:
//!
//! - [`note_store`]: the async operations against a note store
//! - [`validate`]: client-side enforcement of the chunk contract
//! - [`cursor`]: the loop helper that keeps progress monotonic and turns a
//!   watermark reset into an explicit full-resync signal

pub mod cursor;
pub mod note_store;
pub mod validate;

pub use cursor::{CursorDisposition, SyncCursor};
pub use note_store::NoteStoreClient;
pub use validate::validate_chunk;
