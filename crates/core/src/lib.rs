//! # Quillpad Core
//!
//! The client-side session and synchronization layer of the Quillpad SDK.
//!
//! Two coupled halves live here:
//!
//! - [`session`]: endpoint bootstrap, the three-legged OAuth handshake,
//!   credential persistence, and derivation of store clients bound to the
//!   current token ([`Session`] is the entry point).
//! - [`sync`]: the USN-based incremental sync protocol — stateless,
//!   idempotent chunk fetches plus the caller-side [`SyncCursor`] that keeps
//!   progress monotonic and turns a server watermark reset into an explicit
//!   full-resync signal.
//!
//! Every store operation is async and runs the underlying blocking RPC stub
//! on a worker pool, never on the caller's execution context. Nothing here
//! retries internally; failures surface with enough classification
//! (`is_retryable`, `retry_after`, `requires_reauthentication`) for the
//! caller to decide.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod rpc;
pub mod session;
pub mod sync;
pub mod user_store;

pub use rpc::ClientFactory;
pub use session::bootstrap::BootstrapResolver;
pub use session::config::SessionConfig;
pub use session::manager::Session;
pub use session::oauth::{HttpOAuthFlow, OAuthFlow, TemporaryCredential};
pub use sync::cursor::{CursorDisposition, SyncCursor};
pub use sync::note_store::NoteStoreClient;
pub use user_store::UserStoreClient;
