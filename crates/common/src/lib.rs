//! Ambient infrastructure shared across Quillpad SDK crates.
//!
//! - [`dispatch`]: the bridge that runs blocking RPC calls off the caller's
//!   execution context with at-most-once result delivery
//! - [`ports`]: the injectable capability seams (blocking RPC stub,
//!   authorization UI)
//! - [`credentials`]: the persisted credential record store, keychain-backed
//!   or in-memory
//! - [`testing`]: scripted transports and an in-memory note service for
//!   driving the sync protocol in tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod credentials;
pub mod dispatch;
pub mod ports;
pub mod testing;

pub use credentials::{CredentialStore, KeychainCredentialStore, MemoryCredentialStore};
pub use dispatch::dispatch_blocking;
pub use ports::{AuthorizationOutcome, AuthorizationUi, RpcConnector, RpcTransport, StoreEndpoint};
