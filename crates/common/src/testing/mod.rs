//! Test doubles for the SDK's capability seams.
//!
//! Everything here is deterministic and in-process: scripted transports for
//! exact-exchange tests, a mock authorization surface, and an in-memory
//! note service that speaks the sync protocol well enough to drive full
//! chunk loops (pagination, filtering, watermark resets, fault injection).

pub mod mocks;
pub mod note_service;

pub use mocks::{MockAuthorizationUi, ScriptedConnector, ScriptedTransport};
pub use note_service::{InMemoryNoteService, InMemoryUserService};
