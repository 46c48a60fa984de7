//! Client factory: binds store clients to an endpoint and token.
//!
//! Every factory call opens its own transport binding, so each returned
//! client is an independent instance. Clients are cheap; callers derive one
//! per concurrent use instead of sharing.

use std::sync::Arc;

use serde_json::Value;

use quillpad_common::ports::{RpcConnector, StoreEndpoint};
use quillpad_domain::{QuillpadError, Result};

use crate::sync::note_store::NoteStoreClient;
use crate::user_store::UserStoreClient;

/// Builds store clients over an injected connector.
#[derive(Clone)]
pub struct ClientFactory {
    connector: Arc<dyn RpcConnector>,
}

impl ClientFactory {
    /// Create a factory over `connector`.
    #[must_use]
    pub fn new(connector: Arc<dyn RpcConnector>) -> Self {
        Self { connector }
    }

    /// Open a user-store client bound to `url` with `auth_token`.
    ///
    /// # Errors
    /// `Transport` when the endpoint cannot be bound.
    pub fn user_store(&self, url: &str, auth_token: &str) -> Result<UserStoreClient> {
        let transport = self.connector.connect(&StoreEndpoint::new(url, auth_token))?;
        Ok(UserStoreClient::new(transport))
    }

    /// Open a note-store client bound to `url` with `auth_token`.
    ///
    /// The client keeps a handle on the connector so linked-notebook
    /// operations can derive clients for foreign store URLs.
    ///
    /// # Errors
    /// `Transport` when the endpoint cannot be bound.
    pub fn note_store(&self, url: &str, auth_token: &str) -> Result<NoteStoreClient> {
        let transport = self.connector.connect(&StoreEndpoint::new(url, auth_token))?;
        Ok(NoteStoreClient::new(transport, Arc::clone(&self.connector), auth_token))
    }
}

/// Decode an RPC result value into its typed shape.
///
/// A result that does not decode breaks the response contract, so the
/// failure is a protocol violation, not a transport fault.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| QuillpadError::Protocol(format!("malformed {what}: {e}")))
}
