//! Async wrappers over the note-store stub: sync operations and notebook
//! CRUD.
//!
//! Every operation is one stateless round trip through the dispatch
//! bridge; received chunks are validated against the request before the
//! caller sees them. Linked-notebook operations derive a client bound to
//! the foreign note store's own URL — one distinct binding per distinct
//! store URL, never the personal transport.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use quillpad_common::dispatch::dispatch_blocking;
use quillpad_common::ports::{RpcConnector, RpcTransport, StoreEndpoint};
use quillpad_domain::constants::rpc;
use quillpad_domain::{
    LinkedNotebook, Notebook, Result, SyncChunk, SyncChunkFilter, SyncState,
};

use crate::rpc::decode;

use super::validate::validate_chunk;

/// Client for one note store (personal, business or linked).
///
/// Instances are independent and not safe to share across concurrent
/// callers; derive one per use via the session or
/// [`crate::ClientFactory`]. Chunk-fetch loops must be driven sequentially
/// — see [`crate::SyncCursor`].
pub struct NoteStoreClient {
    transport: Arc<dyn RpcTransport>,
    connector: Arc<dyn RpcConnector>,
    auth_token: String,
}

impl NoteStoreClient {
    pub(crate) fn new(
        transport: Arc<dyn RpcTransport>,
        connector: Arc<dyn RpcConnector>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self { transport, connector, auth_token: auth_token.into() }
    }

    /// Derive an independent client for a linked notebook's own note store.
    ///
    /// # Errors
    /// `Transport` when the foreign endpoint cannot be bound.
    pub fn for_linked_notebook(&self, linked: &LinkedNotebook) -> Result<Self> {
        let endpoint = StoreEndpoint::new(&linked.note_store_url, &self.auth_token);
        let transport = self.connector.connect(&endpoint)?;
        Ok(Self::new(transport, Arc::clone(&self.connector), self.auth_token.clone()))
    }

    /// Fetch the account's current sync watermark.
    ///
    /// # Errors
    /// Transport or server faults from the underlying call.
    pub async fn get_sync_state(&self) -> Result<SyncState> {
        let transport = Arc::clone(&self.transport);
        let value =
            dispatch_blocking(move || transport.call(rpc::GET_SYNC_STATE, json!({}))).await?;
        decode(value, "sync state")
    }

    /// Fetch one chunk of changes with USN strictly greater than
    /// `after_usn`, at most `max_entries` entities, ascending by USN.
    ///
    /// `full_sync_only` asks for only what a cold resync needs (expunged
    /// lists are omitted, transient fields dropped).
    ///
    /// # Errors
    /// Transport or server faults from the call; `Protocol` when the
    /// response breaks the chunk contract.
    pub async fn get_sync_chunk(
        &self,
        after_usn: i32,
        max_entries: i32,
        full_sync_only: bool,
    ) -> Result<SyncChunk> {
        let transport = Arc::clone(&self.transport);
        let params = json!({
            "afterUsn": after_usn,
            "maxEntries": max_entries,
            "fullSyncOnly": full_sync_only,
        });
        debug!(after_usn, max_entries, "fetching sync chunk");
        let value =
            dispatch_blocking(move || transport.call(rpc::GET_SYNC_CHUNK, params)).await?;
        let chunk: SyncChunk = decode(value, "sync chunk")?;
        validate_chunk(after_usn, &chunk, None)?;
        Ok(chunk)
    }

    /// Like [`get_sync_chunk`](Self::get_sync_chunk), with a server-side
    /// filter applied before truncation. Filtering does not change the
    /// range semantics; the received chunk is validated against the filter
    /// as well.
    ///
    /// # Errors
    /// Transport or server faults from the call; `Protocol` when the
    /// response breaks the chunk or filter contract.
    pub async fn get_filtered_sync_chunk(
        &self,
        after_usn: i32,
        max_entries: i32,
        filter: &SyncChunkFilter,
    ) -> Result<SyncChunk> {
        let transport = Arc::clone(&self.transport);
        let params = json!({
            "afterUsn": after_usn,
            "maxEntries": max_entries,
            "filter": filter,
        });
        debug!(after_usn, max_entries, "fetching filtered sync chunk");
        let value =
            dispatch_blocking(move || transport.call(rpc::GET_FILTERED_SYNC_CHUNK, params))
                .await?;
        let chunk: SyncChunk = decode(value, "sync chunk")?;
        validate_chunk(after_usn, &chunk, Some(filter))?;
        Ok(chunk)
    }

    /// Sync watermark of a linked notebook's store.
    ///
    /// # Errors
    /// Transport faults binding the foreign store, plus anything
    /// [`get_sync_state`](Self::get_sync_state) can fail with.
    pub async fn get_linked_notebook_sync_state(
        &self,
        linked: &LinkedNotebook,
    ) -> Result<SyncState> {
        self.for_linked_notebook(linked)?.get_sync_state().await
    }

    /// One chunk from a linked notebook's store; same contract as
    /// [`get_sync_chunk`](Self::get_sync_chunk).
    ///
    /// # Errors
    /// Transport faults binding the foreign store, plus anything
    /// [`get_sync_chunk`](Self::get_sync_chunk) can fail with.
    pub async fn get_linked_notebook_sync_chunk(
        &self,
        linked: &LinkedNotebook,
        after_usn: i32,
        max_entries: i32,
        full_sync_only: bool,
    ) -> Result<SyncChunk> {
        self.for_linked_notebook(linked)?
            .get_sync_chunk(after_usn, max_entries, full_sync_only)
            .await
    }

    /// List all notebooks in the account.
    ///
    /// # Errors
    /// Transport or server faults from the underlying call.
    pub async fn list_notebooks(&self) -> Result<Vec<Notebook>> {
        let transport = Arc::clone(&self.transport);
        let value =
            dispatch_blocking(move || transport.call(rpc::LIST_NOTEBOOKS, json!({}))).await?;
        decode(value, "notebook list")
    }

    /// Fetch one notebook by GUID.
    ///
    /// # Errors
    /// Transport or server faults from the underlying call.
    pub async fn get_notebook(&self, guid: &str) -> Result<Notebook> {
        let transport = Arc::clone(&self.transport);
        let params = json!({ "guid": guid });
        let value =
            dispatch_blocking(move || transport.call(rpc::GET_NOTEBOOK, params)).await?;
        decode(value, "notebook")
    }

    /// Fetch the account's default notebook.
    ///
    /// # Errors
    /// Transport or server faults from the underlying call.
    pub async fn get_default_notebook(&self) -> Result<Notebook> {
        let transport = Arc::clone(&self.transport);
        let value =
            dispatch_blocking(move || transport.call(rpc::GET_DEFAULT_NOTEBOOK, json!({})))
                .await?;
        decode(value, "notebook")
    }

    /// Create a notebook; the returned record carries the assigned GUID and
    /// USN.
    ///
    /// # Errors
    /// Transport or server faults from the underlying call.
    pub async fn create_notebook(&self, notebook: &Notebook) -> Result<Notebook> {
        let transport = Arc::clone(&self.transport);
        let params = json!({ "notebook": notebook });
        let value =
            dispatch_blocking(move || transport.call(rpc::CREATE_NOTEBOOK, params)).await?;
        decode(value, "notebook")
    }

    /// Update a notebook, returning the new USN so the caller can fold it
    /// into its watermark without a `get_sync_state` round trip.
    ///
    /// # Errors
    /// Transport or server faults from the underlying call.
    pub async fn update_notebook(&self, notebook: &Notebook) -> Result<i32> {
        let transport = Arc::clone(&self.transport);
        let params = json!({ "notebook": notebook });
        let value =
            dispatch_blocking(move || transport.call(rpc::UPDATE_NOTEBOOK, params)).await?;
        decode(value, "usn")
    }

    /// Expunge a notebook, returning the new USN.
    ///
    /// # Errors
    /// Transport or server faults from the underlying call.
    pub async fn expunge_notebook(&self, guid: &str) -> Result<i32> {
        let transport = Arc::clone(&self.transport);
        let params = json!({ "guid": guid });
        let value =
            dispatch_blocking(move || transport.call(rpc::EXPUNGE_NOTEBOOK, params)).await?;
        decode(value, "usn")
    }
}
