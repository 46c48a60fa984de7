//! In-memory note and user services speaking the store RPC surface.
//!
//! `InMemoryNoteService` keeps a USN-ordered changelog and answers the sync
//! and notebook methods the way the real service does: exclusive lower
//! bound, inclusive upper bound, server-side filtering before truncation,
//! `update_count` reporting the changes still pending past the request's
//! cursor. It also supports the failure modes the SDK must handle: injected
//! faults, a corrupted chunk range, and a changelog reset (watermark
//! regression).

// Mutex poisoning is acceptable in test doubles.
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc)]

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{json, Value};

use quillpad_domain::constants::rpc;
use quillpad_domain::constants::CLIENT_PROTOCOL_MAJOR;
use quillpad_domain::{
    AuthenticationResult, BootstrapInfo, BootstrapProfile, Guid, Note, Notebook, QuillpadError,
    Resource, Result, SavedSearch, ServerFault, SyncChunk, SyncChunkFilter, SyncState, SyncEntity,
    Tag, User,
};

use crate::ports::RpcTransport;

/// Which entity kind an expunge record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExpungedKind {
    Note,
    Notebook,
    Tag,
    Search,
    LinkedNotebook,
}

/// One changelog entry.
#[derive(Debug, Clone)]
enum Change {
    Notebook(Notebook),
    Note(Note),
    Tag(Tag),
    Search(SavedSearch),
    Resource(Resource),
    Expunged { kind: ExpungedKind, guid: Guid, usn: i32 },
}

impl Change {
    fn usn(&self) -> i32 {
        match self {
            Self::Notebook(n) => n.usn(),
            Self::Note(n) => n.usn(),
            Self::Tag(t) => t.usn(),
            Self::Search(s) => s.usn(),
            Self::Resource(r) => r.usn(),
            Self::Expunged { usn, .. } => *usn,
        }
    }

    fn included(&self, filter: Option<&SyncChunkFilter>, full_sync_only: bool) -> bool {
        if let Some(min) = filter.and_then(|f| f.min_usn) {
            if self.usn() < min {
                return false;
            }
        }
        match self {
            Self::Notebook(_) => filter.map_or(true, |f| f.include_notebooks),
            Self::Note(_) => filter.map_or(true, |f| f.include_notes),
            Self::Tag(_) => filter.map_or(true, |f| f.include_tags),
            Self::Search(_) => filter.map_or(true, |f| f.include_searches),
            Self::Resource(_) => filter.map_or(true, |f| f.include_resources),
            // A cold resync has nothing to expunge.
            Self::Expunged { .. } => {
                !full_sync_only && filter.map_or(true, |f| f.include_expunged)
            }
        }
    }
}

struct ServiceState {
    changes: Vec<Change>,
    notebooks: HashMap<Guid, Notebook>,
    usn_counter: i32,
    clock: i64,
    full_sync_before: i64,
    next_fault: Option<QuillpadError>,
    corrupt_next_chunk: bool,
    calls: Vec<String>,
}

impl ServiceState {
    fn next_usn(&mut self) -> i32 {
        self.usn_counter += 1;
        self.clock += 1;
        self.usn_counter
    }

    fn build_chunk(
        &mut self,
        after: i32,
        max_entries: usize,
        filter: Option<&SyncChunkFilter>,
        full_sync_only: bool,
    ) -> Result<SyncChunk> {
        if after > self.usn_counter {
            return Err(QuillpadError::Server(ServerFault::BadRequest(format!(
                "afterUsn {after} is past the account watermark {}",
                self.usn_counter
            ))));
        }

        let pending: Vec<Change> =
            self.changes.iter().filter(|c| c.usn() > after).cloned().collect();

        let mut chunk = SyncChunk {
            current_time: self.clock,
            chunk_high_usn: after,
            update_count: i32::try_from(pending.len()).unwrap_or(i32::MAX),
            ..SyncChunk::default()
        };

        let include_bodies = filter.is_some_and(|f| f.include_note_resources);
        let mut collected = 0usize;
        for change in &pending {
            if collected == max_entries {
                break;
            }
            if !change.included(filter, full_sync_only) {
                continue;
            }
            match change.clone() {
                Change::Notebook(n) => chunk.notebooks.push(n),
                Change::Note(n) => chunk.notes.push(n),
                Change::Tag(t) => chunk.tags.push(t),
                Change::Search(s) => chunk.searches.push(s),
                Change::Resource(mut r) => {
                    if !include_bodies {
                        r.body = None;
                    }
                    chunk.resources.push(r);
                }
                Change::Expunged { kind, guid, .. } => match kind {
                    ExpungedKind::Note => chunk.expunged_notes.push(guid),
                    ExpungedKind::Notebook => chunk.expunged_notebooks.push(guid),
                    ExpungedKind::Tag => chunk.expunged_tags.push(guid),
                    ExpungedKind::Search => chunk.expunged_searches.push(guid),
                    ExpungedKind::LinkedNotebook => {
                        chunk.expunged_linked_notebooks.push(guid);
                    }
                },
            }
            chunk.chunk_high_usn = change.usn();
            collected += 1;
        }

        // The scan reached the end of the changelog: the chunk covers
        // everything up to the watermark, filtered-out entries included.
        if collected < max_entries {
            chunk.chunk_high_usn = self.usn_counter;
        }

        if self.corrupt_next_chunk {
            self.corrupt_next_chunk = false;
            chunk.chunk_high_usn = after - 1;
        }

        Ok(chunk)
    }
}

/// In-memory note store.
pub struct InMemoryNoteService {
    state: Mutex<ServiceState>,
}

impl Default for InMemoryNoteService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryNoteService {
    /// Create an empty service with watermark 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ServiceState {
                changes: Vec::new(),
                notebooks: HashMap::new(),
                usn_counter: 0,
                clock: 1_700_000_000_000,
                full_sync_before: 0,
                next_fault: None,
                corrupt_next_chunk: false,
                calls: Vec::new(),
            }),
        }
    }

    /// Current account watermark.
    #[must_use]
    pub fn watermark(&self) -> i32 {
        self.state.lock().unwrap().usn_counter
    }

    /// Methods invoked so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Record a new notebook in the changelog and return it.
    pub fn add_notebook(&self, name: &str) -> Notebook {
        let mut state = self.state.lock().unwrap();
        let usn = state.next_usn();
        let notebook = Notebook {
            guid: format!("notebook-{usn}"),
            name: name.to_string(),
            update_sequence_num: usn,
            default_notebook: state.notebooks.is_empty(),
            service_created: state.clock,
            service_updated: state.clock,
            stack: None,
        };
        state.notebooks.insert(notebook.guid.clone(), notebook.clone());
        state.changes.push(Change::Notebook(notebook.clone()));
        notebook
    }

    /// Record a new note in the changelog and return it.
    pub fn add_note(&self, title: &str, notebook_guid: &str) -> Note {
        let mut state = self.state.lock().unwrap();
        let usn = state.next_usn();
        let note = Note {
            guid: format!("note-{usn}"),
            title: title.to_string(),
            content: None,
            content_length: Some(0),
            created: state.clock,
            updated: state.clock,
            deleted: None,
            active: true,
            update_sequence_num: usn,
            notebook_guid: notebook_guid.to_string(),
            tag_guids: None,
        };
        state.changes.push(Change::Note(note.clone()));
        note
    }

    /// Record `count` new notes in one notebook.
    pub fn seed_notes(&self, count: usize, notebook_guid: &str) {
        for i in 0..count {
            self.add_note(&format!("note {i}"), notebook_guid);
        }
    }

    /// Record a new tag in the changelog and return it.
    pub fn add_tag(&self, name: &str) -> Tag {
        let mut state = self.state.lock().unwrap();
        let usn = state.next_usn();
        let tag = Tag {
            guid: format!("tag-{usn}"),
            name: name.to_string(),
            parent_guid: None,
            update_sequence_num: usn,
        };
        state.changes.push(Change::Tag(tag.clone()));
        tag
    }

    /// Record a new saved search in the changelog and return it.
    pub fn add_search(&self, name: &str, query: &str) -> SavedSearch {
        let mut state = self.state.lock().unwrap();
        let usn = state.next_usn();
        let search = SavedSearch {
            guid: format!("search-{usn}"),
            name: name.to_string(),
            query: query.to_string(),
            update_sequence_num: usn,
        };
        state.changes.push(Change::Search(search.clone()));
        search
    }

    /// Record a new resource with an inline body.
    pub fn add_resource(&self, note_guid: &str, mime: &str, body: &[u8]) -> Resource {
        let mut state = self.state.lock().unwrap();
        let usn = state.next_usn();
        let resource = Resource {
            guid: format!("resource-{usn}"),
            note_guid: note_guid.to_string(),
            mime: mime.to_string(),
            update_sequence_num: usn,
            body: Some(body.to_vec()),
        };
        state.changes.push(Change::Resource(resource.clone()));
        resource
    }

    /// Record a server-side note expunge.
    pub fn expunge_note(&self, guid: &str) {
        let mut state = self.state.lock().unwrap();
        let usn = state.next_usn();
        state.changes.push(Change::Expunged {
            kind: ExpungedKind::Note,
            guid: guid.to_string(),
            usn,
        });
    }

    /// Inject a fault for the next call only.
    pub fn inject_fault(&self, fault: QuillpadError) {
        self.state.lock().unwrap().next_fault = Some(fault);
    }

    /// Make the next chunk violate the range contract.
    pub fn corrupt_next_chunk(&self) {
        self.state.lock().unwrap().corrupt_next_chunk = true;
    }

    /// Reset the changelog as the service does after a restore: the
    /// watermark drops to 0 and `full_sync_before` moves up to now.
    pub fn reset_changelog(&self) {
        let mut state = self.state.lock().unwrap();
        state.changes.clear();
        state.usn_counter = 0;
        state.full_sync_before = state.clock;
    }

    fn handle(&self, method: &str, params: &Value) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(method.to_string());
        if let Some(fault) = state.next_fault.take() {
            return Err(fault);
        }

        match method {
            rpc::GET_SYNC_STATE => encode(&SyncState {
                current_time: state.clock,
                full_sync_before: state.full_sync_before,
                update_count: state.usn_counter,
                uploaded: 0,
            }),
            rpc::GET_SYNC_CHUNK => {
                let after = int_param(params, "afterUsn")?;
                let max = usize_param(params, "maxEntries")?;
                let full_sync_only =
                    params.get("fullSyncOnly").and_then(Value::as_bool).unwrap_or(false);
                let chunk = state.build_chunk(after, max, None, full_sync_only)?;
                encode(&chunk)
            }
            rpc::GET_FILTERED_SYNC_CHUNK => {
                let after = int_param(params, "afterUsn")?;
                let max = usize_param(params, "maxEntries")?;
                let filter: SyncChunkFilter = params
                    .get("filter")
                    .cloned()
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(|e| bad_request(format!("malformed filter: {e}")))?
                    .ok_or_else(|| bad_request("missing filter".into()))?;
                let chunk = state.build_chunk(after, max, Some(&filter), false)?;
                encode(&chunk)
            }
            rpc::LIST_NOTEBOOKS => {
                let mut notebooks: Vec<Notebook> = state.notebooks.values().cloned().collect();
                notebooks.sort_by(|a, b| a.name.cmp(&b.name));
                encode(&notebooks)
            }
            rpc::GET_NOTEBOOK => {
                let guid = str_param(params, "guid")?;
                state
                    .notebooks
                    .get(&guid)
                    .cloned()
                    .ok_or_else(|| bad_request(format!("no notebook {guid}")))
                    .and_then(|n| encode(&n))
            }
            rpc::GET_DEFAULT_NOTEBOOK => state
                .notebooks
                .values()
                .find(|n| n.default_notebook)
                .cloned()
                .ok_or_else(|| bad_request("no default notebook".into()))
                .and_then(|n| encode(&n)),
            rpc::CREATE_NOTEBOOK => {
                let mut notebook: Notebook = object_param(params, "notebook")?;
                let usn = state.next_usn();
                if notebook.guid.is_empty() {
                    notebook.guid = format!("notebook-{usn}");
                }
                notebook.update_sequence_num = usn;
                notebook.service_created = state.clock;
                notebook.service_updated = state.clock;
                state.notebooks.insert(notebook.guid.clone(), notebook.clone());
                state.changes.push(Change::Notebook(notebook.clone()));
                encode(&notebook)
            }
            rpc::UPDATE_NOTEBOOK => {
                let mut notebook: Notebook = object_param(params, "notebook")?;
                if !state.notebooks.contains_key(&notebook.guid) {
                    return Err(bad_request(format!("no notebook {}", notebook.guid)));
                }
                let usn = state.next_usn();
                notebook.update_sequence_num = usn;
                notebook.service_updated = state.clock;
                state.notebooks.insert(notebook.guid.clone(), notebook.clone());
                state.changes.push(Change::Notebook(notebook));
                Ok(json!(usn))
            }
            rpc::EXPUNGE_NOTEBOOK => {
                let guid = str_param(params, "guid")?;
                if state.notebooks.remove(&guid).is_none() {
                    return Err(bad_request(format!("no notebook {guid}")));
                }
                let usn = state.next_usn();
                state.changes.push(Change::Expunged {
                    kind: ExpungedKind::Notebook,
                    guid,
                    usn,
                });
                Ok(json!(usn))
            }
            other => Err(bad_request(format!("unknown method {other}"))),
        }
    }
}

impl RpcTransport for InMemoryNoteService {
    fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.handle(method, &params)
    }
}

/// In-memory user store.
pub struct InMemoryUserService {
    state: Mutex<UserState>,
}

struct UserState {
    user: User,
    business_auth: Option<AuthenticationResult>,
    bootstrap: Vec<BootstrapProfile>,
    revoked: bool,
    calls: Vec<String>,
}

impl InMemoryUserService {
    /// Create a user store answering for `user`.
    #[must_use]
    pub fn new(user: User) -> Self {
        Self {
            state: Mutex::new(UserState {
                user,
                business_auth: None,
                bootstrap: Vec::new(),
                revoked: false,
                calls: Vec::new(),
            }),
        }
    }

    /// Make `authenticate_to_business` succeed with `auth`.
    pub fn set_business_auth(&self, auth: AuthenticationResult) {
        self.state.lock().unwrap().business_auth = Some(auth);
    }

    /// Advertise these profiles from `get_bootstrap_info`.
    pub fn set_bootstrap_profiles(&self, profiles: Vec<BootstrapProfile>) {
        self.state.lock().unwrap().bootstrap = profiles;
    }

    /// Whether `revoke_long_session` was called.
    #[must_use]
    pub fn revoked(&self) -> bool {
        self.state.lock().unwrap().revoked
    }

    /// Methods invoked so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl RpcTransport for InMemoryUserService {
    fn call(&self, method: &str, params: Value) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(method.to_string());
        match method {
            rpc::CHECK_VERSION => {
                let major = int_param(&params, "major")?;
                Ok(json!(major == i32::from(CLIENT_PROTOCOL_MAJOR)))
            }
            rpc::GET_USER => encode(&state.user),
            rpc::GET_BOOTSTRAP_INFO => {
                encode(&BootstrapInfo { profiles: state.bootstrap.clone() })
            }
            rpc::AUTHENTICATE_TO_BUSINESS => state
                .business_auth
                .clone()
                .ok_or_else(|| {
                    QuillpadError::Server(ServerFault::PermissionDenied(
                        "account is not a member of a business".into(),
                    ))
                })
                .and_then(|auth| encode(&auth)),
            rpc::REVOKE_LONG_SESSION => {
                state.revoked = true;
                Ok(Value::Null)
            }
            other => Err(bad_request(format!("unknown method {other}"))),
        }
    }
}

fn bad_request(message: String) -> QuillpadError {
    QuillpadError::Server(ServerFault::BadRequest(message))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| QuillpadError::Server(ServerFault::Internal(format!("encode failed: {e}"))))
}

fn int_param(params: &Value, name: &str) -> Result<i32> {
    params
        .get(name)
        .and_then(Value::as_i64)
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| bad_request(format!("missing or invalid {name}")))
}

fn usize_param(params: &Value, name: &str) -> Result<usize> {
    params
        .get(name)
        .and_then(Value::as_i64)
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| bad_request(format!("missing or invalid {name}")))
}

fn str_param(params: &Value, name: &str) -> Result<String> {
    params
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| bad_request(format!("missing or invalid {name}")))
}

fn object_param<T: serde::de::DeserializeOwned>(params: &Value, name: &str) -> Result<T> {
    params
        .get(name)
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| bad_request(format!("malformed {name}: {e}")))?
        .ok_or_else(|| bad_request(format!("missing {name}")))
}
