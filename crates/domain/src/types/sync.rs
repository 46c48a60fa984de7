//! Incremental sync protocol types.
//!
//! Sync progress is a caller-held USN cursor; these types carry the server's
//! side of the conversation. See the sync module in `quillpad-core` for the
//! invariants enforced on received chunks.

use serde::{Deserialize, Serialize};

use super::entities::{Guid, Note, Notebook, Resource, SavedSearch, Tag};

/// Server-reported sync watermark.
///
/// `update_count` is the account's current high-watermark USN. A value lower
/// than one previously observed means the server changelog was reset and the
/// client must discard local state and resync from USN 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// Server clock at the time of the call, epoch milliseconds.
    pub current_time: i64,
    /// Clients whose last sync predates this timestamp must run a full
    /// resync; incremental chunks before it may have been compacted away.
    pub full_sync_before: i64,
    /// Current high-watermark USN for the account.
    pub update_count: i32,
    /// Bytes uploaded to the account in the current cycle.
    pub uploaded: i64,
}

/// Client-supplied server-side filter for [`SyncChunk`] requests.
///
/// A declarative request modifier: the server drops excluded kinds before
/// truncating to `max_entries`, and never mutates the filter. The default
/// value includes nothing; switch on the kinds you want.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncChunkFilter {
    /// Include changed/created notes.
    pub include_notes: bool,
    /// Include changed/created notebooks.
    pub include_notebooks: bool,
    /// Include changed/created tags.
    pub include_tags: bool,
    /// Include changed/created saved searches.
    pub include_searches: bool,
    /// Include changed/created standalone resources.
    pub include_resources: bool,
    /// Include expunged-identifier lists.
    pub include_expunged: bool,
    /// Inline resource bodies on returned notes and resources.
    pub include_note_resources: bool,
    /// Inline extended note attributes.
    pub include_note_attributes: bool,
    /// Only return entities with USN at or above this threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_usn: Option<i32>,
}

impl SyncChunkFilter {
    /// Filter that includes every entity kind and the expunged lists, without
    /// inline bodies. A reasonable starting point for metadata-first sync.
    #[must_use]
    pub fn everything() -> Self {
        Self {
            include_notes: true,
            include_notebooks: true,
            include_tags: true,
            include_searches: true,
            include_resources: true,
            include_expunged: true,
            include_note_resources: false,
            include_note_attributes: false,
            min_usn: None,
        }
    }
}

/// One bounded batch of changes in `(after_usn, chunk_high_usn]`.
///
/// Entity vectors are ordered by strictly increasing USN. `update_count` is
/// the number of changes still pending past the request's `after_usn` at the
/// time the server answered; when it no longer exceeds the number of entities
/// in the chunk, the client has caught up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncChunk {
    /// Server clock at the time of the call, epoch milliseconds.
    pub current_time: i64,
    /// Inclusive upper USN bound of this chunk.
    pub chunk_high_usn: i32,
    /// Changes pending past the request's `after_usn` when the server
    /// answered.
    pub update_count: i32,

    /// Changed or created notebooks, ascending by USN.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notebooks: Vec<Notebook>,
    /// Changed or created notes, ascending by USN.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
    /// Changed or created tags, ascending by USN.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    /// Changed or created saved searches, ascending by USN.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub searches: Vec<SavedSearch>,
    /// Changed or created standalone resources, ascending by USN.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,

    /// GUIDs of notes expunged server-side.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expunged_notes: Vec<Guid>,
    /// GUIDs of notebooks expunged server-side.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expunged_notebooks: Vec<Guid>,
    /// GUIDs of tags expunged server-side.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expunged_tags: Vec<Guid>,
    /// GUIDs of saved searches expunged server-side.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expunged_searches: Vec<Guid>,
    /// GUIDs of linked notebooks expunged server-side.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expunged_linked_notebooks: Vec<Guid>,
}

impl SyncChunk {
    /// Number of changed/created entities carried by this chunk (expunged
    /// identifiers not included).
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.notebooks.len()
            + self.notes.len()
            + self.tags.len()
            + self.searches.len()
            + self.resources.len()
    }

    /// True when the chunk carries neither entities nor expunged ids.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entity_count() == 0
            && self.expunged_notes.is_empty()
            && self.expunged_notebooks.is_empty()
            && self.expunged_tags.is_empty()
            && self.expunged_searches.is_empty()
            && self.expunged_linked_notebooks.is_empty()
    }

    /// USNs of all carried entities, merged ascending.
    ///
    /// Per the chunk contract each vector is already ascending; the merge is
    /// what validation walks to check global ordering.
    #[must_use]
    pub fn entity_usns(&self) -> Vec<i32> {
        let mut usns: Vec<i32> = self
            .notebooks
            .iter()
            .map(|n| n.update_sequence_num)
            .chain(self.notes.iter().map(|n| n.update_sequence_num))
            .chain(self.tags.iter().map(|t| t.update_sequence_num))
            .chain(self.searches.iter().map(|s| s.update_sequence_num))
            .chain(self.resources.iter().map(|r| r.update_sequence_num))
            .collect();
        usns.sort_unstable();
        usns
    }
}
