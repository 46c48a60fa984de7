//! Entity records carried by sync chunks and the notebook operations.
//!
//! These are the decoded shapes of what the RPC codec hands back; the SDK
//! never interprets note content, it only moves records and their USNs.

use serde::{Deserialize, Serialize};

/// Opaque server-assigned entity identifier.
pub type Guid = String;

/// Common surface of everything that carries a USN, used by chunk
/// validation.
pub trait SyncEntity {
    /// Server-assigned identifier.
    fn guid(&self) -> &str;
    /// Update sequence number at which this revision was recorded.
    fn usn(&self) -> i32;
}

macro_rules! impl_sync_entity {
    ($($ty:ty),+) => {
        $(impl SyncEntity for $ty {
            fn guid(&self) -> &str {
                &self.guid
            }
            fn usn(&self) -> i32 {
                self.update_sequence_num
            }
        })+
    };
}

/// A notebook: the container notes live in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notebook {
    /// Server-assigned identifier.
    pub guid: Guid,
    /// Display name, unique per account.
    pub name: String,
    /// Revision marker.
    pub update_sequence_num: i32,
    /// Whether new notes land here when no notebook is specified.
    #[serde(default)]
    pub default_notebook: bool,
    /// Creation time, epoch milliseconds.
    #[serde(default)]
    pub service_created: i64,
    /// Last modification time, epoch milliseconds.
    #[serde(default)]
    pub service_updated: i64,
    /// Optional stack (folder-like grouping) this notebook belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// A note record. `content` is omitted by metadata-only chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Server-assigned identifier.
    pub guid: Guid,
    /// Note title.
    pub title: String,
    /// Markup body; absent when the chunk carried metadata only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Byte length of the full content, present even when `content` is not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<i32>,
    /// Creation time, epoch milliseconds.
    #[serde(default)]
    pub created: i64,
    /// Last modification time, epoch milliseconds.
    #[serde(default)]
    pub updated: i64,
    /// Deletion time when the note sits in the trash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<i64>,
    /// False once the note has been moved to the trash.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Revision marker.
    pub update_sequence_num: i32,
    /// Owning notebook.
    pub notebook_guid: Guid,
    /// Tags applied to this note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_guids: Option<Vec<Guid>>,
}

fn default_active() -> bool {
    true
}

/// A tag. Tags form a forest via `parent_guid`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Server-assigned identifier.
    pub guid: Guid,
    /// Display name, unique per account.
    pub name: String,
    /// Parent tag, when nested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_guid: Option<Guid>,
    /// Revision marker.
    pub update_sequence_num: i32,
}

/// A persisted search expression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearch {
    /// Server-assigned identifier.
    pub guid: Guid,
    /// Display name.
    pub name: String,
    /// Search grammar expression.
    pub query: String,
    /// Revision marker.
    pub update_sequence_num: i32,
}

/// A binary attachment owned by a note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Server-assigned identifier.
    pub guid: Guid,
    /// Owning note.
    pub note_guid: Guid,
    /// MIME type of the body.
    pub mime: String,
    /// Revision marker.
    pub update_sequence_num: i32,
    /// Inline body; only present when the request asked for resource bodies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<u8>>,
}

impl_sync_entity!(Notebook, Note, Tag, SavedSearch, Resource);
