//! Client-side enforcement of the sync chunk contract.
//!
//! Every received chunk is checked against the request that produced it. A
//! violation is fatal to the current sync loop: retrying the same request
//! against a server that breaks the ordering contract cannot converge, so
//! the caller gets a `Protocol` error instead of a silently corrupt cursor.

use std::collections::HashSet;

use quillpad_domain::{Guid, QuillpadError, Result, SyncChunk, SyncChunkFilter, SyncEntity};

/// Check `chunk` against the `after_usn` it was requested with and the
/// filter, if one was sent.
///
/// Enforced, in order:
/// - `chunk_high_usn >= after_usn` (the range is never inverted);
/// - each entity vector is strictly ascending in USN;
/// - every entity USN lies in `(after_usn, chunk_high_usn]` and at or above
///   the filter's `min_usn` threshold;
/// - no USN appears twice across entity kinds;
/// - expunged identifiers do not reappear in the created/updated sets;
/// - kinds the filter excluded are absent.
///
/// # Errors
/// `Protocol` naming the first violated invariant.
pub fn validate_chunk(
    after_usn: i32,
    chunk: &SyncChunk,
    filter: Option<&SyncChunkFilter>,
) -> Result<()> {
    if chunk.chunk_high_usn < after_usn {
        return Err(violation(format!(
            "chunk range inverted: high {} below cursor {after_usn}",
            chunk.chunk_high_usn
        )));
    }

    check_ascending("notebooks", &chunk.notebooks)?;
    check_ascending("notes", &chunk.notes)?;
    check_ascending("tags", &chunk.tags)?;
    check_ascending("searches", &chunk.searches)?;
    check_ascending("resources", &chunk.resources)?;

    let min_usn = filter.and_then(|f| f.min_usn);
    let mut seen = HashSet::new();
    for usn in chunk.entity_usns() {
        if usn <= after_usn || usn > chunk.chunk_high_usn {
            return Err(violation(format!(
                "entity usn {usn} outside range ({after_usn}, {}]",
                chunk.chunk_high_usn
            )));
        }
        if let Some(min) = min_usn {
            if usn < min {
                return Err(violation(format!("entity usn {usn} below filter threshold {min}")));
            }
        }
        if !seen.insert(usn) {
            return Err(violation(format!("usn {usn} appears more than once")));
        }
    }

    check_no_reappearance("notes", &chunk.expunged_notes, chunk.notes.iter())?;
    check_no_reappearance("notebooks", &chunk.expunged_notebooks, chunk.notebooks.iter())?;
    check_no_reappearance("tags", &chunk.expunged_tags, chunk.tags.iter())?;
    check_no_reappearance("searches", &chunk.expunged_searches, chunk.searches.iter())?;

    if let Some(filter) = filter {
        check_excluded(filter.include_notes, !chunk.notes.is_empty(), "notes")?;
        check_excluded(filter.include_notebooks, !chunk.notebooks.is_empty(), "notebooks")?;
        check_excluded(filter.include_tags, !chunk.tags.is_empty(), "tags")?;
        check_excluded(filter.include_searches, !chunk.searches.is_empty(), "searches")?;
        check_excluded(filter.include_resources, !chunk.resources.is_empty(), "resources")?;
        let has_expunged = !chunk.expunged_notes.is_empty()
            || !chunk.expunged_notebooks.is_empty()
            || !chunk.expunged_tags.is_empty()
            || !chunk.expunged_searches.is_empty()
            || !chunk.expunged_linked_notebooks.is_empty();
        check_excluded(filter.include_expunged, has_expunged, "expunged ids")?;
    }

    Ok(())
}

fn violation(message: String) -> QuillpadError {
    QuillpadError::Protocol(message)
}

fn check_ascending<E: SyncEntity>(kind: &str, entities: &[E]) -> Result<()> {
    for pair in entities.windows(2) {
        if pair[1].usn() <= pair[0].usn() {
            return Err(violation(format!(
                "{kind} not strictly ascending: {} then {}",
                pair[0].usn(),
                pair[1].usn()
            )));
        }
    }
    Ok(())
}

fn check_no_reappearance<'a, E: SyncEntity + 'a>(
    kind: &str,
    expunged: &[Guid],
    entities: impl Iterator<Item = &'a E>,
) -> Result<()> {
    if expunged.is_empty() {
        return Ok(());
    }
    let expunged: HashSet<&str> = expunged.iter().map(String::as_str).collect();
    for entity in entities {
        if expunged.contains(entity.guid()) {
            return Err(violation(format!(
                "expunged {kind} guid {} reappears in the same chunk",
                entity.guid()
            )));
        }
    }
    Ok(())
}

fn check_excluded(included: bool, present: bool, kind: &str) -> Result<()> {
    if !included && present {
        return Err(violation(format!("filter excluded {kind} but the chunk carries some")));
    }
    Ok(())
}
