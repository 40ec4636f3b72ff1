//! Name and content deduplication.
//!
//! Runs during insert, after the candidate slot has its identifier and
//! digest filled in but before any blob is written.  The candidate is still
//! `EMPTY` at this point and is skipped by the scan.
//!
//! One ascending pass over the slot table; per slot the identifier is
//! checked before the digest, and the first hit wins:
//!
//! - identifier match → [`ImgfsError::DuplicateId`]; the caller rolls the
//!   candidate back (it was never marked `NON_EMPTY`);
//! - digest match → every `offset`/`size` pair is aliased from the twin
//!   (derived resolutions already materialized come along for free) and
//!   the scan returns [`DedupOutcome::Shared`] immediately.
//!
//! With no match the candidate's original-blob offset is zeroed as the
//! "must write the blob now" signal.

use crate::error::{ImgfsError, Result};
use crate::metadata::{Resolution, NB_RES};
use crate::store::ImgFs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    /// Content already stored; the candidate aliases the twin's blobs.
    Shared,
    /// New content; the caller must append the original blob.
    Unique,
}

pub fn name_and_content_dedup(store: &mut ImgFs, index: usize) -> Result<DedupOutcome> {
    if index >= store.header.max_files as usize {
        return Err(ImgfsError::NotFound);
    }

    let candidate_id = store.slots[index].img_id_str().to_owned();
    let candidate_sha = store.slots[index].sha;

    for i in 0..store.slots.len() {
        if i == index || store.slots[i].is_empty() {
            continue;
        }
        if store.slots[i].img_id_str() == candidate_id {
            return Err(ImgfsError::DuplicateId);
        }
        if store.slots[i].sha == candidate_sha {
            for r in 0..NB_RES {
                store.slots[index].offset[r] = store.slots[i].offset[r];
                store.slots[index].size[r] = store.slots[i].size[r];
            }
            return Ok(DedupOutcome::Shared);
        }
    }

    store.slots[index].offset[Resolution::Orig.index()] = 0;
    Ok(DedupOutcome::Unique)
}
