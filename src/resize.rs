//! Lazy materialization of derived resolutions.
//!
//! A derived blob (thumb or small) is produced the first time it is read:
//! decode the original, shrink to the header's target box, re-encode, append
//! at end-of-file, then persist the touched slot.  The header `version` is
//! NOT bumped — the derived blob is a cache of existing logical content, and
//! `nb_files` is untouched.
//!
//! If a failure happens after the append, the appended bytes stay orphaned
//! in the file; neither the in-memory slot nor the on-disk slot is updated.

use crate::codec;
use crate::error::{ImgfsError, Result};
use crate::metadata::Resolution;
use crate::store::ImgFs;

/// Ensure the blob for `resolution` exists on slot `index`.
///
/// No-op success when the target is the original resolution or the derived
/// blob is already present.
pub fn lazily_resize(resolution: Resolution, store: &mut ImgFs, index: usize) -> Result<()> {
    if index >= store.header.max_files as usize {
        return Err(ImgfsError::InvalidImgId);
    }
    if store.slots[index].is_empty() {
        return Err(ImgfsError::InvalidImgId);
    }
    if resolution == Resolution::Orig {
        return Ok(());
    }
    let r = resolution.index();
    if store.slots[index].size[r] != 0 {
        return Ok(());
    }

    // A content twin may have materialized this resolution since the two
    // slots were deduplicated; alias its blob instead of appending a copy.
    let sha = store.slots[index].sha;
    let twin = store
        .slots
        .iter()
        .enumerate()
        .find(|(i, s)| *i != index && !s.is_empty() && s.sha == sha && s.size[r] != 0)
        .map(|(i, _)| i);
    if let Some(twin) = twin {
        store.slots[index].offset[r] = store.slots[twin].offset[r];
        store.slots[index].size[r] = store.slots[twin].size[r];
        return persist_or_rollback(store, index, r);
    }

    let orig_offset = store.slots[index].offset[Resolution::Orig.index()];
    let orig_size = store.slots[index].size[Resolution::Orig.index()];
    let orig = store.read_blob(orig_offset, orig_size)?;

    let resized = codec::resize_jpeg(
        &orig,
        store.header.resized_width(resolution),
        store.header.resized_height(resolution),
    )?;

    let offset = store.append_blob(&resized)?;

    store.slots[index].offset[r] = offset;
    store.slots[index].size[r] = resized.len() as u32;
    // On a failed slot write the appended bytes stay orphaned.
    persist_or_rollback(store, index, r)
}

fn persist_or_rollback(store: &mut ImgFs, index: usize, r: usize) -> Result<()> {
    match store.write_slot(index) {
        Ok(()) => Ok(()),
        Err(e) => {
            store.slots[index].offset[r] = 0;
            store.slots[index].size[r] = 0;
            Err(e)
        }
    }
}
