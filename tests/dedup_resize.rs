//! Deduplication and lazy-resize behavior: blob sharing across identifiers,
//! idempotent materialization, and cache survival across deletes.

mod common;

use common::{new_store, sample_jpeg};
use imgfs::codec;
use imgfs::metadata::Resolution;

#[test]
fn first_thumb_read_appends_second_does_not() {
    let (_tmp, mut store) = new_store(4);
    let img = sample_jpeg(320, 240, 5);
    store.insert(&img, "A").unwrap();
    let len_before = store.file_len().unwrap();

    let thumb1 = store.read("A", Resolution::Thumb).unwrap();
    let len_after_first = store.file_len().unwrap();
    assert_eq!(
        len_after_first,
        len_before + thumb1.len() as u64,
        "first read materializes exactly the encoded thumbnail"
    );

    let thumb2 = store.read("A", Resolution::Thumb).unwrap();
    assert_eq!(store.file_len().unwrap(), len_after_first, "second read is a cache hit");
    assert_eq!(thumb1, thumb2);
}

#[test]
fn thumb_fits_configured_box() {
    let (_tmp, mut store) = new_store(4);
    store.insert(&sample_jpeg(320, 240, 5), "A").unwrap();

    let thumb = store.read("A", Resolution::Thumb).unwrap();
    let (w, h) = codec::get_resolution(&thumb).unwrap();
    assert!(w <= 64 && h <= 64);

    let small = store.read("A", Resolution::Small).unwrap();
    let (w, h) = codec::get_resolution(&small).unwrap();
    assert!(w <= 256 && h <= 256);
    assert!(small.len() != thumb.len() || small != thumb);
}

#[test]
fn shared_content_shares_derived_resolutions() {
    let (_tmp, mut store) = new_store(4);
    let img = sample_jpeg(320, 240, 5);
    store.insert(&img, "A").unwrap();
    store.insert(&img, "B").unwrap();

    let thumb_a = store.read("A", Resolution::Thumb).unwrap();
    let len_after_a = store.file_len().unwrap();

    // B aliases A's blob table entry-for-entry, so its thumb was
    // materialized by A's read.
    let thumb_b = store.read("B", Resolution::Thumb).unwrap();
    assert_eq!(store.file_len().unwrap(), len_after_a);
    assert_eq!(thumb_a, thumb_b);
}

#[test]
fn derived_blob_made_before_dedup_is_aliased_in() {
    let (_tmp, mut store) = new_store(4);
    let img = sample_jpeg(320, 240, 5);
    store.insert(&img, "A").unwrap();
    let thumb_a = store.read("A", Resolution::Thumb).unwrap();
    let len = store.file_len().unwrap();

    // The twin inserted after materialization inherits the thumb too.
    store.insert(&img, "B").unwrap();
    let thumb_b = store.read("B", Resolution::Thumb).unwrap();
    assert_eq!(store.file_len().unwrap(), len);
    assert_eq!(thumb_a, thumb_b);
}

#[test]
fn delete_keeps_shared_derived_blobs_readable() {
    let (_tmp, mut store) = new_store(4);
    let img = sample_jpeg(320, 240, 5);
    store.insert(&img, "A").unwrap();
    store.insert(&img, "B").unwrap();
    let thumb_a = store.read("A", Resolution::Thumb).unwrap();

    store.delete("A").unwrap();

    assert_eq!(store.read("B", Resolution::Thumb).unwrap(), thumb_a);
    assert_eq!(store.read("B", Resolution::Orig).unwrap(), img);
}

#[test]
fn distinct_content_not_deduplicated() {
    let (_tmp, mut store) = new_store(4);
    let a = sample_jpeg(320, 240, 1);
    let b = sample_jpeg(320, 240, 2);
    store.insert(&a, "A").unwrap();
    let len = store.file_len().unwrap();

    store.insert(&b, "B").unwrap();
    assert_eq!(store.file_len().unwrap(), len + b.len() as u64);

    assert_eq!(store.read("A", Resolution::Orig).unwrap(), a);
    assert_eq!(store.read("B", Resolution::Orig).unwrap(), b);
}

#[test]
fn orig_read_never_resizes() {
    let (_tmp, mut store) = new_store(4);
    let img = sample_jpeg(320, 240, 5);
    store.insert(&img, "A").unwrap();
    let len = store.file_len().unwrap();

    store.read("A", Resolution::Orig).unwrap();
    assert_eq!(store.file_len().unwrap(), len);
}
