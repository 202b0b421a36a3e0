//! Create/finalize/open round-trips over both store kinds.

use pretty_assertions::assert_eq;
use std::io::Cursor;
use zip_format::{CompressionMethod, DosDateTime};
use zip_storage::{Archive, EntryOptions, ZipError};

#[test]
fn mixed_methods_round_trip_in_memory() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut archive = Archive::create(Cursor::new(Vec::new())).unwrap();

    let text = b"the quick brown fox jumps over the lazy dog".repeat(50);
    archive
        .add_entry_with(
            "compressed.txt",
            &text,
            &EntryOptions {
                method: CompressionMethod::Deflate,
                modified: DosDateTime::from_parts(2021, 7, 4, 8, 15, 30),
                external_attrs: 0o644 << 16,
            },
        )
        .unwrap();
    archive
        .add_entry_with(
            "raw.bin",
            &[0u8, 255, 1, 254, 2],
            &EntryOptions {
                method: CompressionMethod::Stored,
                ..EntryOptions::default()
            },
        )
        .unwrap();
    archive.finalize().unwrap();

    let mut reopened = Archive::open(archive.into_store()).unwrap();
    assert_eq!(reopened.entry_count(), 2);
    assert_eq!(reopened.read_entry_by_name("compressed.txt").unwrap(), text);
    assert_eq!(reopened.read_entry_by_name("raw.bin").unwrap(), &[0u8, 255, 1, 254, 2]);

    let record = reopened.directory().record_at(0).unwrap();
    assert_eq!(record.modified.year(), 2021);
    assert_eq!(record.external_attrs, 0o644 << 16);
}

#[test]
fn file_backed_round_trip() {
    let _ = tracing_subscriber::fmt::try_init();
    let file = tempfile::tempfile().unwrap();
    let mut archive = Archive::create(file).unwrap();
    for i in 0..10 {
        archive
            .add_entry(&format!("files/{i}.dat"), &vec![i as u8; 1000 + i * 111])
            .unwrap();
    }
    archive.finalize().unwrap();

    let mut reopened = Archive::open(archive.into_store()).unwrap();
    assert_eq!(reopened.entry_count(), 10);
    for i in 0..10 {
        assert_eq!(
            reopened.read_entry_by_name(&format!("files/{i}.dat")).unwrap(),
            vec![i as u8; 1000 + i * 111]
        );
    }
}

#[test]
fn corrupted_payload_fails_the_checksum() {
    let mut archive = Archive::create(Cursor::new(Vec::new())).unwrap();
    archive
        .add_entry_with(
            "victim",
            b"these bytes get flipped",
            &EntryOptions {
                method: CompressionMethod::Stored,
                ..EntryOptions::default()
            },
        )
        .unwrap();
    archive.finalize().unwrap();

    let mut bytes = archive.into_store().into_inner();
    // Flip one payload byte, past the 30 + 6 header bytes.
    bytes[40] ^= 0xFF;

    let mut reopened = Archive::open(Cursor::new(bytes)).unwrap();
    assert!(matches!(
        reopened.read_entry(0),
        Err(ZipError::ChecksumMismatch { .. })
    ));
}

#[test]
fn delete_then_finalize_yields_a_well_formed_container() {
    let mut archive = Archive::create(Cursor::new(Vec::new())).unwrap();
    for name in ["a", "b", "c", "d"] {
        archive.add_entry(name, name.repeat(300).as_bytes()).unwrap();
    }
    archive.delete_entries(&["b", "c"]).unwrap();
    archive.finalize().unwrap();

    let mut reopened = Archive::open(archive.into_store()).unwrap();
    assert_eq!(reopened.entry_names().unwrap(), vec!["a", "d"]);
    assert_eq!(reopened.read_entry_by_name("a").unwrap(), "a".repeat(300).as_bytes());
    assert_eq!(reopened.read_entry_by_name("d").unwrap(), "d".repeat(300).as_bytes());
}

#[test]
fn empty_archive_finalizes_and_reopens() {
    let mut archive = Archive::create(Cursor::new(Vec::new())).unwrap();
    archive.finalize().unwrap();

    let reopened = Archive::open(archive.into_store()).unwrap();
    assert_eq!(reopened.entry_count(), 0);
    assert_eq!(reopened.size(), 0);
}
