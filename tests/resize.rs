//! Resize engine tests: growth on write, truncate, and cursor handling.

use mapped_file::utils::page_size;
use mapped_file::{MapFlags, MappedFile, MappedFileError, OpenMode, Sharing, Whence};
use std::fs;
use std::path::PathBuf;

fn tmp_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("mapped_file_resize_test_{}_{}", name, std::process::id()));
    p
}

fn rw_create() -> OpenMode {
    OpenMode::read_write().create(true)
}

#[test]
fn write_past_end_grows_to_page_ceiling() {
    let path = tmp_path("grow_on_write");
    let _ = fs::remove_file(&path);
    let page = page_size() as u64;

    let file = MappedFile::create(&path, page, rw_create(), 0o644).expect("create");
    file.seek(0, Whence::End).expect("seek end");
    let payload = vec![0x5A; 10];
    assert_eq!(file.write(&payload).expect("write"), 10);
    assert_eq!(file.size().expect("size"), 2 * page);
    assert_eq!(fs::metadata(&path).expect("stat").len(), 2 * page);

    // Growth covers exactly what is needed, not double.
    let big = vec![0xA5; (page as usize) * 2 + page as usize / 2];
    file.seek(0, Whence::Start).expect("rewind");
    file.write(&big).expect("big write");
    assert_eq!(file.size().expect("size"), 3 * page);

    let mut check = vec![0u8; 10];
    file.read_at(&mut check, page).expect("read back");
    assert!(check.iter().all(|b| *b == 0xA5));

    drop(file);
    let _ = fs::remove_file(&path);
}

#[test]
fn first_write_maps_empty_file() {
    let path = tmp_path("first_write");
    let _ = fs::remove_file(&path);
    let page = page_size() as u64;

    let file = MappedFile::open(&path, rw_create(), 0o644).expect("open");
    assert_eq!(file.size().expect("size"), 0);
    file.write(b"first").expect("write");
    assert_eq!(file.size().expect("size"), page);
    assert_eq!(file.offset().expect("offset"), 5);

    drop(file);
    let _ = fs::remove_file(&path);
}

#[test]
fn write_at_beyond_end_grows_to_cover_range() {
    let path = tmp_path("write_at_grow");
    let _ = fs::remove_file(&path);
    let page = page_size() as u64;

    let file = MappedFile::create(&path, page, rw_create(), 0o644).expect("create");
    file.write_at(b"far", 3 * page + 1).expect("write_at");
    assert_eq!(file.size().expect("size"), 4 * page);
    assert_eq!(file.offset().expect("offset"), 0);

    let mut gap = [0xFFu8; 16];
    file.read_at(&mut gap, 2 * page).expect("gap");
    assert_eq!(gap, [0u8; 16]);
    let mut far = [0u8; 3];
    file.read_at(&mut far, 3 * page + 1).expect("far");
    assert_eq!(&far, b"far");

    drop(file);
    let _ = fs::remove_file(&path);
}

#[test]
fn truncate_aligns_to_pages() {
    let path = tmp_path("truncate_align");
    let _ = fs::remove_file(&path);
    let page = page_size() as u64;

    let file = MappedFile::open(&path, rw_create(), 0o644).expect("open");
    file.truncate(16384).expect("truncate 16k");
    assert_eq!(file.size().expect("size"), 16384_u64.div_ceil(page) * page);

    file.truncate(page + 1).expect("truncate page+1");
    assert_eq!(file.size().expect("size"), 2 * page);
    assert_eq!(fs::metadata(&path).expect("stat").len(), 2 * page);

    file.truncate(1).expect("truncate 1");
    assert_eq!(file.size().expect("size"), page);

    file.close().expect("close");
    let _ = fs::remove_file(&path);
}

#[test]
fn truncate_preserves_surviving_bytes() {
    let path = tmp_path("truncate_keep");
    let _ = fs::remove_file(&path);
    let page = page_size() as u64;

    let file = MappedFile::create(&path, 4 * page, rw_create(), 0o644).expect("create");
    file.write_at(b"keep", 10).expect("write");
    file.truncate(page).expect("shrink");
    file.truncate(8 * page).expect("grow");

    let mut buf = [0u8; 4];
    file.read_at(&mut buf, 10).expect("read");
    assert_eq!(&buf, b"keep");

    drop(file);
    let _ = fs::remove_file(&path);
}

#[test]
fn truncate_zero_unmaps() {
    let path = tmp_path("truncate_zero");
    let _ = fs::remove_file(&path);

    let file = MappedFile::create(&path, 8192, rw_create(), 0o644).expect("create");
    file.truncate(0).expect("truncate 0");
    assert_eq!(file.size().expect("size"), 0);
    assert_eq!(fs::metadata(&path).expect("stat").len(), 0);
    file.sync().expect("sync unmapped");

    // A later write maps again.
    file.seek(0, Whence::Start).expect("rewind");
    file.write(b"again").expect("write");
    assert_eq!(file.size().expect("size"), page_size() as u64);

    drop(file);
    let _ = fs::remove_file(&path);
}

#[test]
fn shrinking_truncate_leaves_cursor_past_end() {
    let path = tmp_path("cursor_after_shrink");
    let _ = fs::remove_file(&path);
    let page = page_size() as u64;

    let file = MappedFile::create(&path, 4 * page, rw_create(), 0o644).expect("create");
    file.seek(3 * page as i64, Whence::Start).expect("seek");
    file.truncate(page).expect("shrink");
    assert_eq!(file.offset().expect("offset"), 3 * page);

    let mut buf = [0u8; 8];
    assert!(matches!(file.read(&mut buf), Err(MappedFileError::EndOfFile { read: 0 })));
    let err = file.write(b"nope").unwrap_err();
    assert!(matches!(err, MappedFileError::OutOfRange { position, size } if position == 3 * page && size == page));
    assert_eq!(file.size().expect("size"), page);

    // Seeking back into range restores normal operation.
    file.seek(0, Whence::End).expect("seek end");
    file.write(b"ok").expect("write");
    assert_eq!(file.offset().expect("offset"), page + 2);

    drop(file);
    let _ = fs::remove_file(&path);
}

#[test]
fn read_write_open_aligns_unaligned_file() {
    let path = tmp_path("align_on_open");
    let _ = fs::remove_file(&path);
    fs::write(&path, b"twelve bytes").expect("seed");

    let ro = MappedFile::open(&path, OpenMode::read_only(), 0o644).expect("open ro");
    assert_eq!(ro.size().expect("size"), 12);
    ro.close().expect("close");

    let rw = MappedFile::open(&path, OpenMode::read_write(), 0o644).expect("open rw");
    assert_eq!(rw.size().expect("size"), page_size() as u64);
    let mut buf = [0u8; 12];
    rw.read(&mut buf).expect("read");
    assert_eq!(&buf, b"twelve bytes");

    drop(rw);
    let _ = fs::remove_file(&path);
}

#[test]
fn private_mapping_cannot_resize() {
    let path = tmp_path("private");
    let _ = fs::remove_file(&path);
    fs::write(&path, vec![b'a'; 4096]).expect("seed");

    let file = MappedFile::builder(&path)
        .mode(OpenMode::read_write())
        .map_flags(MapFlags {
            sharing: Sharing::Private,
            ..MapFlags::default()
        })
        .open()
        .expect("open private");
    let size = file.size().expect("size");

    file.write_at(b"b", 0).expect("private write");
    let mut buf = [0u8; 1];
    file.read_at(&mut buf, 0).expect("read");
    assert_eq!(&buf, b"b");
    assert_eq!(fs::read(&path).expect("file")[0], b'a');

    assert!(matches!(file.truncate(2 * size), Err(MappedFileError::InvalidOperation(_))));
    assert!(matches!(file.write_at(b"x", size), Err(MappedFileError::InvalidOperation(_))));

    drop(file);
    let _ = fs::remove_file(&path);
}

fn private_flags() -> MapFlags {
    MapFlags {
        sharing: Sharing::Private,
        ..MapFlags::default()
    }
}

#[test]
fn private_open_leaves_unaligned_file_length_alone() {
    let path = tmp_path("private_unaligned");
    let _ = fs::remove_file(&path);
    fs::write(&path, b"twelve bytes").expect("seed");

    let file = MappedFile::builder(&path)
        .mode(OpenMode::read_write())
        .map_flags(private_flags())
        .open()
        .expect("open private");
    assert_eq!(file.size().expect("size"), 12);
    assert_eq!(fs::metadata(&path).expect("meta").len(), 12);

    file.write_at(b"TWELVE", 0).expect("private write");
    let mut buf = [0u8; 12];
    file.read_at(&mut buf, 0).expect("read");
    assert_eq!(&buf, b"TWELVE bytes");
    assert!(matches!(file.write_at(b"!", 12), Err(MappedFileError::InvalidOperation(_))));

    drop(file);
    assert_eq!(fs::metadata(&path).expect("meta").len(), 12);
    assert_eq!(fs::read(&path).expect("file"), b"twelve bytes");
    let _ = fs::remove_file(&path);
}

#[test]
fn private_open_rejects_empty_file_and_sizes() {
    let path = tmp_path("private_empty");
    let _ = fs::remove_file(&path);
    fs::write(&path, b"").expect("seed");

    let empty = MappedFile::builder(&path)
        .mode(OpenMode::read_write())
        .map_flags(private_flags())
        .open();
    assert!(matches!(empty, Err(MappedFileError::InvalidOperation(_))));

    let sized = MappedFile::builder(&path)
        .mode(OpenMode::read_write())
        .map_flags(private_flags())
        .size(4096)
        .open();
    assert!(matches!(sized, Err(MappedFileError::InvalidOperation(_))));
    assert_eq!(fs::metadata(&path).expect("meta").len(), 0);

    let _ = fs::remove_file(&path);
}

#[test]
fn populate_flag_maps_normally() {
    let path = tmp_path("populate");
    let _ = fs::remove_file(&path);

    let file = MappedFile::builder(&path)
        .size(8192)
        .map_flags(MapFlags {
            populate: true,
            ..MapFlags::default()
        })
        .open()
        .expect("create populated");
    file.write(b"prefaulted").expect("write");
    file.truncate(3 * 8192).expect("grow");
    let mut buf = [0u8; 10];
    file.read_at(&mut buf, 0).expect("read");
    assert_eq!(&buf, b"prefaulted");

    drop(file);
    let _ = fs::remove_file(&path);
}
