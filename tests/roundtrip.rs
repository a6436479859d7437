use modzip::{ArchiveOptions, DosDateTime, Payload, ZipError, ZipFile};

fn sample_archive() -> Vec<u8> {
    let mut zip = ZipFile::new();
    zip.add_entry("README.md", b"# Demo pack\n".repeat(20), None, None)
        .unwrap();
    zip.add_entry("mods/alpha.jar", (0..=255u8).cycle().take(10_000).collect(), None, None)
        .unwrap();
    zip.add_entry("config/empty.cfg", Vec::new(), Some("left blank"), None)
        .unwrap();
    zip.to_buffer().unwrap()
}

#[test]
fn write_then_read_everything_back() {
    let bytes = sample_archive();
    let mut zip = ZipFile::from_bytes(bytes).unwrap();

    assert_eq!(zip.entry_count(), 3);
    assert_eq!(zip.read_entry("README.md", None).unwrap(), b"# Demo pack\n".repeat(20));
    assert_eq!(
        zip.read_entry("mods/alpha.jar", None).unwrap(),
        (0..=255u8).cycle().take(10_000).collect::<Vec<u8>>()
    );
    assert!(zip.read_entry("config/empty.cfg", None).unwrap().is_empty());

    let empty = zip.get_entry("config/empty.cfg").unwrap().unwrap();
    assert_eq!(empty.method(), 0);
    assert_eq!(empty.comment_str(), "left blank");

    assert!(zip.test(None));
}

#[test]
fn entries_are_written_in_case_insensitive_order() {
    let mut zip = ZipFile::new();
    for name in ["b.txt", "C.txt", "a.txt", "B2.txt"] {
        zip.add_entry(name, name.as_bytes().to_vec(), None, None).unwrap();
    }
    let mut reopened = ZipFile::from_bytes(zip.to_buffer().unwrap()).unwrap();
    let names: Vec<&str> = reopened.entries().unwrap().iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt", "B2.txt", "C.txt"]);
}

#[test]
fn unchanged_entries_are_copied_verbatim() {
    let first = sample_archive();
    let mut zip = ZipFile::from_bytes(first.clone()).unwrap();
    zip.update_entry("README.md", b"rewritten".to_vec()).unwrap();
    let second = zip.to_buffer().unwrap();

    let mut before = ZipFile::from_bytes(first.clone()).unwrap();
    let mut after = ZipFile::from_bytes(second.clone()).unwrap();

    let payload_of = |bytes: &[u8], zip: &mut ZipFile, name: &str| -> Vec<u8> {
        let entry = zip.get_entry(name).unwrap().unwrap();
        assert!(matches!(entry.payload(), Payload::Source { .. }));
        let offset = entry.header().offset() as usize;
        let name_len = u16::from_le_bytes([bytes[offset + 26], bytes[offset + 27]]) as usize;
        let extra_len = u16::from_le_bytes([bytes[offset + 28], bytes[offset + 29]]) as usize;
        let start = offset + 30 + name_len + extra_len;
        bytes[start..start + entry.compressed_size() as usize].to_vec()
    };

    assert_eq!(
        payload_of(&first, &mut before, "mods/alpha.jar"),
        payload_of(&second, &mut after, "mods/alpha.jar")
    );
    assert_eq!(after.read_entry("README.md", None).unwrap(), b"rewritten");
}

#[test]
fn timestamps_survive_a_rewrite() {
    let stamp = DosDateTime::new((43 << 9) | (7 << 5) | 14, (13 << 11) | (45 << 5) | 15);
    let mut zip = ZipFile::new();
    zip.add_entry("dated.txt", b"x".to_vec(), None, None).unwrap();
    zip.archive_mut()
        .entry_mut("dated.txt")
        .unwrap()
        .unwrap()
        .set_time(stamp);

    let mut reopened = ZipFile::from_bytes(zip.to_buffer().unwrap()).unwrap();
    let entry = reopened.get_entry("dated.txt").unwrap().unwrap();
    assert_eq!(entry.time(), stamp);
    assert_eq!(entry.time().to_datetime().unwrap().year(), 2023);
}

#[test]
fn single_byte_corruption_is_a_crc_error() {
    let mut zip = ZipFile::new();
    zip.add_entry("data.txt", b"0123456789abcdef".repeat(64), None, None)
        .unwrap();
    zip.add_entry("other.txt", b"untouched".to_vec(), None, None)
        .unwrap();
    let mut bytes = zip.to_buffer().unwrap();

    let entry = zip.get_entry("data.txt").unwrap().unwrap();
    let start = entry.header().offset() as usize + 30 + "data.txt".len();
    let middle = start + entry.compressed_size() as usize / 2;
    bytes[middle] ^= 0x01;

    let mut corrupted = ZipFile::from_bytes(bytes).unwrap();
    assert!(matches!(
        corrupted.read_entry("data.txt", None),
        Err(ZipError::BadCrc { .. })
    ));
    // other entries are unaffected
    assert_eq!(corrupted.read_entry("other.txt", None).unwrap(), b"untouched");
    assert!(!corrupted.test(None));
}

#[test]
fn archive_and_entry_comments_roundtrip() {
    let mut zip = ZipFile::new();
    zip.add_entry("a.txt", b"a".to_vec(), None, None).unwrap();
    zip.set_entry_comment("a.txt", "entry note").unwrap();
    zip.set_comment("archive note").unwrap();

    let mut reopened = ZipFile::from_bytes(zip.to_buffer().unwrap()).unwrap();
    assert_eq!(reopened.comment(), "archive note");
    assert_eq!(
        reopened.get_entry("a.txt").unwrap().unwrap().comment(),
        b"entry note"
    );

    assert!(matches!(
        reopened.set_comment(&"x".repeat(65_536)),
        Err(ZipError::CommentTooLong(65_536))
    ));
}

#[test]
fn not_a_zip_is_invalid_format() {
    assert!(matches!(
        ZipFile::from_bytes(b"definitely not an archive, just some text".to_vec()),
        Err(ZipError::InvalidFormat(_))
    ));
}

#[test]
fn lazy_and_eager_open_agree() {
    let bytes = sample_archive();
    let lazy = ZipFile::from_bytes(bytes.clone()).unwrap();
    assert!(!lazy.archive().is_loaded());
    assert_eq!(lazy.entry_count(), 3);

    let eager =
        ZipFile::from_bytes_with_options(bytes, ArchiveOptions::default().with_read_entries(true))
            .unwrap();
    assert!(eager.archive().is_loaded());
    assert_eq!(eager.entry_count(), 3);
}

#[test]
fn file_roundtrip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pack.zip");

    let mut zip = ZipFile::new();
    zip.add_entry("manifest.json", br#"{"version":1}"#.to_vec(), None, None)
        .unwrap();
    zip.write_to_path(&path).unwrap();
    assert_eq!(zip.path(), Some(path.as_path()));

    let mut reopened = ZipFile::open(&path).unwrap();
    assert_eq!(reopened.read_entry("manifest.json", None).unwrap(), br#"{"version":1}"#);

    // write over the existing file
    reopened.add_entry("extra.txt", b"more".to_vec(), None, None).unwrap();
    reopened.write_to_path(&path).unwrap();
    assert_eq!(ZipFile::open(&path).unwrap().entry_count(), 2);
}

fn single_entry_archive() -> Vec<u8> {
    let mut zip = ZipFile::new();
    zip.add_entry("data.txt", b"some text to compress".repeat(8), None, None)
        .unwrap();
    zip.to_buffer().unwrap()
}

fn central_header_offset(bytes: &[u8]) -> usize {
    bytes
        .windows(4)
        .position(|w| w == b"PK\x01\x02")
        .expect("central directory header")
}

#[test]
fn unknown_method_is_reported_before_decoding() {
    let mut bytes = single_entry_archive();
    let central = central_header_offset(&bytes);
    bytes[central + 10..central + 12].copy_from_slice(&12u16.to_le_bytes());
    bytes[8..10].copy_from_slice(&12u16.to_le_bytes());

    let mut zip = ZipFile::from_bytes(bytes).unwrap();
    assert_eq!(zip.get_entry("data.txt").unwrap().unwrap().method(), 12);
    match zip.read_entry("data.txt", None) {
        Err(ZipError::UnknownMethod { name, method }) => {
            assert_eq!(name, "data.txt");
            assert_eq!(method, 12);
        }
        other => panic!("unexpected result: {:?}", other.map(|d| d.len())),
    }
    assert!(!zip.test(None));
}

#[test]
fn bad_local_header_signature_is_a_format_error() {
    let mut bytes = single_entry_archive();
    bytes[3] = 0xFF;

    let mut zip = ZipFile::from_bytes(bytes).unwrap();
    let err = zip.read_entry("data.txt", None).unwrap_err();
    assert!(
        matches!(err, ZipError::InvalidLocalHeader { offset: 0, .. }),
        "{:?}",
        err
    );
    assert!(!err.is_content_error());
}
