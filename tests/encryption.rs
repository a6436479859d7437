use modzip::{FixedRandom, ZipError, ZipFile};
use std::sync::Arc;

const SECRET: &[u8] = b"diamond ore is at -58 below spawn";

fn encrypted_archive() -> Vec<u8> {
    let mut zip = ZipFile::new();
    zip.set_random_source(Arc::new(FixedRandom::new(vec![7, 42, 199, 3])));
    zip.add_encrypted_entry("notes/secret.txt", SECRET.repeat(10), "p@ss")
        .unwrap();
    zip.add_entry("notes/public.txt", b"nothing to see".to_vec(), None, None)
        .unwrap();
    zip.to_buffer().unwrap()
}

#[test]
fn right_password_decrypts() {
    let mut zip = ZipFile::from_bytes(encrypted_archive()).unwrap();
    let entry = zip.get_entry("notes/secret.txt").unwrap().unwrap();
    assert!(entry.is_encrypted());
    assert!(entry.header().is_encrypted());
    // 12-byte encryption header in front of the compressed data
    assert!(entry.compressed_size() >= 12);

    assert_eq!(
        zip.read_entry("notes/secret.txt", Some("p@ss")).unwrap(),
        SECRET.repeat(10)
    );
    // unencrypted neighbours need no password
    assert_eq!(
        zip.read_entry("notes/public.txt", None).unwrap(),
        b"nothing to see"
    );
}

#[test]
fn wrong_password_is_rejected() {
    let mut zip = ZipFile::from_bytes(encrypted_archive()).unwrap();

    let err = zip.read_entry("notes/secret.txt", Some("wrong")).unwrap_err();
    assert!(err.is_content_error());

    // the check byte catches all but roughly 1 in 256 wrong passwords up front;
    // the rest fail the CRC check after decoding
    let mut rejected_up_front = 0;
    for guess in ["wrong", "hunter2", "P@SS", "p@ss ", "letmein", "000000"] {
        match zip.read_entry("notes/secret.txt", Some(guess)) {
            Err(ZipError::WrongPassword(name)) => {
                assert_eq!(name, "notes/secret.txt");
                rejected_up_front += 1;
            }
            Err(ZipError::BadCrc { .. }) => {}
            other => panic!("{} was not rejected: {:?}", guess, other.map(|d| d.len())),
        }
    }
    assert!(rejected_up_front > 0);
}

#[test]
fn missing_password_is_a_parameter_error() {
    let mut zip = ZipFile::from_bytes(encrypted_archive()).unwrap();
    assert!(matches!(
        zip.read_entry("notes/secret.txt", None),
        Err(ZipError::InvalidPasswordParameter(_))
    ));
}

#[test]
fn integrity_test_needs_the_password() {
    let mut zip = ZipFile::from_bytes(encrypted_archive()).unwrap();
    assert!(zip.test(Some("p@ss")));
    assert!(!zip.test(None));
}

#[test]
fn encrypted_entries_survive_unrelated_edits() {
    let mut zip = ZipFile::from_bytes(encrypted_archive()).unwrap();
    zip.add_entry("notes/new.txt", b"added later".to_vec(), None, None)
        .unwrap();
    zip.delete_entry("notes/public.txt").unwrap();

    let mut reopened = ZipFile::from_bytes(zip.to_buffer().unwrap()).unwrap();
    assert_eq!(reopened.entry_count(), 2);
    assert_eq!(
        reopened.read_entry("notes/secret.txt", Some("p@ss")).unwrap(),
        SECRET.repeat(10)
    );
}

#[test]
fn same_salt_same_bytes() {
    assert_eq!(encrypted_archive().len(), encrypted_archive().len());

    let build = || {
        let mut zip = ZipFile::new();
        zip.set_random_source(Arc::new(FixedRandom::new(vec![1, 2, 3])));
        zip.add_encrypted_entry("a.txt", b"abc".to_vec(), "pw").unwrap();
        zip.archive_mut()
            .entry_mut("a.txt")
            .unwrap()
            .unwrap()
            .set_time(modzip::DosDateTime::default());
        zip.to_buffer().unwrap()
    };
    assert_eq!(build(), build());
}

// Written by Info-ZIP `zip -P p@ss` reading stdin: general purpose flag bit 3
// is set, so the password check byte comes from the DOS time, and the entry is
// followed by a Zip64 data descriptor.
const STREAMED: &[u8] = include_bytes!("fixtures/streamed_zipcrypto.zip");
const STREAMED_PAYLOAD: &[u8] = include_bytes!("fixtures/streamed_payload.txt");

#[test]
fn streamed_entry_uses_time_check_byte() {
    let mut zip = ZipFile::from_bytes(STREAMED.to_vec()).unwrap();
    let entry = zip.get_entry("-").unwrap().unwrap();
    assert!(entry.is_encrypted());
    assert!(entry.header().has_data_descriptor());
    assert_eq!(entry.size(), STREAMED_PAYLOAD.len() as u64);

    assert_eq!(zip.read_entry("-", Some("p@ss")).unwrap(), STREAMED_PAYLOAD);
    assert!(matches!(
        zip.read_entry("-", Some("wrong")),
        Err(ZipError::WrongPassword(_))
    ));
    assert!(zip.test(Some("p@ss")));
}

#[test]
fn streamed_entry_survives_a_verbatim_rewrite() {
    let mut zip = ZipFile::from_bytes(STREAMED.to_vec()).unwrap();
    zip.add_entry("readme.txt", b"plain".to_vec(), None, None)
        .unwrap();

    let mut reopened = ZipFile::from_bytes(zip.to_buffer().unwrap()).unwrap();
    assert_eq!(reopened.entry_count(), 2);
    assert!(reopened.get_entry("-").unwrap().unwrap().header().has_data_descriptor());
    assert_eq!(
        reopened.read_entry("-", Some("p@ss")).unwrap(),
        STREAMED_PAYLOAD
    );
    assert_eq!(reopened.read_entry("readme.txt", None).unwrap(), b"plain");
}
