mod common;

use securesecrets::{SecretBytes, SecretError, SecretMemoryStream, MAX_STREAM_LENGTH, MIN_STREAM_CAPACITY};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

#[test]
fn test_basic_stream_operations() {
    common::init_logging();
    let mut stream = SecretMemoryStream::new().unwrap();
    assert_eq!(stream.capacity(), MIN_STREAM_CAPACITY);
    assert!(stream.is_empty());

    let data = b"Hello, secure world!";
    stream.write_all(data).unwrap();
    assert_eq!(stream.len(), data.len());
    assert_eq!(stream.position(), data.len());

    stream.seek(SeekFrom::Start(0)).unwrap();
    let mut buffer = vec![0u8; data.len()];
    stream.read_exact(&mut buffer).unwrap();
    assert_eq!(buffer, data);

    // End of stream
    assert_eq!(stream.read(&mut buffer).unwrap(), 0);
}

#[test]
fn test_capacity_growth() {
    let mut stream = SecretMemoryStream::new().unwrap();
    let mut expected = Vec::new();
    let mut last_capacity = stream.capacity();

    for round in 1..=12usize {
        let chunk: Vec<u8> = (0..round * 97).map(|i| (i % 251) as u8).collect();
        let needed = stream.len() + chunk.len();
        let before = stream.capacity();

        stream.write_all(&chunk).unwrap();
        expected.extend_from_slice(&chunk);

        let after = stream.capacity();
        assert!(after >= last_capacity, "capacity shrank");
        if needed > before {
            assert!(after >= before * 2, "growth {} -> {} did not double", before, after);
        } else {
            assert_eq!(after, before);
        }
        last_capacity = after;
    }

    stream.seek(SeekFrom::Start(0)).unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).unwrap();
    assert_eq!(out, expected);
}

#[test]
fn test_write_past_end_zero_fills_gap() {
    let mut stream = SecretMemoryStream::new().unwrap();
    stream.write_all(b"ab").unwrap();
    stream.set_position(1000).unwrap();
    assert_eq!(stream.len(), 2, "seeking alone must not grow the stream");

    stream.write_all(b"z").unwrap();
    assert_eq!(stream.len(), 1001);

    let bytes = stream.as_slice().unwrap();
    assert_eq!(&bytes[..2], b"ab");
    assert!(bytes[2..1000].iter().all(|&b| b == 0));
    assert_eq!(bytes[1000], b'z');
}

#[test]
fn test_set_len_truncates_and_extends_with_zeros() {
    let mut stream = SecretMemoryStream::new().unwrap();
    stream.write_all(b"0123456789").unwrap();

    stream.set_len(4).unwrap();
    assert_eq!(stream.position(), 4);
    assert_eq!(stream.as_slice().unwrap(), b"0123");

    stream.set_len(8).unwrap();
    assert_eq!(stream.as_slice().unwrap(), b"0123\0\0\0\0");
}

#[test]
fn test_capacity_below_length_is_range_error() {
    let mut stream = SecretMemoryStream::new().unwrap();
    stream.write_all(&[1u8; 100]).unwrap();

    assert!(matches!(stream.set_capacity(99), Err(SecretError::Range(_))));

    stream.set_capacity(100).unwrap();
    assert_eq!(stream.capacity(), 100);
    assert_eq!(stream.as_slice().unwrap(), &[1u8; 100][..]);
}

#[test]
fn test_seek_bounds() {
    let mut stream = SecretMemoryStream::new().unwrap();
    stream.write_all(b"abcdef").unwrap();

    assert_eq!(stream.seek(SeekFrom::End(-2)).unwrap(), 4);
    assert_eq!(stream.seek(SeekFrom::Current(-1)).unwrap(), 3);

    let err = stream.seek(SeekFrom::Current(-10)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(stream.position(), 3);

    assert!(matches!(
        stream.seek_to(SeekFrom::Start(MAX_STREAM_LENGTH as u64 + 1)),
        Err(SecretError::Range(_))
    ));
    assert_eq!(stream.seek_to(SeekFrom::Start(MAX_STREAM_LENGTH as u64)).unwrap(), MAX_STREAM_LENGTH);
    assert!(matches!(stream.write_bytes(b"x"), Err(SecretError::Range(_))));
}

#[test]
fn test_read_only_stream_over_secret() {
    let secret = SecretBytes::from_bytes(b"read me").unwrap();
    let mut stream = SecretMemoryStream::from_secret(secret);

    assert!(!stream.is_writable());
    assert_eq!(stream.len(), 7);
    assert_eq!(stream.capacity(), 7);

    let mut out = String::new();
    stream.read_to_string(&mut out).unwrap();
    assert_eq!(out, "read me");

    assert!(matches!(stream.write_bytes(b"x"), Err(SecretError::ReadOnly)));
    assert!(matches!(stream.set_len(0), Err(SecretError::ReadOnly)));
    assert!(matches!(stream.set_capacity(64), Err(SecretError::ReadOnly)));
    assert_eq!(stream.write(b"x").unwrap_err().kind(), ErrorKind::PermissionDenied);
}

#[test]
fn test_disposed_stream_fails() {
    let mut stream = SecretMemoryStream::new().unwrap();
    stream.write_all(b"data").unwrap();
    stream.dispose();
    stream.dispose();

    assert!(stream.is_disposed());
    assert!(matches!(stream.read_bytes(&mut [0u8; 4]), Err(SecretError::Released(_))));
    assert!(matches!(stream.write_bytes(b"x"), Err(SecretError::Released(_))));
    assert!(matches!(stream.seek_to(SeekFrom::Start(0)), Err(SecretError::Released(_))));
    assert!(matches!(stream.as_slice(), Err(SecretError::Released(_))));
}

#[test]
fn test_short_reads_and_writes() {
    let mut stream = SecretMemoryStream::new().unwrap();
    for byte in b"pin:4321" {
        stream.write_all(&[*byte]).unwrap();
    }
    stream.seek(SeekFrom::Start(4)).unwrap();

    let mut pin = [0u8; 4];
    assert_eq!(stream.read(&mut pin).unwrap(), 4);
    assert_eq!(&pin, b"4321");
}

#[test]
fn test_into_secret() {
    let mut stream = SecretMemoryStream::with_capacity(1024).unwrap();
    stream.write_all(b"handoff").unwrap();

    let secret = stream.into_secret().unwrap();
    assert_eq!(secret.len(), 7);
    assert!(secret.ct_eq(b"handoff").unwrap());
}
