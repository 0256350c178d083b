//! Unit tests for the binary segment wire format

use bytes::Bytes;
use fluplay_core::segment::{TIMESTAMP_MICROS_OFFSET, TIMESTAMP_SECONDS_OFFSET, TRACK_ID_OFFSET};
use fluplay_core::*;
use tokio_test::{assert_err, assert_ok};

fn frame(track_id: u8, seconds: u32, micros: u32, len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    data[TRACK_ID_OFFSET] = track_id;
    data[TIMESTAMP_SECONDS_OFFSET..TIMESTAMP_SECONDS_OFFSET + 4]
        .copy_from_slice(&seconds.to_be_bytes());
    data[TIMESTAMP_MICROS_OFFSET..TIMESTAMP_MICROS_OFFSET + 4]
        .copy_from_slice(&micros.to_be_bytes());
    Bytes::from(data)
}

#[test]
fn test_parse_track_id_and_timestamp() {
    let segment = assert_ok!(Segment::parse(frame(2, 1_700_000_000, 500_000, 256)));

    assert_eq!(segment.track_id(), 2);
    assert!((segment.timestamp() - 1_700_000_000.5).abs() < 1e-6);
    assert_eq!(segment.data().len(), 256);
}

#[test]
fn test_parse_keeps_payload_untouched() {
    let raw = frame(1, 10, 0, 128);
    let segment = Segment::parse(raw.clone()).unwrap();

    assert_eq!(segment.into_data(), raw);
}

#[test]
fn test_parse_minimum_length() {
    assert_ok!(Segment::parse(frame(1, 1, 1, MIN_SEGMENT_LEN)));

    let short = Bytes::from(vec![0u8; MIN_SEGMENT_LEN - 1]);
    let err = assert_err!(Segment::parse(short));
    match err {
        FluError::SegmentTooShort { expected, actual } => {
            assert_eq!(expected, 100);
            assert_eq!(actual, 99);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_parse_empty_frame() {
    let err = Segment::parse(Bytes::new()).unwrap_err();
    assert_eq!(err.error_code(), "SEGMENT_TOO_SHORT");
}

#[test]
fn test_high_bit_seconds_stay_positive() {
    // Unsigned read: a set top bit must not turn the time negative.
    let segment = Segment::parse(frame(1, 0x8000_0000, 0, 100)).unwrap();
    assert_eq!(segment.timestamp(), 2_147_483_648.0);
}

#[test]
fn test_segment_utc() {
    let segment = Segment::parse(frame(1, 1_700_000_000, 0, 100)).unwrap();
    let utc = segment.utc().unwrap();
    assert_eq!(utc.timestamp(), 1_700_000_000);
}
