#![allow(missing_docs, non_snake_case)]

use shared::WalSegmentName;

#[test]
pub fn ParseFileName_Valid_IsCorrect() {
    let segment = WalSegmentName::parse_file_name("000000010000000000000012").unwrap();
    assert_eq!(segment, WalSegmentName::new(1, 0, 0x12));
}

#[test]
pub fn ParseFileName_LowerCase_IsCorrect() {
    let segment = WalSegmentName::parse_file_name("0000000a00000001000000ff").unwrap();
    assert_eq!(segment, WalSegmentName::new(0xA, 1, 0xFF));
}

#[test]
pub fn ParseFileName_WrongLength_IsNone() {
    assert!(WalSegmentName::parse_file_name("").is_none());
    assert!(WalSegmentName::parse_file_name("00000001000000000000001").is_none());
    assert!(WalSegmentName::parse_file_name("0000000100000000000000120").is_none());
}

#[test]
pub fn ParseFileName_NotHex_IsNone() {
    assert!(WalSegmentName::parse_file_name("00000001000000000000001G").is_none());
    assert!(WalSegmentName::parse_file_name("00000002.history").is_none());
    assert!(WalSegmentName::parse_file_name("000000010000000000000002.partial").is_none());
    assert!(WalSegmentName::parse_file_name("+00000010000000000000012").is_none());
}

#[test]
pub fn ParseFileName_NonAscii_IsNone() {
    assert!(WalSegmentName::parse_file_name("0000000100000000000000é").is_none());
}

#[test]
pub fn Display_IsCanonical() {
    let segment = WalSegmentName::new(1, 0, 0xAB);
    assert_eq!(segment.to_string(), "0000000100000000000000AB");
}

#[test]
pub fn Next_Increments() {
    let segment = WalSegmentName::new(1, 0, 4).next();
    assert_eq!(segment, WalSegmentName::new(1, 0, 5));
}

#[test]
pub fn Next_WrapsIntoLogId() {
    let segment = WalSegmentName::new(1, 3, u32::MAX).next();
    assert_eq!(segment, WalSegmentName::new(1, 4, 0));
}

#[test]
pub fn Ordering_IsTimelineLogSegment() {
    let mut segments = vec![
        WalSegmentName::new(2, 0, 0),
        WalSegmentName::new(1, 1, 0),
        WalSegmentName::new(1, 0, 9),
    ];
    segments.sort();
    assert_eq!(
        segments,
        vec![
            WalSegmentName::new(1, 0, 9),
            WalSegmentName::new(1, 1, 0),
            WalSegmentName::new(2, 0, 0),
        ]
    );
}

#[test]
pub fn SegmentNumber_CombinesIds() {
    let segment = WalSegmentName::from_segment_number(1, (5 << 32) + 6);
    assert_eq!(segment, WalSegmentName::new(1, 5, 6));
    assert_eq!(segment.segment_number(), (5 << 32) + 6);
}
