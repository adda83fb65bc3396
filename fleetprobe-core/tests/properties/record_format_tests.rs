//! Property-based tests for the output record format

use chrono::{Local, TimeZone};
use fleetprobe_core::sink::{RECORD_DELIMITER, TIMESTAMP_FORMAT};
use fleetprobe_core::testing::SharedBuffer;
use fleetprobe_core::{OutputSink, RecordHeader};
use proptest::prelude::*;

fn arb_header() -> impl Strategy<Value = RecordHeader> {
    (
        0i64..4_000_000_000,
        "10\\.[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}",
        "[A-Z_]{1,12}",
    )
        .prop_map(|(secs, host, label)| RecordHeader {
            timestamp: Local.timestamp_opt(secs, 0).single().unwrap_or_else(Local::now),
            host,
            label,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn header_fields_in_order(header in arb_header()) {
        let rendered = header.render();
        let fields: Vec<&str> = rendered.split(RECORD_DELIMITER).collect();

        prop_assert_eq!(fields.len(), 4);
        prop_assert_eq!(fields[0], header.timestamp.format(TIMESTAMP_FORMAT).to_string());
        prop_assert_eq!(fields[1], header.host.as_str());
        prop_assert_eq!(fields[2], header.label.as_str());
        prop_assert_eq!(fields[3], "");
    }

    #[test]
    fn timestamp_is_fixed_width(header in arb_header()) {
        let ts = header.timestamp.format(TIMESTAMP_FORMAT).to_string();
        prop_assert_eq!(ts.len(), 21);
        prop_assert!(ts.starts_with('[') && ts.ends_with(']'));
    }

    #[test]
    fn payload_chunks_concatenate_unchanged(
        header in arb_header(),
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..300), 0..8),
    ) {
        let buffer = SharedBuffer::new();
        let sink = OutputSink::new(buffer.clone());

        let mut record = sink.begin_record(&header).unwrap();
        for chunk in &chunks {
            record.write_chunk(chunk).unwrap();
        }
        let written = record.finish().unwrap();

        let payload: Vec<u8> = chunks.concat();
        let mut expected = header.render().into_bytes();
        expected.extend_from_slice(&payload);
        prop_assert_eq!(written, payload.len() as u64);
        prop_assert_eq!(buffer.contents(), expected);
    }
}
