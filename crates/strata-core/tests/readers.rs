// crates/strata-core/tests/readers.rs
// ============================================================================
// Module: Input Reader Tests
// Description: Block layouts and decoding for every supported input format.
// ============================================================================
//! ## Overview
//! Exercises [`FileHandler`] against delimited, fixed-width, Arrow IPC, and
//! SAS7BDAT inputs built in memory: block coverage, header enforcement, and
//! sampling that leaves sequential iteration untouched.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;

use arrow::array::Array;
use arrow::array::Float64Array;
use arrow::array::Int64Array;
use arrow::array::StringArray;
use arrow::datatypes::DataType;
use arrow::datatypes::Field;
use arrow::datatypes::Schema;
use arrow::ipc::writer::FileWriter;
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use strata_core::FileHandler;
use strata_core::InputDatum;
use strata_core::ReaderError;
use strata_core::io::HandlerKind;
use strata_core::io::PreparedInput;
use strata_core::io::reader::CsvOptions;
use strata_core::io::reader::LegacyOptions;
use strata_core::io::sas7bdat::MAGIC;
use strata_core::runtime::Datum;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Wraps bytes as a named in-memory input.
fn datum(name: &str, data: Vec<u8>) -> InputDatum {
    InputDatum::Bytes {
        name: name.to_string(),
        data: Bytes::from(data),
    }
}

/// Comma-separated options with one header row.
fn csv_options(blocksize: u64) -> CsvOptions {
    CsvOptions {
        blocksize,
        delimiter: b"\r\n".to_vec(),
        separator: ",".to_string(),
        header_rows: 1,
        schema: Vec::new(),
    }
}

/// Builds a delimited file with header `a,b,c`.
fn csv_file(rows: &[(u32, u32, u32)]) -> Vec<u8> {
    let mut out = String::from("a,b,c\r\n");
    for (a, b, c) in rows {
        out.push_str(&format!("{a},{b},{c}\r\n"));
    }
    out.into_bytes()
}

/// Drains every block in order.
fn drain(prepared: &mut PreparedInput) -> Vec<strata_core::io::Block> {
    let mut out = Vec::new();
    while let Some(block) = prepared.next_block().unwrap() {
        out.push(block);
    }
    out
}

/// Two-column batch of `n` rows starting at `start`.
fn numbered_batch(start: i64, n: i64) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("label", DataType::Utf8, false),
    ]));
    let ids = Int64Array::from((start .. start + n).collect::<Vec<_>>());
    let labels = StringArray::from((start .. start + n).map(|i| format!("row{i}")).collect::<Vec<_>>());
    RecordBatch::try_new(schema, vec![Arc::new(ids), Arc::new(labels)]).unwrap()
}

// ============================================================================
// SECTION: Delimited Inputs
// ============================================================================

proptest! {
    /// Verifies delimited blocks tile the payload exactly and carry the synthetic header.
    #[test]
    fn csv_blocks_cover_payload(
        rows in prop::collection::vec((any::<u32>(), any::<u32>(), any::<u32>()), 0 .. 60),
        blocksize in 1_u64 .. 256,
    ) {
        let data = csv_file(&rows);
        let size = data.len() as u64;
        let mut handler = FileHandler::with_kind(HandlerKind::Csv(csv_options(blocksize)));
        let mut prepared = handler.prepare(&datum("prop.csv", data.clone())).unwrap();
        let layout = prepared.layout().clone();
        prop_assert_eq!(layout.header_end, 7);
        prop_assert_eq!(layout.payload_bytes, size - layout.header_end);
        let total: u64 = layout.blocks.iter().map(|b| b.1).sum();
        prop_assert_eq!(total + layout.header_end, size);
        let mut expected_offset = layout.header_end;
        for (offset, length) in &layout.blocks {
            prop_assert_eq!(*offset, expected_offset);
            expected_offset += length;
        }
        for block in drain(&mut prepared) {
            let Datum::Raw(raw) = &block.datum else {
                panic!("delimited blocks stay raw");
            };
            prop_assert!(raw.starts_with(b"a,b,c\r\n"));
            let body = &raw[7 ..];
            let start = usize::try_from(block.offset).unwrap();
            let end = start + usize::try_from(block.length).unwrap();
            prop_assert_eq!(body, &data[start .. end]);
            prop_assert!(body.ends_with(b"\r\n"));
        }
    }
}

/// Verifies a second input with different columns is rejected.
#[test]
fn csv_header_mismatch_is_rejected() {
    let mut handler = FileHandler::with_kind(HandlerKind::Csv(csv_options(64)));
    handler.prepare(&datum("first.csv", csv_file(&[(1, 2, 3)]))).unwrap();
    let other = b"a,b,d\r\n1,2,3\r\n".to_vec();
    let err = handler.prepare(&datum("second.csv", other)).unwrap_err();
    assert!(matches!(err, ReaderError::HeaderInvalid(_)), "{err:?}");
    assert_eq!(handler.cached_columns().unwrap(), ["a", "b", "c"]);
}

/// Verifies a user schema with the wrong width fails before any block is read.
#[test]
fn csv_user_schema_must_match_width() {
    let mut opts = csv_options(64);
    opts.schema = vec!["x".to_string(), "y".to_string()];
    let mut handler = FileHandler::with_kind(HandlerKind::Csv(opts));
    let err = handler.prepare(&datum("bad.csv", csv_file(&[(1, 2, 3)]))).unwrap_err();
    assert!(matches!(err, ReaderError::SchemaMismatch(_)), "{err:?}");
}

/// Verifies headerless files get positional column names and no header bytes.
#[test]
fn csv_without_header_rows_names_columns() {
    let mut opts = csv_options(1024);
    opts.header_rows = 0;
    let mut handler = FileHandler::with_kind(HandlerKind::Csv(opts));
    let mut prepared = handler.prepare(&datum("raw.csv", b"1,2\r\n3,4\r\n".to_vec())).unwrap();
    assert_eq!(prepared.layout().header_end, 0);
    assert_eq!(prepared.layout().columns, ["f0", "f1"]);
    let blocks = drain(&mut prepared);
    assert_eq!(blocks.len(), 1);
    let Datum::Raw(raw) = &blocks[0].datum else {
        panic!("delimited blocks stay raw");
    };
    assert_eq!(&raw[..], b"f0,f1\r\n1,2\r\n3,4\r\n");
}

/// Verifies an empty input yields no blocks and does not fix the header.
#[test]
fn csv_empty_input_has_no_blocks() {
    let mut handler = FileHandler::with_kind(HandlerKind::Csv(csv_options(64)));
    let mut prepared = handler.prepare(&datum("empty.csv", Vec::new())).unwrap();
    assert_eq!(prepared.num_blocks(), 0);
    assert!(prepared.next_block().unwrap().is_none());
    assert!(handler.cached_columns().is_none());
}

/// Verifies sampling leaves the sequential cursor where it was.
#[test]
fn sample_restores_cursor() {
    let rows: Vec<(u32, u32, u32)> = (0 .. 40).map(|i| (i, i * 2, i * 3)).collect();
    let mut handler = FileHandler::with_kind(HandlerKind::Csv(csv_options(32)));
    let mut prepared = handler.prepare(&datum("sample.csv", csv_file(&rows))).unwrap();
    assert!(prepared.num_blocks() > 4);
    let first = prepared.next_block().unwrap().unwrap();
    assert_eq!(first.seq, 0);
    let mut rng = StdRng::seed_from_u64(7);
    let sampled = prepared.sample(3, &mut rng).unwrap();
    assert_eq!(sampled.len(), 3);
    let mut seqs: Vec<u64> = sampled.iter().map(|b| b.seq).collect();
    seqs.sort_unstable();
    seqs.dedup();
    assert_eq!(seqs.len(), 3);
    let second = prepared.next_block().unwrap().unwrap();
    assert_eq!(second.seq, 1);
    assert_eq!(second.offset, first.offset + first.length);
    let oversized = prepared.sample(1000, &mut rng).unwrap();
    assert_eq!(oversized.len(), prepared.num_blocks());
}

// ============================================================================
// SECTION: Fixed-Width Inputs
// ============================================================================

proptest! {
    /// Verifies fixed-width blocks start after the header and stop at the footer.
    #[test]
    fn legacy_blocks_respect_header_and_footer(
        header in 0_u64 .. 64,
        footer in 0_u64 .. 64,
        records in 1_u64 .. 200,
        per_block in 1_u64 .. 32,
    ) {
        let record_size = 10_u64;
        let size = header + records * record_size + footer;
        let data = vec![b'x'; usize::try_from(size).unwrap()];
        let mut handler = FileHandler::with_kind(HandlerKind::Legacy(LegacyOptions {
            header_size: header,
            footer_size: footer,
            records_per_block: per_block,
            columns: vec!["a".to_string(), "b".to_string()],
            record_size,
        }));
        let prepared = handler.prepare(&datum("prop.dat", data)).unwrap();
        let blocks = &prepared.layout().blocks;
        let first = blocks.first().unwrap();
        let last = blocks.last().unwrap();
        prop_assert_eq!(first.0, header);
        prop_assert_eq!(last.0 + last.1 + footer, size);
        prop_assert!(blocks.iter().all(|b| b.1 % record_size == 0));
        prop_assert_eq!(blocks.len() as u64, records.div_ceil(per_block));
    }
}

/// Verifies a payload with a partial record is rejected.
#[test]
fn legacy_partial_record_is_rejected() {
    let mut handler = FileHandler::with_kind(HandlerKind::Legacy(LegacyOptions {
        header_size: 4,
        footer_size: 4,
        records_per_block: 2,
        columns: vec!["a".to_string()],
        record_size: 10,
    }));
    let err = handler.prepare(&datum("short.dat", vec![0; 4 + 15 + 4])).unwrap_err();
    assert!(matches!(err, ReaderError::Format(_)), "{err:?}");
}

// ============================================================================
// SECTION: Arrow IPC Inputs
// ============================================================================

/// Verifies IPC file batches are located through the footer and decoded in order.
#[test]
fn ipc_file_blocks_are_batches() {
    let batches = [numbered_batch(0, 5), numbered_batch(5, 3), numbered_batch(8, 4)];
    let mut writer = FileWriter::try_new(Vec::new(), &batches[0].schema()).unwrap();
    for batch in &batches {
        writer.write(batch).unwrap();
    }
    writer.finish().unwrap();
    let data = writer.into_inner().unwrap();
    let size = data.len() as u64;

    let mut handler = FileHandler::with_kind(HandlerKind::Ipc {
        stream: false,
    });
    let mut prepared = handler.prepare(&datum("input.arrow", data)).unwrap();
    let layout = prepared.layout().clone();
    assert_eq!(layout.columns, ["id", "label"]);
    assert_eq!(layout.blocks.len(), 3);
    assert!(layout.header_end > 0);
    assert!(layout.blocks.iter().all(|(offset, len)| offset + len < size));
    let decoded = drain(&mut prepared);
    let rows: Vec<usize> = decoded.iter().map(|b| b.datum.as_batch().unwrap().num_rows()).collect();
    assert_eq!(rows, [5, 3, 4]);
    let last = decoded[2].datum.as_batch().unwrap();
    let ids = last.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
    assert_eq!(ids.value(3), 11);
}

/// Verifies IPC streams decode up front and report in-memory block sizes.
#[test]
fn ipc_stream_blocks_are_batches() {
    let batches = [numbered_batch(0, 2), numbered_batch(2, 2)];
    let mut writer = StreamWriter::try_new(Vec::new(), &batches[0].schema()).unwrap();
    for batch in &batches {
        writer.write(batch).unwrap();
    }
    writer.finish().unwrap();
    let data = writer.into_inner().unwrap();

    let mut handler = FileHandler::with_kind(HandlerKind::Ipc {
        stream: true,
    });
    let mut prepared = handler.prepare(&datum("input.arrows", data)).unwrap();
    assert_eq!(prepared.num_blocks(), 2);
    assert_eq!(prepared.layout().header_end, 0);
    let decoded = drain(&mut prepared);
    assert_eq!(decoded[1].datum.as_batch().unwrap(), &batches[1]);
    assert_eq!(decoded[1].offset, decoded[0].length);
}

// ============================================================================
// SECTION: SAS7BDAT Inputs
// ============================================================================

/// Writes a little-endian `u16` at `offset`.
fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset .. offset + 2].copy_from_slice(&value.to_le_bytes());
}

/// Writes a little-endian `u32` at `offset`.
fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset .. offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Builds a minimal 32-bit little-endian SAS7BDAT file with one meta page and
/// one data page holding columns `amount` (numeric) and `label` (text).
fn sas_file(rows: &[(Option<f64>, &str)]) -> Vec<u8> {
    const HEADER: usize = 1024;
    const PAGE: usize = 1024;
    let mut file = vec![0_u8; HEADER + 2 * PAGE];
    file[.. 32].copy_from_slice(&MAGIC);
    file[37] = 0x01;
    put_u32(&mut file, 196, 1024);
    put_u32(&mut file, 200, 1024);
    put_u32(&mut file, 204, 2);

    let meta = &mut file[HEADER .. HEADER + PAGE];
    put_u16(meta, 16, 0x0000);
    put_u16(meta, 18, 4);
    put_u16(meta, 20, 4);
    let pointers = [(200_u32, 64_u32), (300, 20), (400, 36), (500, 44)];
    for (i, (offset, len)) in pointers.iter().enumerate() {
        let base = 24 + i * 12;
        put_u32(meta, base, *offset);
        put_u32(meta, base + 4, *len);
    }
    // Row size: 16-byte rows.
    put_u32(meta, 200, 0xF7F7_F7F7);
    put_u32(meta, 220, 16);
    put_u32(meta, 224, u32::try_from(rows.len()).unwrap());
    // Column text blob.
    put_u32(meta, 300, 0xFFFF_FFFD);
    meta[304 .. 320].copy_from_slice(b"amountlabel     ");
    // Column names referencing the blob.
    put_u32(meta, 400, 0xFFFF_FFFF);
    for (i, (off, len)) in [(0_u16, 6_u16), (6, 5)].iter().enumerate() {
        let base = 412 + 8 * i;
        put_u16(meta, base, 0);
        put_u16(meta, base + 2, *off);
        put_u16(meta, base + 4, *len);
    }
    // Column attributes.
    put_u32(meta, 500, 0xFFFF_FFFC);
    for (i, (data_offset, kind)) in [(0_u32, 1_u8), (8, 2)].iter().enumerate() {
        let base = 512 + 12 * i;
        put_u32(meta, base, *data_offset);
        put_u32(meta, base + 4, 8);
        meta[base + 10] = *kind;
    }

    let data = &mut file[HEADER + PAGE ..];
    put_u16(data, 16, 0x0100);
    put_u16(data, 18, u16::try_from(rows.len()).unwrap());
    for (i, (amount, label)) in rows.iter().enumerate() {
        let base = 24 + 16 * i;
        let value = amount.unwrap_or(f64::NAN);
        data[base .. base + 8].copy_from_slice(&value.to_le_bytes());
        let mut text = [b' '; 8];
        text[.. label.len()].copy_from_slice(label.as_bytes());
        data[base + 8 .. base + 16].copy_from_slice(&text);
    }
    file
}

/// Verifies SAS rows decode into fixed-size batches with nulls for missing values.
#[test]
fn sas_rows_decode_into_batches() {
    let data = sas_file(&[(Some(1.5), "alpha"), (Some(-2.0), "beta"), (None, "gamma")]);
    let mut handler = FileHandler::with_kind(HandlerKind::Sas {
        rows_per_batch: 2,
    });
    let mut prepared = handler.prepare(&datum("input.sas7bdat", data)).unwrap();
    assert_eq!(prepared.layout().columns, ["amount", "label"]);
    assert_eq!(prepared.layout().blocks, [(2048 + 24, 32), (2048 + 56, 16)]);
    let decoded = drain(&mut prepared);
    assert_eq!(decoded.len(), 2);
    let tail = decoded[1].datum.as_batch().unwrap();
    let amounts = tail.column(0).as_any().downcast_ref::<Float64Array>().unwrap();
    let labels = tail.column(1).as_any().downcast_ref::<StringArray>().unwrap();
    assert!(amounts.is_null(0));
    assert_eq!(labels.value(0), "gamma");
    let head = decoded[0].datum.as_batch().unwrap();
    let amounts = head.column(0).as_any().downcast_ref::<Float64Array>().unwrap();
    assert!((amounts.value(1) + 2.0).abs() < f64::EPSILON);
}

/// Verifies inputs without the SAS magic number are rejected.
#[test]
fn sas_bad_magic_is_rejected() {
    let mut data = sas_file(&[(Some(1.0), "a")]);
    data[12] = 0;
    let mut handler = FileHandler::with_kind(HandlerKind::Sas {
        rows_per_batch: 10,
    });
    let err = handler.prepare(&datum("bad.sas7bdat", data)).unwrap_err();
    assert!(matches!(err, ReaderError::Format(_)), "{err:?}");
}
