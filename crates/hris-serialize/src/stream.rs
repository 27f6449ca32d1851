// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Multi-record streams.
//!
//! A stream is a sequence of records, each one header line followed by its
//! payload. Binary payloads are exactly `objSize` bytes long; text payloads
//! run up to the next header line or the end of the stream.

use std::io::{BufRead, Read, Write};

use tracing::{debug, warn};

use crate::error::{Error, ParseError, Result};
use crate::format::Codec;
use crate::header::{next_header_line, StreamHeader, MAX_HEADER_LEN, PREAMBLE};
use crate::registry::Instance;
use crate::schema::Schema;
use crate::value::Value;

/// One undecoded record.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub header: StreamHeader,
    pub payload: Vec<u8>,
    /// Byte offset of the header line in the stream
    pub offset: u64,
}

impl RawRecord {
    /// Decode the payload with the codec named by the header.
    pub fn decode(&self, schema: &Schema) -> std::result::Result<Value, ParseError> {
        let codec = self.header.format.codec(&self.header.options)?;
        codec.decode(&self.header.data_name, schema, &self.payload)
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Writes records to any [`Write`].
///
/// Each record is encoded completely before the first byte of it is
/// written, so a failing encode never leaves a partial record behind.
#[derive(Debug)]
pub struct StreamWriter<W: Write> {
    inner: W,
    records: usize,
    bytes: u64,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            records: 0,
            bytes: 0,
        }
    }

    /// Write a header and its payload. The header's length is set from the
    /// payload.
    pub fn write_raw(&mut self, mut header: StreamHeader, payload: &[u8]) -> Result<()> {
        header.payload_len = payload.len() as u64;
        let line = header.to_line()?;
        let mut record = Vec::with_capacity(line.len() + payload.len());
        record.extend_from_slice(line.as_bytes());
        record.extend_from_slice(payload);
        self.inner.write_all(&record)?;
        self.records += 1;
        self.bytes += record.len() as u64;
        Ok(())
    }

    /// Encode `value` with `codec` and write it as one record.
    pub fn write_value(
        &mut self,
        schema: &Schema,
        data_name: &str,
        codec: &dyn Codec,
        value: &Value,
    ) -> Result<()> {
        let header = StreamHeader::new(schema.name.as_str(), codec.format(), 0)
            .with_data_name(data_name)
            .with_options(codec.options());
        header.validate()?;
        let payload = codec.encode(data_name, schema, value)?;
        self.write_raw(header, &payload)
    }

    /// Serialize an object and write it as one record.
    pub fn write_instance(&mut self, instance: &Instance, data_name: &str, codec: &dyn Codec) -> Result<()> {
        let value = instance.to_value()?;
        self.write_value(instance.schema(), data_name, codec, &value)
    }

    /// Records written so far.
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// A header line read ahead of its record.
#[derive(Debug)]
struct Pending {
    line: Vec<u8>,
    offset: u64,
    terminated: bool,
}

impl Pending {
    fn parse(&self) -> std::result::Result<StreamHeader, ParseError> {
        if !self.terminated {
            return Err(ParseError::MalformedHeader("unterminated header line".to_string()));
        }
        let text = std::str::from_utf8(&self.line)
            .map_err(|_| ParseError::MalformedHeader("header line is not UTF-8".to_string()))?;
        StreamHeader::parse_line(text)
    }
}

/// Reads records sequentially from any [`BufRead`].
#[derive(Debug)]
pub struct StreamReader<R: BufRead> {
    inner: R,
    offset: u64,
    pending: Option<Pending>,
    records: usize,
    max_records: Option<usize>,
}

impl<R: BufRead> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            pending: None,
            records: 0,
            max_records: None,
        }
    }

    /// Stop after `max` records.
    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = Some(max);
        self
    }

    /// Records returned so far.
    pub fn records_read(&self) -> usize {
        self.records
    }

    /// Bytes consumed from the underlying reader.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Header of the next record, without consuming it.
    pub fn peek_header(&mut self) -> Result<Option<StreamHeader>> {
        if self.limit_reached() || !self.fill_pending()? {
            return Ok(None);
        }
        match &self.pending {
            Some(pending) => pending
                .parse()
                .map(Some)
                .map_err(|e| Error::from(e).in_record(self.records, pending.offset)),
            None => Ok(None),
        }
    }

    /// Next record, or `None` at the end of the stream.
    pub fn next_raw(&mut self) -> Result<Option<RawRecord>> {
        if self.limit_reached() || !self.fill_pending()? {
            return Ok(None);
        }
        let Some(pending) = self.pending.take() else {
            return Ok(None);
        };
        let index = self.records;
        let offset = pending.offset;
        let header = pending
            .parse()
            .map_err(|e| Error::from(e).in_record(index, offset))?;
        let payload = if header.format.is_text() {
            self.read_text_payload(&header)
        } else {
            self.read_binary_payload(&header)
        }
        .map_err(|e| e.in_record(index, offset))?;

        debug!(index, offset, header = %header, "record read");
        self.records += 1;
        Ok(Some(RawRecord {
            header,
            payload,
            offset,
        }))
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn limit_reached(&self) -> bool {
        self.max_records.is_some_and(|max| self.records >= max)
    }

    fn fill_pending(&mut self) -> Result<bool> {
        if self.pending.is_some() {
            return Ok(true);
        }
        let start = self.offset;
        let line = next_header_line(&mut self.inner).map_err(|e| e.in_record(self.records, start))?;
        match line {
            Some(line) => {
                self.offset += line.skipped + line.len;
                self.pending = Some(Pending {
                    line: line.text.into_bytes(),
                    offset: start + line.skipped,
                    terminated: true,
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn read_binary_payload(&mut self, header: &StreamHeader) -> Result<Vec<u8>> {
        let declared = header.payload_len;
        let mut payload = Vec::with_capacity(declared.min(1 << 20) as usize);
        let read = self.inner.by_ref().take(declared).read_to_end(&mut payload)?;
        self.offset += read as u64;
        if (read as u64) < declared {
            return Err(ParseError::Truncated {
                declared,
                available: read as u64,
            }
            .into());
        }
        Ok(payload)
    }

    fn read_text_payload(&mut self, header: &StreamHeader) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        loop {
            let start = self.offset;
            let mut line = Vec::new();
            let limit = (MAX_HEADER_LEN + 2) as u64;
            let n = self.inner.by_ref().take(limit).read_until(b'\n', &mut line)?;
            if n == 0 {
                break;
            }
            self.offset += n as u64;
            let terminated = line.last() == Some(&b'\n');
            let cut = !terminated && n as u64 == limit;
            if line.starts_with(PREAMBLE.as_bytes()) {
                if cut {
                    return Err(ParseError::MalformedHeader(format!(
                        "header line exceeds {MAX_HEADER_LEN} bytes"
                    ))
                    .into());
                }
                while matches!(line.last(), Some(b'\n' | b'\r')) {
                    line.pop();
                }
                self.pending = Some(Pending {
                    line,
                    offset: start,
                    terminated,
                });
                break;
            }
            if cut {
                // Only header lines are bounded; finish the payload line.
                let rest = self.inner.read_until(b'\n', &mut line)?;
                self.offset += rest as u64;
            }
            payload.extend_from_slice(&line);
        }
        if payload.len() as u64 != header.payload_len {
            warn!(
                declared = header.payload_len,
                found = payload.len(),
                "{} payload length differs from its header",
                header.format
            );
        }
        Ok(payload)
    }
}

impl<R: BufRead> Iterator for StreamReader<R> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_raw().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{AsciiCodec, BinaryCodec, Format, JsonCodec};
    use crate::schema::{PrimitiveKind, SchemaBuilder};
    use std::io::Cursor;

    fn schema() -> Schema {
        SchemaBuilder::new("Sample")
            .field("id", PrimitiveKind::U32)
            .sequence_field("values", PrimitiveKind::F32)
            .build()
    }

    fn value(id: u32) -> Value {
        Value::structure([
            ("id", Value::U32(id)),
            ("values", Value::Sequence(vec![Value::F32(id as f32 * 0.5)])),
        ])
    }

    fn stream_of(codec: &dyn Codec, count: u32) -> Vec<u8> {
        let mut writer = StreamWriter::new(Vec::new());
        for id in 0..count {
            writer.write_value(&schema(), "sample", codec, &value(id)).expect("write");
        }
        assert_eq!(writer.records(), count as usize);
        assert_eq!(writer.bytes_written(), writer.get_ref().len() as u64);
        writer.into_inner()
    }

    #[test]
    fn test_multi_record_round_trip_per_format() {
        let codecs: [Box<dyn Codec>; 3] = [
            Box::new(BinaryCodec::default()),
            Box::new(AsciiCodec::default()),
            Box::new(JsonCodec),
        ];
        for codec in &codecs {
            let bytes = stream_of(codec.as_ref(), 3);
            let reader = StreamReader::new(Cursor::new(bytes));
            let records: Vec<RawRecord> = reader.collect::<Result<_>>().expect("records");
            assert_eq!(records.len(), 3, "{}", codec.format());
            for (id, record) in records.iter().enumerate() {
                assert_eq!(record.header.format, codec.format());
                assert_eq!(record.header.data_name, "sample");
                assert_eq!(record.header.payload_len, record.payload.len() as u64);
                assert_eq!(record.decode(&schema()).expect("decode"), value(id as u32));
            }
            assert_eq!(records[0].offset, 0);
            assert!(records[1].offset > records[0].offset);
        }
    }

    #[test]
    fn test_max_records_and_peek() {
        let bytes = stream_of(&JsonCodec, 4);
        let mut reader = StreamReader::new(Cursor::new(bytes)).with_max_records(2);
        let peeked = reader.peek_header().expect("peek").expect("header");
        assert_eq!(peeked.type_name, "Sample");
        let first = reader.next_raw().expect("read").expect("record");
        assert_eq!(first.header, peeked);
        assert!(reader.next_raw().expect("read").is_some());
        assert!(reader.next_raw().expect("read").is_none());
        assert!(reader.peek_header().expect("peek").is_none());
        assert_eq!(reader.records_read(), 2);
    }

    #[test]
    fn test_every_truncation_of_a_binary_stream_fails() {
        let bytes = stream_of(&BinaryCodec::default(), 1);
        for cut in 1..bytes.len() {
            let mut reader = StreamReader::new(Cursor::new(&bytes[..cut]));
            let outcome = reader
                .next_raw()
                .and_then(|record| match record {
                    Some(record) => record.decode(&schema()).map_err(Error::from).map(|_| ()),
                    None => Ok(()),
                });
            let err = outcome.expect_err(&format!("cut at {cut} must fail"));
            assert!(err.as_parse_error().is_some(), "cut at {cut}: {err}");
        }
    }

    #[test]
    fn test_truncated_payload_reports_lengths_and_position() {
        let mut bytes = stream_of(&BinaryCodec::default(), 2);
        bytes.truncate(bytes.len() - 3);
        let mut reader = StreamReader::new(Cursor::new(bytes));
        assert!(reader.next_raw().expect("first").is_some());
        let err = reader.next_raw().expect_err("second is short");
        match &err {
            Error::Record { index, offset, .. } => {
                assert_eq!(*index, 1);
                assert!(*offset > 0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            err.as_parse_error(),
            Some(ParseError::Truncated { .. })
        ));
    }

    #[test]
    fn test_garbage_is_bad_magic() {
        let mut reader = StreamReader::new(Cursor::new(b"hello world\n".to_vec()));
        let err = reader.next_raw().expect_err("bad magic");
        assert!(matches!(err.as_parse_error(), Some(ParseError::BadMagic)));
    }

    #[test]
    fn test_text_payload_length_mismatch_is_tolerated() {
        let payload = b"{\"Sample\": {\"id\": 9, \"values\": []}}\n";
        let header = StreamHeader::new("Sample", Format::Json, 3);
        let mut bytes = header.to_line().expect("line").into_bytes();
        bytes.extend_from_slice(payload);
        let mut reader = StreamReader::new(Cursor::new(bytes));
        let record = reader.next_raw().expect("read").expect("record");
        assert_eq!(record.payload, payload);
        assert_eq!(
            record.decode(&schema()).expect("decode").field("id"),
            Some(&Value::U32(9))
        );
    }

    #[test]
    fn test_partial_trailing_header_is_malformed() {
        let mut bytes = stream_of(&AsciiCodec::default(), 1);
        bytes.extend_from_slice(b"HRIS-2.0 type = 'Sam");
        let mut reader = StreamReader::new(Cursor::new(bytes));
        assert!(reader.next_raw().expect("first").is_some());
        let err = reader.next_raw().expect_err("partial header");
        assert!(err
            .as_parse_error()
            .map(ParseError::is_header_error)
            .unwrap_or(false));
    }

    #[test]
    fn test_non_identifier_data_name_is_rejected_before_writing() {
        let mut writer = StreamWriter::new(Vec::new());
        for name in ["HRIS-x", "a{b", "n=1", "9lives"] {
            let err = writer
                .write_value(&schema(), name, &AsciiCodec::default(), &value(1))
                .expect_err("unreadable name");
            assert!(err.as_parse_error().is_some(), "{name}");
        }
        assert_eq!(writer.records(), 0);
        assert!(writer.get_ref().is_empty());
    }

    #[test]
    fn test_identifier_data_name_reads_back_from_ascii() {
        let mut writer = StreamWriter::new(Vec::new());
        writer
            .write_value(&schema(), "block_2", &AsciiCodec::default(), &value(4))
            .expect("write");
        let mut reader = StreamReader::new(Cursor::new(writer.into_inner()));
        let record = reader.next_raw().expect("read").expect("record");
        assert_eq!(record.header.data_name, "block_2");
        assert_eq!(record.decode(&schema()).expect("decode"), value(4));
        assert!(reader.next_raw().expect("end").is_none());
    }

    #[test]
    fn test_oversized_look_ahead_header_is_malformed() {
        let mut bytes = stream_of(&AsciiCodec::default(), 1);
        bytes.extend_from_slice(b"HRIS-2.0 type = '");
        bytes.extend(std::iter::repeat(b'x').take(MAX_HEADER_LEN * 2));
        let mut reader = StreamReader::new(Cursor::new(bytes));
        let err = reader.next_raw().expect_err("oversized header");
        assert!(err.to_string().contains("exceeds"), "{err}");
    }

    #[test]
    fn test_long_text_payload_line_is_kept_whole() {
        let mut payload = b"{\"Sample\": {\"id\": 7, \"values\": [1.5]}".to_vec();
        payload.extend(std::iter::repeat(b' ').take(MAX_HEADER_LEN * 2));
        payload.extend_from_slice(b"}\n");
        let header = StreamHeader::new("Sample", Format::Json, payload.len() as u64);
        let mut bytes = header.to_line().expect("line").into_bytes();
        bytes.extend_from_slice(&payload);
        let mut reader = StreamReader::new(Cursor::new(bytes));
        let record = reader.next_raw().expect("read").expect("record");
        assert_eq!(record.payload, payload);
        assert_eq!(
            record.decode(&schema()).expect("decode").field("id"),
            Some(&Value::U32(7))
        );
    }
}
