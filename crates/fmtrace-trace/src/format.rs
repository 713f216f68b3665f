//! Trace record schema and the line parser.
//!
//! A data line carries five positional `key:value` fields joined by `::`:
//!
//! ```text
//! path:<path>::ref:<reference>::data:[<b>, <b>, ...]::size:<decimal>::op:<hex>
//! ```
//!
//! Keys are informational; only position matters. A value runs from the
//! first `:` of its field up to the next one, so `path:a:b` has value `a`.
//! Lines starting with [`HEADER_MARKER`] are section headers and parse to
//! [`ParsedLine::Skip`].

use fmtrace_core::ParseError;
use std::fmt;

/// Prefix of header lines that carry no record.
pub const HEADER_MARKER: &str = "sector";

/// Separator between fields.
pub const FIELD_DELIMITER: &str = "::";

/// Separator between a field's key and its value.
pub const KEY_VALUE_DELIMITER: char = ':';

/// Number of fields in a data line.
pub const FIELD_COUNT: usize = 5;

/// Separator between payload tokens inside the brackets.
const PAYLOAD_DELIMITER: &str = ", ";

/// One opcode execution as recorded by the decompiler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceRecord {
    /// Logical source path of the record.
    pub path: String,
    /// Operation code.
    pub opcode: u16,
    /// Chunk identifier; usually decimal text, not always.
    pub reference: String,
    /// Raw payload tokens as written between the brackets.
    pub payload: Vec<String>,
    /// Numeric payload tokens as bytes; other tokens are dropped.
    pub payload_bytes: Vec<u8>,
    /// Size field as recorded.
    pub declared_size: u64,
}

impl TraceRecord {
    /// Record whose raw payload is exactly `payload_bytes`.
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        opcode: u16,
        reference: impl Into<String>,
        payload_bytes: Vec<u8>,
        declared_size: u64,
    ) -> Self {
        Self {
            path: path.into(),
            opcode,
            reference: reference.into(),
            payload: payload_bytes.iter().map(ToString::to_string).collect(),
            payload_bytes,
            declared_size,
        }
    }
}

impl fmt::Display for TraceRecord {
    /// Render in the line form accepted by [`parse_line`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "path:{}::ref:{}::data:[{}]::size:{}::op:{:x}",
            self.path,
            self.reference,
            self.payload.join(PAYLOAD_DELIMITER),
            self.declared_size,
            self.opcode
        )
    }
}

/// Outcome of parsing one line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedLine {
    /// A data record.
    Record(TraceRecord),
    /// A header line; not data.
    Skip,
}

/// Parse one trace line (a trailing `\n` or `\r\n` is ignored).
///
/// # Errors
/// [`ParseError`] if the line has the wrong number of fields, a field without
/// a key separator, a non-numeric size or opcode, or a payload number above 255.
pub fn parse_line(line: &str) -> Result<ParsedLine, ParseError> {
    if line.starts_with(HEADER_MARKER) {
        return Ok(ParsedLine::Skip);
    }
    let line = line
        .strip_suffix('\n')
        .map_or(line, |l| l.strip_suffix('\r').unwrap_or(l));

    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if fields.len() != FIELD_COUNT {
        return Err(ParseError::FieldCount {
            expected: FIELD_COUNT,
            found: fields.len(),
        });
    }

    let mut values = [""; FIELD_COUNT];
    for (index, field) in fields.iter().enumerate() {
        values[index] = field
            .split(KEY_VALUE_DELIMITER)
            .nth(1)
            .ok_or(ParseError::MissingSeparator { index })?;
    }
    let [path, reference, payload, size, opcode] = values;

    let payload = parse_payload_tokens(payload);
    let payload_bytes = payload_bytes(&payload)?;

    Ok(ParsedLine::Record(TraceRecord {
        path: path.to_owned(),
        opcode: parse_opcode(opcode)?,
        reference: reference.to_owned(),
        payload,
        payload_bytes,
        declared_size: size
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidSize(size.to_owned()))?,
    }))
}

/// Split `[a, b, c]` into its raw tokens.
fn parse_payload_tokens(text: &str) -> Vec<String> {
    text.trim_start_matches('[')
        .trim_end_matches(']')
        .split(PAYLOAD_DELIMITER)
        .map(str::to_owned)
        .collect()
}

/// Keep purely numeric tokens and narrow each to a byte.
fn payload_bytes(tokens: &[String]) -> Result<Vec<u8>, ParseError> {
    tokens
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()))
        .map(|t| t.parse::<u8>().map_err(|_| ParseError::ByteOutOfRange(t.to_owned())))
        .collect()
}

fn parse_opcode(text: &str) -> Result<u16, ParseError> {
    let t = text.trim();
    let digits = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .unwrap_or(t);
    u16::from_str_radix(digits, 16).map_err(|_| ParseError::InvalidOpcode(text.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line: &str) -> TraceRecord {
        match parse_line(line).unwrap() {
            ParsedLine::Record(r) => r,
            ParsedLine::Skip => panic!("unexpected skip for {line:?}"),
        }
    }

    #[test]
    fn parses_positional_fields() {
        let r = record("path:[3, 17]::ref:12::data:[0, 10, 255]::size:3::op:7\n");
        assert_eq!(r.path, "[3, 17]");
        assert_eq!(r.reference, "12");
        assert_eq!(r.payload, vec!["0", "10", "255"]);
        assert_eq!(r.payload_bytes, vec![0, 10, 255]);
        assert_eq!(r.declared_size, 3);
        assert_eq!(r.opcode, 0x07);
    }

    #[test]
    fn values_stop_at_the_next_colon() {
        let r = record("path:a:b::ref:7:x::data:[1]:[2]::size:1:9::op:7:1");
        assert_eq!(r.path, "a");
        assert_eq!(r.reference, "7");
        assert_eq!(r.payload_bytes, vec![1]);
        assert_eq!(r.declared_size, 1);
        assert_eq!(r.opcode, 7);
    }

    #[test]
    fn opcode_is_hex() {
        assert_eq!(record("p:a::r:0::d:[]::s:0::o:3f").opcode, 0x3f);
        assert_eq!(record("p:a::r:0::d:[]::s:0::o:0x80\r\n").opcode, 0x80);
    }

    #[test]
    fn header_lines_are_skipped() {
        assert_eq!(parse_line("sector 4 ...").unwrap(), ParsedLine::Skip);
        assert_eq!(parse_line("sector").unwrap(), ParsedLine::Skip);
    }

    #[test]
    fn non_numeric_payload_tokens_are_dropped() {
        let r = record("p:a::r:Some(16)::d:[1, x, 2, -3, ]::s:2::o:1");
        assert_eq!(r.payload.len(), 5);
        assert_eq!(r.payload_bytes, vec![1, 2]);
    }

    #[test]
    fn empty_payload() {
        let r = record("p:a::r:0::d:[]::s:0::o:1");
        assert!(r.payload_bytes.is_empty());
        assert_eq!(r.payload, vec![String::new()]);
    }

    #[test]
    fn payload_byte_out_of_range_fails() {
        assert_eq!(
            parse_line("p:a::r:0::d:[1, 256]::s:0::o:1"),
            Err(ParseError::ByteOutOfRange("256".into()))
        );
    }

    #[test]
    fn malformed_lines_fail() {
        assert_eq!(
            parse_line("p:a::r:0::d:[]::s:0"),
            Err(ParseError::FieldCount { expected: 5, found: 4 })
        );
        assert_eq!(
            parse_line(""),
            Err(ParseError::FieldCount { expected: 5, found: 1 })
        );
        assert_eq!(
            parse_line("p:a::r0::d:[]::s:0::o:1"),
            Err(ParseError::MissingSeparator { index: 1 })
        );
        assert_eq!(
            parse_line("p:a::r:0::d:[]::s:ten::o:1"),
            Err(ParseError::InvalidSize("ten".into()))
        );
        assert_eq!(
            parse_line("p:a::r:0::d:[]::s:1::o:zz"),
            Err(ParseError::InvalidOpcode("zz".into()))
        );
    }

    #[test]
    fn display_round_trips_through_parser() {
        let r = TraceRecord::new("tbl/1", 0x07, "10", vec![0x43, 0x44], 2);
        assert_eq!(r.to_string(), "path:tbl/1::ref:10::data:[67, 68]::size:2::op:7");
        assert_eq!(record(&r.to_string()), r);
    }
}
