//! Minimal CSV row codec for the session and feature summary files.
//!
//! Fields containing a comma, a quote or a line break are quoted, with
//! embedded quotes doubled. A quoted field may span lines, so files are
//! read record by record with `read_record` rather than line by line.

use crate::error::{PipelineError, Result};
use std::io::BufRead;

/// Encode one row, without the trailing newline.
pub fn encode_row<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|f| encode_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

fn encode_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Read the next record, joining lines while a quoted field is open.
///
/// Returns `None` at end of input. The record terminator is stripped; line
/// breaks inside quotes are kept as written.
pub fn read_record<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut record = String::new();
    loop {
        let read = reader.read_line(&mut record)?;
        if read == 0 {
            // End of input, possibly inside an open quote; decode_row reports that.
            return Ok((!record.is_empty()).then_some(record));
        }
        let quotes = record.chars().filter(|&c| c == '"').count();
        if quotes % 2 == 0 {
            if record.ends_with('\n') {
                record.pop();
                if record.ends_with('\r') {
                    record.pop();
                }
            }
            return Ok(Some(record));
        }
    }
}

/// Decode one row into its fields.
pub fn decode_row(line: &str) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            ('"', true) => in_quotes = false,
            ('"', false) if current.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut current)),
            (c, _) => current.push(c),
        }
    }

    if in_quotes {
        return Err(PipelineError::Parse(format!(
            "unterminated quoted field in row: {line}"
        )));
    }
    fields.push(current);
    Ok(fields)
}

/// Column positions resolved from a header row.
#[derive(Debug)]
pub struct Header {
    columns: Vec<String>,
}

impl Header {
    /// Parse a header line, requiring every column in `required`.
    pub fn parse(line: &str, required: &[&str]) -> Result<Self> {
        let columns: Vec<String> = decode_row(line)?
            .into_iter()
            .map(|c| c.trim().to_string())
            .collect();

        let missing: Vec<&str> = required
            .iter()
            .filter(|r| !columns.iter().any(|c| c == *r))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::Parse(format!(
                "missing column(s): {}",
                missing.join(", ")
            )));
        }

        Ok(Self { columns })
    }

    /// Look up `column` in a decoded row.
    pub fn field<'a>(&self, row: &'a [String], column: &str) -> Result<&'a str> {
        let index = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| PipelineError::Parse(format!("missing column: {column}")))?;
        row.get(index)
            .map(String::as_str)
            .ok_or_else(|| PipelineError::Parse(format!("row has no value for '{column}'")))
    }
}

/// Parse a numeric field, naming the column on failure.
pub fn parse_number<T: std::str::FromStr>(value: &str, column: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| PipelineError::Parse(format!("invalid {column} value '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_row() {
        assert_eq!(encode_row(&["a", "press", "1.5"]), "a,press,1.5");
        assert_eq!(decode_row("a,press,1.5").unwrap(), vec!["a", "press", "1.5"]);
    }

    #[test]
    fn test_quoted_fields() {
        let encoded = encode_row(&[",", "say \"hi\"", ""]);
        assert_eq!(encoded, "\",\",\"say \"\"hi\"\"\",");
        assert_eq!(
            decode_row(&encoded).unwrap(),
            vec![",", "say \"hi\"", ""]
        );
    }

    #[test]
    fn test_unterminated_quote() {
        assert!(matches!(
            decode_row("\"abc,def"),
            Err(PipelineError::Parse(_))
        ));
    }

    #[test]
    fn test_record_spanning_lines() {
        let label = "high\r\nafter lunch\nsecond";
        let encoded = format!("{}\n{}\r\n", encode_row(&["1", label]), encode_row(&["2", "low"]));
        let mut reader = std::io::Cursor::new(encoded);

        let first = read_record(&mut reader).unwrap().unwrap();
        assert_eq!(decode_row(&first).unwrap(), vec!["1", label]);
        let second = read_record(&mut reader).unwrap().unwrap();
        assert_eq!(decode_row(&second).unwrap(), vec!["2", "low"]);
        assert!(read_record(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_record_open_quote_at_end_of_input() {
        let mut reader = std::io::Cursor::new("1,\"high\nafter");
        let record = read_record(&mut reader).unwrap().unwrap();
        assert!(matches!(decode_row(&record), Err(PipelineError::Parse(_))));
    }

    #[test]
    fn test_header_missing_columns() {
        let err = Header::parse("key,event", &["key", "event", "timestamp"]).unwrap_err();
        assert!(err.to_string().contains("timestamp"));
    }

    #[test]
    fn test_header_any_order() {
        let header = Header::parse("b,a", &["a", "b"]).unwrap();
        let row = decode_row("2,1").unwrap();
        assert_eq!(header.field(&row, "a").unwrap(), "1");
        assert_eq!(header.field(&row, "b").unwrap(), "2");
    }
}
