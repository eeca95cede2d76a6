//! Delimited table tokenization
//!
//! Splits decoded text into rows of raw cells. Row positions matter to the
//! header decoder, so blank lines are kept as empty rows.

use crate::error::IngestResult;

/// One table row, cells untrimmed.
pub type Row = Vec<String>;

/// Cell at `column`, or `""` past the end of a short row.
pub fn cell(row: &[String], column: usize) -> &str {
    row.get(column).map(String::as_str).unwrap_or("")
}

/// Whether every cell of the row is blank.
pub fn is_blank(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// Split `text` into rows on `delimiter`.
///
/// Rows may differ in length. Quoted fields follow the usual CSV rules,
/// including embedded delimiters and line breaks.
pub fn split_rows(text: &str, delimiter: u8) -> IngestResult<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let bytes = text.as_bytes();
    let mut rows = Vec::new();
    let mut record = csv::StringRecord::new();

    // The reader skips empty lines and reports a record's position from
    // where it started scanning, which may sit before the skipped lines.
    // Start lines are recovered by counting `\n` up to the first byte of
    // each record, so LF and CRLF input agree.
    let mut offset = 0usize;
    let mut line = 1usize;
    let mut next_line = 1usize;
    while reader.read_record(&mut record)? {
        let reported = record
            .position()
            .map_or(offset, |position| position.byte() as usize);
        let start = record_start(bytes, reported.clamp(offset, bytes.len()));
        line += count_line_breaks(&bytes[offset..start]);
        offset = start;

        while next_line < line {
            rows.push(Row::new());
            next_line += 1;
        }
        let embedded_breaks: usize = record
            .iter()
            .map(|field| field.matches('\n').count())
            .sum();
        next_line = line + 1 + embedded_breaks;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(rows)
}

/// First byte at or after `from` that is not a line terminator.
fn record_start(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b != b'\r' && b != b'\n')
        .map_or(bytes.len(), |skipped| from + skipped)
}

fn count_line_breaks(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b == b'\n').count()
}
