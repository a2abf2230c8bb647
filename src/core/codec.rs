use crate::domain::model::Record;
use crate::utils::error::{EtlError, Result};
use std::collections::HashSet;

/// Reads a comma-delimited file with a header row into records.
///
/// Rows may be ragged: missing trailing cells are left out of the record and
/// surplus cells are keyed `_<index>`. Bytes that are not valid UTF-8 are
/// replaced with U+FFFD instead of failing the run.
pub fn parse_csv_records(bytes: &[u8]) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let header = String::from_utf8_lossy(h);
            if i == 0 {
                header.trim_start_matches('\u{feff}').to_string()
            } else {
                header.into_owned()
            }
        })
        .collect();

    let mut records = Vec::new();
    for row in reader.byte_records() {
        let row = row?;
        let pairs = row.iter().enumerate().map(|(i, cell)| {
            let key = headers
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("_{}", i));
            (key, String::from_utf8_lossy(cell).into_owned())
        });
        records.push(Record::from_pairs(pairs));
    }

    tracing::debug!(
        "Parsed {} rows with {} columns",
        records.len(),
        headers.len()
    );
    Ok(records)
}

/// Column names across all records, in the order they are first seen.
pub fn collect_headers(records: &[Record]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut headers = Vec::new();
    for record in records {
        for key in record.keys() {
            if seen.insert(key) {
                headers.push(key.to_string());
            }
        }
    }
    headers
}

/// Serializes records as tab-delimited text with a header row. The last row
/// has no trailing newline. An empty slice produces an empty string.
pub fn write_tsv(records: &[Record]) -> Result<String> {
    if records.is_empty() {
        return Ok(String::new());
    }

    let headers = collect_headers(records);
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(&headers)?;
    for record in records {
        writer.write_record(headers.iter().map(|h| record.cell(h)))?;
    }

    let mut bytes = writer.into_inner().map_err(|e| EtlError::ProcessingError {
        message: format!("Failed to flush TSV output: {}", e),
    })?;
    // rows are separated, not terminated, by '\n'
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    String::from_utf8(bytes).map_err(|e| EtlError::ProcessingError {
        message: format!("TSV output is not valid UTF-8: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_records() {
        let csv = "id,teacherEmail,zam\n1,a@b.cz,0\n2,\"c,d@e.cz\",1\n";
        let records = parse_csv_records(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get_str("teacherEmail"), Some("a@b.cz"));
        assert_eq!(records[1].get_str("teacherEmail"), Some("c,d@e.cz"));
        assert_eq!(
            records[1].keys().collect::<Vec<_>>(),
            vec!["id", "teacherEmail", "zam"]
        );
    }

    #[test]
    fn test_parse_csv_ragged_rows() {
        let csv = "a,b,c\n1,2\n1,2,3,4\n";
        let records = parse_csv_records(csv.as_bytes()).unwrap();

        assert_eq!(records[0].keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(records[1].get_str("_3"), Some("4"));
    }

    #[test]
    fn test_parse_csv_strips_bom() {
        let csv = "\u{feff}teacherEmail,zam\nx@y.cz,0\n";
        let records = parse_csv_records(csv.as_bytes()).unwrap();

        assert_eq!(records[0].get_str("teacherEmail"), Some("x@y.cz"));
    }

    #[test]
    fn test_parse_csv_keeps_rows_with_invalid_utf8() {
        let records = parse_csv_records(b"teacherEmail,zam,b4\na@b.cz,0,\xe8\n").unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get_str("zam"), Some("0"));
        assert_eq!(records[0].get_str("b4"), Some("\u{fffd}"));
    }

    #[test]
    fn test_parse_csv_keeps_windows_1250_text() {
        // "Čtení" in Windows-1250
        let records =
            parse_csv_records(b"teacherEmail,zam,exerciseDescription\nx@y.cz,0,\xc8ten\xed\n")
                .unwrap();

        assert_eq!(
            records[0].get_str("exerciseDescription"),
            Some("\u{fffd}ten\u{fffd}")
        );
        assert_eq!(records[0].get_str("teacherEmail"), Some("x@y.cz"));
    }

    #[test]
    fn test_parse_csv_empty_input() {
        assert!(parse_csv_records(b"").unwrap().is_empty());
        assert!(parse_csv_records(b"a,b,c\n").unwrap().is_empty());
    }

    #[test]
    fn test_write_tsv() {
        let mut first = Record::from_pairs([("id", "1"), ("note", "two words")]);
        first.set("COVID", 1);
        let second = Record::from_pairs([("id", "2"), ("extra", "tab\there")]);

        let tsv = write_tsv(&[first, second]).unwrap();

        assert_eq!(
            tsv,
            "id\tnote\tCOVID\textra\n1\ttwo words\t1\t\n2\t\t\t\"tab\there\""
        );
    }

    #[test]
    fn test_write_tsv_keeps_quoted_trailing_newline() {
        let record = Record::from_pairs([("note", "line\n")]);

        assert_eq!(write_tsv(&[record]).unwrap(), "note\n\"line\n\"");
    }

    #[test]
    fn test_write_tsv_empty() {
        assert_eq!(write_tsv(&[]).unwrap(), "");
    }
}
