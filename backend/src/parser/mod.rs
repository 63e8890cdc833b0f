//! CSV parsing primitives with encoding and delimiter auto-detection.
//!
//! Uploaded files are not guaranteed UTF-8, so raw bytes are charset-sniffed
//! and decoded before anything else looks at them. The query engine composes
//! these primitives; nothing here knows about filters or storage.

use csv::StringRecord;

/// Delimiter candidates, probed in this order. On a tie the earlier
/// candidate wins, so `,` is also the fallback for undetectable input.
const DELIMITER_CANDIDATES: [char; 4] = [',', ';', '\t', '|'];

/// Characters trimmed from header names and field values: space, tab,
/// newline, carriage return, NUL, vertical tab.
const FIELD_TRIM: &[char] = &[' ', '\t', '\n', '\r', '\0', '\u{000B}'];

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _, _) = chardet::detect(bytes);

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to text using the detected encoding.
///
/// Decoding is lossy and never fails: unknown charsets and invalid byte
/// sequences fall back to replacement characters rather than aborting the
/// whole operation.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).into_owned(),
        // encoding_rs follows WHATWG, which folds latin-1 into windows-1252.
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    }
}

/// Detect the delimiter by counting occurrences in the first line.
///
/// A quoted field full of commas can fool the count; that is accepted
/// behavior for a heuristic that must always return something.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best_sep = DELIMITER_CANDIDATES[0];
    let mut best_count = 0;

    for &sep in &DELIMITER_CANDIDATES {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Build a record reader over decoded CSV text.
///
/// The reader is single-pass and lazy. Quoting follows RFC 4180 (`""`
/// doubles a quote inside a quoted field) with `\` accepted as an
/// additional escape ahead of quotes; rows may be ragged; both `\n` and
/// `\r\n` terminate records.
pub fn record_reader(content: &str, delimiter: char) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .escape(Some(b'\\'))
        .from_reader(content.as_bytes())
}

/// Trim a field value (headers and cells use the same character set).
pub fn trim_field(value: &str) -> &str {
    value.trim_matches(FIELD_TRIM)
}

/// Normalize the first parsed record into column names.
///
/// Per cell, in order: strip a leading UTF-8 BOM, trim surrounding
/// whitespace, then drop the cell entirely if nothing remains. Surviving
/// names keep their original order with gaps removed. Duplicate names are
/// left alone here; the query engine decides what colliding keys mean.
pub fn normalize_headers(record: &StringRecord) -> Vec<String> {
    record
        .iter()
        .map(|cell| {
            let cell = cell.strip_prefix('\u{FEFF}').unwrap_or(cell);
            trim_field(cell).to_string()
        })
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(content: &str, delimiter: char) -> Vec<Vec<String>> {
        record_reader(content, delimiter)
            .records()
            .map(|r| r.unwrap().iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_detect_delimiter_comma() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
    }

    #[test]
    fn test_detect_delimiter_semicolon() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
    }

    #[test]
    fn test_detect_delimiter_tab() {
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
    }

    #[test]
    fn test_detect_delimiter_pipe() {
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
    }

    #[test]
    fn test_detect_delimiter_tie_prefers_comma() {
        // One of each: comma comes first in candidate order.
        assert_eq!(detect_delimiter("a,b;c\n"), ',');
    }

    #[test]
    fn test_detect_delimiter_earlier_candidate_wins_tie() {
        // Semicolon and pipe tie at two; semicolon is probed first.
        assert_eq!(detect_delimiter("a;b;c|d|e"), ';');
    }

    #[test]
    fn test_detect_delimiter_no_separators() {
        assert_eq!(detect_delimiter("single-column-header"), ',');
    }

    #[test]
    fn test_detect_delimiter_empty_input() {
        assert_eq!(detect_delimiter(""), ',');
    }

    #[test]
    fn test_detect_delimiter_only_first_line_counts() {
        // Data rows are full of semicolons but the header line decides.
        assert_eq!(detect_delimiter("a,b\n1;2;3;4;5\n6;7;8;9;0"), ',');
    }

    #[test]
    fn test_reader_simple() {
        let rows = read_all("a,b,c\n1,2,3", ',');
        assert_eq!(rows, vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]);
    }

    #[test]
    fn test_reader_quoted_delimiter() {
        let rows = read_all("name,desc\nAlice,\"x,y,z\"", ',');
        assert_eq!(rows[1], vec!["Alice", "x,y,z"]);
    }

    #[test]
    fn test_reader_doubled_quote() {
        let rows = read_all("a\n\"say \"\"hi\"\"\"", ',');
        assert_eq!(rows[1], vec!["say \"hi\""]);
    }

    #[test]
    fn test_reader_backslash_escaped_quote() {
        let rows = read_all("a\n\"say \\\"hi\\\"\"", ',');
        assert_eq!(rows[1], vec!["say \"hi\""]);
    }

    #[test]
    fn test_reader_crlf() {
        let rows = read_all("a,b\r\n1,2\r\n", ',');
        assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn test_reader_ragged_rows() {
        let rows = read_all("a;b;c\n1;2\n1;2;3;4", ';');
        assert_eq!(rows[1], vec!["1", "2"]);
        assert_eq!(rows[2], vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_reader_empty_input() {
        assert!(read_all("", ',').is_empty());
    }

    #[test]
    fn test_trim_field() {
        assert_eq!(trim_field("  jenkins46\t"), "jenkins46");
        assert_eq!(trim_field("\r\nvalue\0"), "value");
        assert_eq!(trim_field("\u{000B}x\u{000B}"), "x");
        // Interior whitespace stays.
        assert_eq!(trim_field(" a b "), "a b");
    }

    #[test]
    fn test_normalize_headers_bom_and_whitespace() {
        let record = StringRecord::from(vec!["\u{FEFF} Username ", "Identifier"]);
        assert_eq!(normalize_headers(&record), vec!["Username", "Identifier"]);
    }

    #[test]
    fn test_normalize_headers_drops_empty_cells() {
        let record = StringRecord::from(vec!["a", "  ", "b", ""]);
        assert_eq!(normalize_headers(&record), vec!["a", "b"]);
    }

    #[test]
    fn test_normalize_headers_keeps_duplicates() {
        let record = StringRecord::from(vec!["id", "name", "id"]);
        assert_eq!(normalize_headers(&record), vec!["id", "name", "id"]);
    }

    #[test]
    fn test_normalize_headers_all_empty() {
        let record = StringRecord::from(vec!["", " "]);
        assert!(normalize_headers(&record).is_empty());
    }

    #[test]
    fn test_detect_encoding_utf8() {
        assert_eq!(detect_encoding("name,age\nAlice,30".as_bytes()), "utf-8");
    }

    #[test]
    fn test_decode_latin1() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        assert_eq!(decode_content(bytes, "iso-8859-1"), "Société");
    }

    #[test]
    fn test_decode_unknown_charset_falls_back() {
        let decoded = decode_content(b"plain text", "klingon");
        assert_eq!(decoded, "plain text");
    }
}
