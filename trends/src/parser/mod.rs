//! CSV loading with encoding and delimiter auto-detection.
//!
//! Turns a CSV file into a polars `DataFrame`: the header row names the
//! columns, each column's type is inferred from its cells (empty cell → null)
//! unless it is listed as a text column. No housing-specific logic here.

use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use crate::error::{CsvError, CsvResult};

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed frame
    pub table: DataFrame,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Latin-1 is decoded as windows-1252, its superset. A leading byte-order
/// mark is dropped so it cannot stick to the first header.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(e) => {
                return Err(CsvError::EncodingError(format!(
                    "invalid UTF-8 at byte {}",
                    e.valid_up_to()
                )))
            }
        },
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.to_string()
        }
        // Fallback: UTF-8 with lossy conversion
        _ => String::from_utf8_lossy(bytes).to_string(),
    };

    if let Some(rest) = decoded.strip_prefix('\u{feff}') {
        return Ok(rest.to_string());
    }
    Ok(decoded)
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

/// Parse CSV text into a frame with an explicit delimiter.
///
/// Quoted fields may contain the delimiter (`"Missoula, MT"` is one field).
/// Columns named in `text_columns` are always read as strings, so codes
/// such as `01001` keep their leading zeros.
///
/// # Example
/// ```ignore
/// use housing_trends::parser::parse_table;
///
/// let df = parse_table("RegionName,2019-01-31\n\"Helena, MT\",310000", ',', &["RegionName"]).unwrap();
/// assert_eq!(df.height(), 1);
/// ```
pub fn parse_table(content: &str, delimiter: char, text_columns: &[&str]) -> CsvResult<DataFrame> {
    parse_with_headers(content, delimiter, text_columns).map(|(df, _)| df)
}

fn read_headers(content: &str, delimiter: char) -> CsvResult<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(CsvError::NoHeaders);
    }
    if let Some((i, dup)) = headers
        .iter()
        .enumerate()
        .find(|(i, h)| headers[..*i].contains(*h))
    {
        return Err(CsvError::InvalidHeader(format!(
            "column '{}' repeated at position {}",
            dup,
            i + 1
        )));
    }
    Ok(headers)
}

fn parse_with_headers(
    content: &str,
    delimiter: char,
    text_columns: &[&str],
) -> CsvResult<(DataFrame, Vec<String>)> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let headers = read_headers(content, delimiter)?;
    let overrides: Schema = headers
        .iter()
        .filter(|h| text_columns.contains(&h.as_str()))
        .map(|h| Field::new(h.as_str().into(), DataType::String))
        .collect();

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_schema_overwrite(Some(Arc::new(overrides)))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(delimiter as u8)
                .with_truncate_ragged_lines(true),
        )
        .into_reader_with_file_handle(Cursor::new(content.as_bytes().to_vec()))
        .finish()?;

    Ok((df, headers))
}

/// Parse CSV file with auto-detection of encoding and delimiter.
///
/// # Example
/// ```ignore
/// let result = parse_csv_file_auto("Metro_invt_fs_uc_sfrcondo_week.csv", &["RegionName"])?;
/// println!("Encoding: {}, Delimiter: '{}'", result.encoding, result.delimiter);
/// println!("Rows: {}", result.table.height());
/// ```
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P, text_columns: &[&str]) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes, text_columns)
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8], text_columns: &[&str]) -> CsvResult<ParseResult> {
    if bytes.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    // Detect encoding
    let encoding = detect_encoding(bytes);

    // Decode content
    let content = decode_content(bytes, &encoding)?;

    // Detect delimiter
    let delimiter = detect_delimiter(&content);

    let (table, headers) = parse_with_headers(&content, delimiter, text_columns)?;
    Ok(ParseResult {
        table,
        encoding,
        delimiter,
        headers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{self, floats, strings};

    const IDENTIFIERS: [&str; 3] = ["RegionName", "RegionType", "StateName"];

    #[test]
    fn test_simple_csv() {
        let df = parse_table("name;age\nAlice;30\nBob;25", ';', &[]).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(strings(&df, "name").unwrap()[0].as_deref(), Some("Alice"));
        assert_eq!(table::dtype(&df, "age").unwrap(), Some(table::DataType::Int));
    }

    #[test]
    fn test_quoted_delimiter_stays_in_field() {
        let csv = "RegionName,StateName,2019-01-31\n\"Missoula, MT\",MT,310000.5";
        let df = parse_table(csv, ',', &IDENTIFIERS).unwrap();

        assert_eq!(df.width(), 3);
        assert_eq!(
            strings(&df, "RegionName").unwrap()[0].as_deref(),
            Some("Missoula, MT")
        );
        assert_eq!(floats(&df, "2019-01-31").unwrap(), vec![Some(310000.5)]);
    }

    #[test]
    fn test_text_columns_keep_leading_zeros() {
        let csv = "RegionName,RegionType,StateName,2019-01-31\n01001,zip,MA,1\n";

        let df = parse_table(csv, ',', &IDENTIFIERS).unwrap();
        assert_eq!(table::dtype(&df, "RegionName").unwrap(), Some(table::DataType::Str));
        assert_eq!(strings(&df, "RegionName").unwrap()[0].as_deref(), Some("01001"));
        assert_eq!(table::dtype(&df, "2019-01-31").unwrap(), Some(table::DataType::Int));

        let inferred = parse_table(csv, ',', &[]).unwrap();
        assert_eq!(
            table::dtype(&inferred, "RegionName").unwrap(),
            Some(table::DataType::Int)
        );
    }

    #[test]
    fn test_missing_values_are_null() {
        let df = parse_table("a,b,c\n1,,3\n4,5,\n", ',', &[]).unwrap();

        assert_eq!(floats(&df, "b").unwrap(), vec![None, Some(5.0)]);
        assert_eq!(floats(&df, "c").unwrap(), vec![Some(3.0), None]);
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_table("", ',', &[]), Err(CsvError::EmptyFile)));
        assert!(matches!(parse_bytes_auto(b"", &[]), Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_repeated_header_rejected() {
        let err = parse_table("DATE,MDSP,DATE\n2019-01-01,1,2\n", ',', &[]).unwrap_err();
        assert!(matches!(err, CsvError::InvalidHeader(ref m) if m.contains("DATE")));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("DATE"), ',');
        assert_eq!(format_delimiter('\t'), "\\t");
        assert_eq!(format_delimiter(';'), ";");
    }

    #[test]
    fn test_auto_parse_strips_bom() {
        let csv = "\u{feff}DATE,MDSP\n2019-01-01,9.9";
        let result = parse_bytes_auto(csv.as_bytes(), &[]).unwrap();

        assert_eq!(result.delimiter, ',');
        assert_eq!(result.headers, vec!["DATE", "MDSP"]);
        assert_eq!(result.table.height(), 1);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        assert_eq!(decode_content(bytes, "iso-8859-1").unwrap(), "Société");
        // 0xA4 is the currency sign in Latin-1 (the euro sign only in Latin-9)
        assert_eq!(decode_content(&[0xA4], "latin1").unwrap(), "¤");
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.csv");
        std::fs::write(&path, "DATE,DRSFRMACBS\n2019-01-01,3.2\n2019-04-01,.\n").unwrap();

        let result = parse_csv_file_auto(&path, &[]).unwrap();
        assert_eq!(result.table.height(), 2);
        // "." is not numeric, so the column stays text
        assert_eq!(
            table::dtype(&result.table, "DRSFRMACBS").unwrap(),
            Some(table::DataType::Str)
        );
    }
}
