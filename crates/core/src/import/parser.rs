use std::collections::btree_map::Entry;

use crate::domain::customer::ImportRow;
use crate::errors::ImportError;
use crate::import::report::ImportWarning;

pub const DEFAULT_MAX_ROWS: usize = 10_000;
pub const DEFAULT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    pub delimiter: u8,
    pub max_rows: usize,
    pub max_file_bytes: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { delimiter: b',', max_rows: DEFAULT_MAX_ROWS, max_file_bytes: DEFAULT_MAX_FILE_BYTES }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedFile {
    pub headers: Vec<String>,
    pub rows: Vec<ImportRow>,
    pub warnings: Vec<ImportWarning>,
}

impl ParsedFile {
    pub fn lines_read(&self) -> usize {
        self.rows.len()
            + self
                .warnings
                .iter()
                .filter(|warning| matches!(warning, ImportWarning::MalformedLine { .. }))
                .count()
    }
}

pub fn parse(contents: &[u8]) -> Result<ParsedFile, ImportError> {
    parse_with_options(contents, &ParseOptions::default())
}

/// Splits delimited text into header-keyed rows.
///
/// Lines whose field count differs from the header, or that are not UTF-8,
/// are skipped and reported as `MalformedLine` warnings. Only file-level
/// problems return an error.
pub fn parse_with_options(
    contents: &[u8],
    options: &ParseOptions,
) -> Result<ParsedFile, ImportError> {
    if contents.len() > options.max_file_bytes {
        return Err(ImportError::UnreadableFile(format!(
            "file is {} bytes, limit is {}",
            contents.len(),
            options.max_file_bytes
        )));
    }

    let contents = contents.strip_prefix(UTF8_BOM).unwrap_or(contents);
    if contents.iter().all(u8::is_ascii_whitespace) {
        return Err(ImportError::UnreadableFile("file is empty".to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .delimiter(options.delimiter)
        .from_reader(contents);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|error| ImportError::UnreadableFile(format!("header row: {error}")))?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.iter().all(|header| header.trim().is_empty()) {
        return Err(ImportError::UnreadableFile("header row has no column names".to_string()));
    }

    let mut parsed = ParsedFile { headers, ..ParsedFile::default() };

    for (index, result) in reader.records().enumerate() {
        if index >= options.max_rows {
            return Err(ImportError::UnreadableFile(format!(
                "file exceeds the limit of {} data rows",
                options.max_rows
            )));
        }
        let fallback_line = index as u64 + 2;

        let record = match result {
            Ok(record) => record,
            Err(error) => {
                let line_number =
                    error.position().map(|position| position.line()).unwrap_or(fallback_line);
                tracing::debug!(
                    event_name = "import.parse.line_skipped",
                    line_number,
                    error = %error,
                    "skipping malformed line"
                );
                parsed
                    .warnings
                    .push(ImportWarning::MalformedLine { line_number, reason: error.to_string() });
                continue;
            }
        };

        let line_number =
            record.position().map(|position| position.line()).unwrap_or(fallback_line);
        let mut row = ImportRow::new(line_number);
        for (header, value) in parsed.headers.iter().zip(record.iter()) {
            if let Entry::Vacant(slot) = row.fields.entry(header.clone()) {
                slot.insert(value.to_string());
            }
        }
        parsed.rows.push(row);
    }

    Ok(parsed)
}
