use crate::import::normalize::RECOGNIZED_COLUMNS;
use crate::import::report::ImportWarning;

/// Reports recognized columns that the header does not carry.
///
/// Matching is exact; `first name` does not satisfy `First Name`.
pub fn inspect_headers(headers: &[String]) -> Vec<ImportWarning> {
    RECOGNIZED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|header| header.as_str() == **column))
        .map(|column| ImportWarning::MissingColumn { column: (*column).to_string() })
        .collect()
}
