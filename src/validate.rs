//! Artifact validation
//!
//! Checks that the CSV produced by a generated script is structurally usable:
//! non-empty, with at least one column carrying data. A partially-blank file
//! passes with a warning; it still stops the retry loop.

use std::path::Path;

use log::{info, warn};

use crate::error::Result;

/// Result of validating one artifact. Idempotent for an unchanged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvReport {
    /// Artifact is usable
    pub success: bool,

    /// Human-readable classification, fed back to the model on failure
    pub message: String,
}

impl CsvReport {
    fn pass(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Validate the CSV at `output_path`.
///
/// Never errors: malformed files are folded into a failing report carrying
/// the underlying parse error text.
pub fn validate_csv(output_path: &Path) -> CsvReport {
    info!("Validating CSV at {}", output_path.display());
    match scan(output_path) {
        Ok(report) => report,
        Err(e) => {
            warn!("CSV validation failed: {}", e);
            CsvReport::fail(format!("CSV validation failed: {}", e))
        }
    }
}

fn scan(output_path: &Path) -> Result<CsvReport> {
    let mut reader = csv::Reader::from_path(output_path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut column_has_data = vec![false; headers.len()];
    let mut rows = 0usize;

    for record in reader.records() {
        let record = record?;
        rows += 1;
        for (idx, field) in record.iter().enumerate() {
            if idx < column_has_data.len() && !is_blank(field) {
                column_has_data[idx] = true;
            }
        }
    }

    if rows == 0 {
        warn!("CSV file is empty");
        return Ok(CsvReport::fail("CSV file is empty"));
    }

    if column_has_data.iter().all(|has| !has) {
        warn!("All columns in CSV contain no data");
        return Ok(CsvReport::fail("All columns in CSV contain no data"));
    }

    let empty_columns: Vec<&str> = headers
        .iter()
        .zip(&column_has_data)
        .filter(|(_, has)| !**has)
        .map(|(name, _)| name.as_str())
        .collect();

    if !empty_columns.is_empty() {
        let message = format!(
            "Warning: The following columns contain no data: {}",
            empty_columns.join(", ")
        );
        info!("{}", message);
        return Ok(CsvReport::pass(message));
    }

    info!("CSV validation successful: All columns contain some data");
    Ok(CsvReport::pass("All columns contain some data"))
}

/// A field counts as data unless it is empty or a lone space
fn is_blank(field: &str) -> bool {
    field.is_empty() || field == " "
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_all_columns_have_data() {
        let file = csv_file("name,age\na,30\nb,31\n");
        let report = validate_csv(file.path());
        assert!(report.success);
        assert_eq!(report.message, "All columns contain some data");
    }

    #[test]
    fn test_zero_rows_is_empty() {
        let file = csv_file("name,age\n");
        let report = validate_csv(file.path());
        assert!(!report.success);
        assert_eq!(report.message, "CSV file is empty");
    }

    #[test]
    fn test_all_columns_blank() {
        let file = csv_file("name,age\n,\n,\n");
        let report = validate_csv(file.path());
        assert!(!report.success);
        assert_eq!(report.message, "All columns in CSV contain no data");
    }

    #[test]
    fn test_partially_blank_columns_warn_but_pass() {
        // age has one non-blank value ("30"), city has none
        let file = csv_file("name,age,city\na,30,\nb,,\n");
        let report = validate_csv(file.path());
        assert!(report.success);
        assert_eq!(
            report.message,
            "Warning: The following columns contain no data: city"
        );
    }

    #[test]
    fn test_multiple_blank_columns_enumerated() {
        let file = csv_file("name,age,city\na,,\nb,,\n");
        let report = validate_csv(file.path());
        assert!(report.success);
        assert_eq!(
            report.message,
            "Warning: The following columns contain no data: age, city"
        );
    }

    #[test]
    fn test_lone_space_counts_as_blank() {
        let file = csv_file("name,note\na, \nb, \n");
        let report = validate_csv(file.path());
        assert!(report.success);
        assert!(report.message.contains("note"));
    }

    #[test]
    fn test_malformed_csv_fails_with_error_text() {
        let file = csv_file("name,age\na,30\nb\n");
        let report = validate_csv(file.path());
        assert!(!report.success);
        assert!(report.message.starts_with("CSV validation failed:"));
    }

    #[test]
    fn test_missing_file_fails() {
        let report = validate_csv(Path::new("/nonexistent/out.csv"));
        assert!(!report.success);
        assert!(report.message.starts_with("CSV validation failed:"));
    }

    #[test]
    fn test_idempotent_on_unchanged_file() {
        let file = csv_file("name,age,city\na,30,\nb,,\n");
        let first = validate_csv(file.path());
        let second = validate_csv(file.path());
        assert_eq!(first, second);
    }
}
