use csv::Writer;

use crate::error::AppError;
use crate::models::RowError;

pub const ERROR_REPORT_HEADERS: [&str; 3] = ["Row", "Field", "Error"];

/// Downloadable `Row,Field,Error` report, one line per recorded row error.
pub fn error_report_csv(errors: &[RowError]) -> Result<String, AppError> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(ERROR_REPORT_HEADERS)?;

    for error in errors {
        let row = error.row.to_string();
        writer.write_record([row.as_str(), error.field.as_str(), error.message.as_str()])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to flush error report: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| AppError::Internal(format!("Error report is not valid UTF-8: {}", e)))
}
