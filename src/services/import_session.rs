use std::path::Path;

use chrono::{DateTime, Utc};
use smallvec::SmallVec;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ColumnMapping, CsvDocument, ImportResult, ImportStage, NormalizedRow, TargetField};
use crate::services::csv_parser::parse_csv;
use crate::services::header_classifier::infer_mapping;
use crate::services::row_normalizer::normalize_row;

pub const PREVIEW_ROWS: usize = 5;
pub const ADVISORY_ROW_LIMIT: usize = 1000;
const ACCEPTED_EXTENSIONS: [&str; 2] = ["csv", "txt"];

pub type PreviewRows = SmallVec<[NormalizedRow; PREVIEW_ROWS]>;

/// What `begin_import` hands to the batch run; the session keeps its own copy.
///
/// `run` identifies the run. Progress, completion and abort calls carrying an
/// older run are dropped, so a run abandoned by `reset` cannot touch a newer one.
#[derive(Debug, Clone)]
pub struct ImportSnapshot {
    pub run: u64,
    pub document: CsvDocument,
    pub mapping: ColumnMapping,
}

/// One upload-to-result walk through the importer.
///
/// Stages move `upload → mapping ⇄ preview → importing → complete`;
/// `reset` returns to `upload` from anywhere.
#[derive(Debug, Clone)]
pub struct ImportSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    max_file_size: usize,
    stage: ImportStage,
    file_name: Option<String>,
    document: CsvDocument,
    mapping: ColumnMapping,
    progress: u8,
    result: Option<ImportResult>,
    current_run: u64,
}

impl ImportSession {
    pub fn new(max_file_size: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            max_file_size,
            stage: ImportStage::Upload,
            file_name: None,
            document: CsvDocument::default(),
            mapping: ColumnMapping::default(),
            progress: 0,
            result: None,
            current_run: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn stage(&self) -> ImportStage {
        self.stage
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn document(&self) -> &CsvDocument {
        &self.document
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn result(&self) -> Option<&ImportResult> {
        self.result.as_ref()
    }

    fn is_current_run(&self, run: u64) -> bool {
        self.stage == ImportStage::Importing && self.current_run == run
    }

    fn require(&self, stage: ImportStage, action: &'static str) -> Result<(), AppError> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(AppError::InvalidTransition {
                from: self.stage.as_str(),
                action,
            })
        }
    }

    /// upload → mapping. The session is untouched when the file is rejected.
    pub fn load_file(&mut self, file_name: &str, bytes: &[u8]) -> Result<(), AppError> {
        self.require(ImportStage::Upload, "upload a file")?;
        validate_upload(file_name, bytes.len(), self.max_file_size)?;

        let text = String::from_utf8_lossy(bytes);
        let document = parse_csv(&text);

        if document.headers.is_empty() {
            return Err(AppError::InvalidInput("CSV file has no header row".to_string()));
        }
        if document.rows.is_empty() {
            return Err(AppError::InvalidInput("CSV file has no data rows".to_string()));
        }
        if document.row_count() > ADVISORY_ROW_LIMIT {
            tracing::warn!(
                "{} has {} rows, imports above {} rows are not recommended",
                file_name,
                document.row_count(),
                ADVISORY_ROW_LIMIT
            );
        }

        self.mapping = infer_mapping(&document.headers);
        tracing::info!(
            "Session {} loaded {}: {} columns, {} rows, title mapped: {}",
            self.id,
            file_name,
            document.headers.len(),
            document.row_count(),
            self.mapping.has_title()
        );

        self.document = document;
        self.file_name = Some(file_name.to_string());
        self.stage = ImportStage::Mapping;
        Ok(())
    }

    pub fn set_mapping(&mut self, column: usize, field: TargetField) -> Result<(), AppError> {
        self.require(ImportStage::Mapping, "change the column mapping")?;
        if !self.mapping.set(column, field) {
            return Err(AppError::InvalidInput(format!(
                "Column {} does not exist (file has {} columns)",
                column,
                self.document.headers.len()
            )));
        }
        Ok(())
    }

    /// mapping → preview, gated on a title column.
    pub fn continue_to_preview(&mut self, board_id: &str) -> Result<PreviewRows, AppError> {
        self.require(ImportStage::Mapping, "continue to preview")?;
        if !self.mapping.has_title() {
            return Err(AppError::MissingTitleMapping);
        }

        self.stage = ImportStage::Preview;
        Ok(self.preview(board_id))
    }

    pub fn preview(&self, board_id: &str) -> PreviewRows {
        self.document
            .rows
            .iter()
            .take(PREVIEW_ROWS)
            .map(|row| normalize_row(&self.mapping, row, board_id))
            .collect()
    }

    pub fn back_to_mapping(&mut self) -> Result<(), AppError> {
        self.require(ImportStage::Preview, "go back to mapping")?;
        self.stage = ImportStage::Mapping;
        Ok(())
    }

    /// preview → importing. The mapping is frozen from here on.
    pub fn begin_import(&mut self) -> Result<ImportSnapshot, AppError> {
        self.require(ImportStage::Preview, "start the import")?;
        self.current_run += 1;
        self.stage = ImportStage::Importing;
        self.progress = 0;
        self.result = None;

        Ok(ImportSnapshot {
            run: self.current_run,
            document: self.document.clone(),
            mapping: self.mapping.clone(),
        })
    }

    pub fn set_progress(&mut self, run: u64, percent: u8) {
        if self.is_current_run(run) {
            self.progress = percent.min(100);
        }
    }

    pub fn complete(&mut self, run: u64, result: ImportResult) -> Result<(), AppError> {
        self.require(ImportStage::Importing, "complete the import")?;
        if self.current_run != run {
            return Err(AppError::InvalidTransition {
                from: self.stage.as_str(),
                action: "complete an abandoned import",
            });
        }
        self.stage = ImportStage::Complete;
        self.progress = 100;
        self.result = Some(result);
        Ok(())
    }

    /// A fatal run error drops back to preview without a result.
    pub fn abort(&mut self, run: u64) {
        if self.is_current_run(run) {
            self.stage = ImportStage::Preview;
            self.progress = 0;
            self.result = None;
        }
    }

    pub fn reset(&mut self) {
        self.stage = ImportStage::Upload;
        self.file_name = None;
        self.document = CsvDocument::default();
        self.mapping = ColumnMapping::default();
        self.progress = 0;
        self.result = None;
    }
}

pub fn validate_upload(file_name: &str, size: usize, max_file_size: usize) -> Result<(), AppError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::UnsupportedFileType(file_name.to_string()));
    }
    if size > max_file_size {
        return Err(AppError::FileTooLarge {
            size,
            limit: max_file_size,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostStatus;

    const LIMIT: usize = 10 * 1024 * 1024;

    fn mapped_session(csv: &str) -> ImportSession {
        let mut session = ImportSession::new(LIMIT);
        session.load_file("posts.csv", csv.as_bytes()).unwrap();
        session
    }

    #[test]
    fn upload_seeds_mapping_and_moves_to_mapping() {
        let session = mapped_session("Title,Votes,Status\nDark mode,150,Planned\n");
        assert_eq!(session.stage(), ImportStage::Mapping);
        assert_eq!(session.file_name(), Some("posts.csv"));
        assert_eq!(session.mapping().field_at(0), Some(TargetField::Title));
        assert_eq!(session.mapping().field_at(1), Some(TargetField::Votes));
        assert_eq!(session.mapping().field_at(2), Some(TargetField::Status));
    }

    #[test]
    fn rejected_uploads_leave_session_in_upload() {
        let mut session = ImportSession::new(LIMIT);

        let err = session.load_file("posts.xlsx", b"Title\nA\n").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType(_)));

        let err = session.load_file("posts.csv", b"Title\n").unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = session.load_file("posts.csv", b"").unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        assert_eq!(session.stage(), ImportStage::Upload);
        assert!(session.file_name().is_none());
    }

    #[test]
    fn upload_limits_are_enforced() {
        assert!(validate_upload("FEEDBACK.TXT", 10, 100).is_ok());
        assert!(matches!(
            validate_upload("feedback.csv", 101, 100),
            Err(AppError::FileTooLarge { size: 101, limit: 100 })
        ));
        assert!(matches!(
            validate_upload("feedback", 1, 100),
            Err(AppError::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn preview_requires_a_title_column() {
        let mut session = mapped_session("Summary,Votes\nSlow search,4\n");
        assert!(matches!(
            session.continue_to_preview("board"),
            Err(AppError::MissingTitleMapping)
        ));
        assert_eq!(session.stage(), ImportStage::Mapping);

        session.set_mapping(0, TargetField::Title).unwrap();
        let preview = session.continue_to_preview("board").unwrap();
        assert_eq!(session.stage(), ImportStage::Preview);
        assert_eq!(preview[0].post.title, "Slow search");
    }

    #[test]
    fn preview_shows_first_five_normalized_rows() {
        let csv = (1..=8).fold(String::from("Title,Status\n"), |mut acc, i| {
            acc.push_str(&format!("Post {},WEIRD\n", i));
            acc
        });
        let mut session = mapped_session(&csv);
        let preview = session.continue_to_preview("board").unwrap();

        assert_eq!(preview.len(), PREVIEW_ROWS);
        assert!(preview.iter().all(|row| row.post.status == PostStatus::Open));
        assert_eq!(preview[4].post.title, "Post 5");
    }

    #[test]
    fn mapping_is_frozen_outside_the_mapping_stage() {
        let mut session = mapped_session("Title\nA\n");
        session.continue_to_preview("board").unwrap();
        assert!(matches!(
            session.set_mapping(0, TargetField::Skip),
            Err(AppError::InvalidTransition { from: "preview", .. })
        ));

        tokio_test::assert_ok!(session.back_to_mapping());
        tokio_test::assert_ok!(session.set_mapping(0, TargetField::Description));
        tokio_test::assert_err!(session.set_mapping(9, TargetField::Title));
    }

    #[test]
    fn import_lifecycle_and_abort() {
        let mut session = mapped_session("Title\nA\n");
        assert!(session.begin_import().is_err());

        session.continue_to_preview("board").unwrap();
        let snapshot = session.begin_import().unwrap();
        assert_eq!(snapshot.document.row_count(), 1);
        assert_eq!(session.stage(), ImportStage::Importing);

        session.set_progress(snapshot.run, 50);
        assert_eq!(session.progress(), 50);

        session.abort(snapshot.run);
        assert_eq!(session.stage(), ImportStage::Preview);
        assert!(session.result().is_none());

        let retry = session.begin_import().unwrap();
        assert_ne!(retry.run, snapshot.run);
        session.complete(retry.run, ImportResult::default()).unwrap();
        assert_eq!(session.stage(), ImportStage::Complete);
        assert_eq!(session.progress(), 100);
        assert!(session.result().is_some());
    }

    #[test]
    fn reset_returns_to_upload_from_any_stage() {
        let mut session = mapped_session("Title\nA\n");
        session.continue_to_preview("board").unwrap();
        let snapshot = session.begin_import().unwrap();
        session.complete(snapshot.run, ImportResult::default()).unwrap();

        session.reset();
        assert_eq!(session.stage(), ImportStage::Upload);
        assert!(session.document().headers.is_empty());
        assert!(session.result().is_none());

        session.load_file("again.txt", b"Title\nB\n").unwrap();
        assert_eq!(session.stage(), ImportStage::Mapping);
    }

    #[test]
    fn abandoned_run_cannot_touch_a_newer_run() {
        let mut session = mapped_session("Title\nA\n");
        session.continue_to_preview("board").unwrap();
        let abandoned = session.begin_import().unwrap();

        session.reset();
        session.load_file("b.csv", b"Title\nB\nC\n").unwrap();
        session.continue_to_preview("board").unwrap();
        let current = session.begin_import().unwrap();

        session.set_progress(current.run, 40);
        session.set_progress(abandoned.run, 90);
        assert_eq!(session.progress(), 40);

        let stale = ImportResult {
            total_rows: 1,
            ..Default::default()
        };
        assert!(matches!(
            session.complete(abandoned.run, stale),
            Err(AppError::InvalidTransition { from: "importing", .. })
        ));
        session.abort(abandoned.run);
        assert_eq!(session.stage(), ImportStage::Importing);

        let fresh = ImportResult {
            total_rows: 2,
            ..Default::default()
        };
        session.complete(current.run, fresh).unwrap();
        assert_eq!(session.stage(), ImportStage::Complete);
        assert_eq!(session.file_name(), Some("b.csv"));
        assert_eq!(session.result().map(|r| r.total_rows), Some(2));
    }
}
