use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clients::PostsApi;
use crate::error::AppError;
use crate::models::{ColumnMapping, CreatedPost, CsvDocument, ImportResult, NormalizedRow, RowError};
use crate::services::row_normalizer::normalize_row;

pub const GENERAL_FIELD: &str = "general";
pub const TITLE_REQUIRED: &str = "Title is required";

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub board_id: String,
    pub batch_size: usize,
    pub batch_delay: Duration,
}

/// Receives the running percentage after each batch. An error here aborts
/// the whole run.
pub trait ProgressSink: Send {
    fn report(&mut self, percent: u8) -> Result<(), AppError>;
}

impl<F> ProgressSink for F
where
    F: FnMut(u8) -> Result<(), AppError> + Send,
{
    fn report(&mut self, percent: u8) -> Result<(), AppError> {
        self(percent)
    }
}

pub fn progress_percent(attempted: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((attempted * 100 + total / 2) / total).min(100) as u8
}

/// Create one post per data row, batch by batch.
///
/// Rows run one at a time; a failing row is recorded and the run moves on.
/// Posts created before a failure are never rolled back. Only a missing title
/// mapping or a failing progress sink ends the run early, and then no result
/// is returned.
pub async fn run_import(
    api: &dyn PostsApi,
    document: &CsvDocument,
    mapping: &ColumnMapping,
    options: &ImportOptions,
    progress: &mut dyn ProgressSink,
) -> Result<ImportResult, AppError> {
    if !mapping.has_title() {
        return Err(AppError::MissingTitleMapping);
    }

    let total = document.row_count();
    let batch_size = options.batch_size.max(1);
    let mut result = ImportResult {
        total_rows: total,
        ..Default::default()
    };

    info!("Importing {} rows in batches of {}", total, batch_size);
    let start = std::time::Instant::now();

    for (batch_idx, batch) in document.rows.chunks(batch_size).enumerate() {
        if batch_idx > 0 && !options.batch_delay.is_zero() {
            tokio::time::sleep(options.batch_delay).await;
        }

        let offset = batch_idx * batch_size;
        debug!("Starting batch {} (rows {}-{})", batch_idx + 1, offset + 1, offset + batch.len());

        for (idx, record) in batch.iter().enumerate() {
            let row_number = offset + idx + 1;
            let normalized = normalize_row(mapping, record, &options.board_id);

            match import_row(api, &normalized).await {
                Ok(created) => {
                    result.success_count += 1;
                    result.created_posts.push(created.clone());
                    seed_votes(api, &created, normalized.votes).await;
                }
                Err(message) => {
                    warn!("Row {} failed: {}", row_number, message);
                    result.error_count += 1;
                    result.errors.push(RowError {
                        row: row_number,
                        field: GENERAL_FIELD.to_string(),
                        message,
                    });
                }
            }
        }

        let attempted = offset + batch.len();
        progress
            .report(progress_percent(attempted, total))
            .map_err(|e| AppError::ImportFailed(e.to_string()))?;
    }

    info!(
        "Import finished in {:?}: {} created, {} failed",
        start.elapsed(),
        result.success_count,
        result.error_count
    );
    Ok(result)
}

async fn import_row(api: &dyn PostsApi, row: &NormalizedRow) -> Result<CreatedPost, String> {
    if row.post.title.is_empty() {
        return Err(TITLE_REQUIRED.to_string());
    }

    api.create_post(&row.post).await.map_err(|e| e.to_string())
}

// Seed failures leave the row counted as a success.
async fn seed_votes(api: &dyn PostsApi, post: &CreatedPost, votes: u32) {
    if votes == 0 {
        return;
    }

    if let Err(e) = api.seed_votes(&post.id, votes).await {
        warn!("Failed to seed {} votes on post {}: {}", votes, post.id, e);
    }
}
