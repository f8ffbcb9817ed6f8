use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{ColumnMapping, ImportResult, ImportStage, TargetField},
    services::{
        batch_importer::run_import,
        error_report::error_report_csv,
        import_session::{ImportSession, PreviewRows},
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/imports", post(create_import))
        .route("/imports/:id", get(get_import).delete(delete_import))
        .route("/imports/:id/file", post(upload_file))
        .route("/imports/:id/mapping", put(update_mapping))
        .route("/imports/:id/preview", post(preview_import))
        .route("/imports/:id/back", post(back_to_mapping))
        .route("/imports/:id/start", post(start_import))
        .route("/imports/:id/errors.csv", get(download_errors))
        .route("/imports/:id/reset", post(reset_import))
        .layer(cors)
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    id: Uuid,
    stage: ImportStage,
    file_name: Option<String>,
    created_at: DateTime<Utc>,
    headers: Vec<String>,
    row_count: usize,
    mapping: ColumnMapping,
    has_title: bool,
    progress: u8,
    result: Option<ImportResult>,
}

impl From<&ImportSession> for SessionView {
    fn from(session: &ImportSession) -> Self {
        Self {
            id: session.id(),
            stage: session.stage(),
            file_name: session.file_name().map(str::to_string),
            created_at: session.created_at(),
            headers: session.document().headers.clone(),
            row_count: session.document().row_count(),
            mapping: session.mapping().clone(),
            has_title: session.mapping().has_title(),
            progress: session.progress(),
            result: session.result().cloned(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MappingUpdate {
    column: usize,
    field: TargetField,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    total_rows: usize,
    rows: PreviewRows,
}

/// A body cut off by the request limit surfaces as a multipart error.
fn upload_error(err: MultipartError, context: &str, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::UploadTooLarge { limit }
    } else {
        AppError::InvalidInput(format!("{}: {}", context, err.body_text()))
    }
}

async fn read_upload(mut multipart: Multipart, limit: usize) -> Result<(String, Bytes), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e, "Malformed upload", limit))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::InvalidInput("Upload is missing a file name".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| upload_error(e, "Failed to read upload", limit))?;
        return Ok((file_name, data));
    }

    Err(AppError::InvalidInput("No file provided".to_string()))
}

async fn create_import(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let (file_name, data) = read_upload(multipart, state.config.max_file_size).await?;
    tracing::info!("Received {} ({}KB)", file_name, data.len() / 1024);

    let mut session = ImportSession::new(state.config.max_file_size);
    session.load_file(&file_name, &data)?;

    let view = SessionView::from(&session);
    state.sessions.insert(session);
    Ok((StatusCode::CREATED, Json(view)))
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.get(id)?;
    let (file_name, data) = read_upload(multipart, state.config.max_file_size).await?;
    tracing::info!("Received {} ({}KB) for session {}", file_name, data.len() / 1024, id);

    let mut session = session.lock();
    session.load_file(&file_name, &data)?;
    Ok(Json(SessionView::from(&*session)))
}

async fn get_import(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.get(id)?;
    let view = SessionView::from(&*session.lock());
    Ok(Json(view))
}

async fn update_mapping(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(update): Json<MappingUpdate>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.get(id)?;
    let mut session = session.lock();
    session.set_mapping(update.column, update.field)?;
    Ok(Json(SessionView::from(&*session)))
}

async fn preview_import(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PreviewResponse>, AppError> {
    let session = state.sessions.get(id)?;
    let mut session = session.lock();
    let rows = session.continue_to_preview(&state.config.board_id)?;
    Ok(Json(PreviewResponse {
        total_rows: session.document().row_count(),
        rows,
    }))
}

async fn back_to_mapping(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.get(id)?;
    let mut session = session.lock();
    session.back_to_mapping()?;
    Ok(Json(SessionView::from(&*session)))
}

async fn start_import(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ImportResult>, AppError> {
    let session = state.sessions.get(id)?;
    let snapshot = session.lock().begin_import()?;
    tracing::info!("Starting import for session {} ({} rows)", id, snapshot.document.row_count());

    let run = snapshot.run;
    let progress_session = session.clone();
    let mut progress = move |percent: u8| -> Result<(), AppError> {
        progress_session.lock().set_progress(run, percent);
        Ok(())
    };

    let outcome = run_import(
        state.posts_api.as_ref(),
        &snapshot.document,
        &snapshot.mapping,
        &state.import_options(),
        &mut progress,
    )
    .await;

    match outcome {
        Ok(result) => {
            if let Err(e) = session.lock().complete(run, result.clone()) {
                tracing::warn!("Session {} moved on before its import finished: {}", id, e);
            }
            Ok(Json(result))
        }
        Err(e) => {
            tracing::error!("Import for session {} failed: {}", id, e);
            session.lock().abort(run);
            Err(AppError::ImportFailed(
                "The import could not be completed, please try again".to_string(),
            ))
        }
    }
}

async fn download_errors(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(id)?;
    let report = {
        let session = session.lock();
        let result = session.result().ok_or(AppError::InvalidTransition {
            from: session.stage().as_str(),
            action: "download the error report",
        })?;
        error_report_csv(&result.errors)?
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"import-errors.csv\""),
        ],
        report,
    ))
}

async fn reset_import(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.get(id)?;
    let mut session = session.lock();
    session.reset();
    tracing::info!("Session {} reset", id);
    Ok(Json(SessionView::from(&*session)))
}

async fn delete_import(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}
