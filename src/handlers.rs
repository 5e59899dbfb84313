use crate::batch;
use crate::classifier::{predict_labels, Classifier};
use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::models::{HealthResponse, PersonalityInput, PredictionResponse, RootResponse};
use crate::preprocessing::preprocess;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// Multipart field name carrying the CSV upload.
pub const UPLOAD_FIELD: &str = "file";

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Model loaded at startup; read-only for the life of the process.
    pub classifier: Arc<dyn Classifier>,
    /// Application configuration.
    pub config: Config,
}

impl AppState {
    pub fn new(classifier: Arc<dyn Classifier>, config: Config) -> Self {
        Self { classifier, config }
    }
}

/// GET /
///
/// Service identity.
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses((status = 200, description = "Service is running", body = RootResponse))
)]
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Personality API is running".to_string(),
    })
}

/// Health check endpoint.
///
/// The model is loaded before the listener binds, so a process that answers
/// is a process that can predict.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
        }),
    )
}

/// POST /predict
///
/// Predicts the personality type of a single record.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `payload` - JSON body with the seven behavioral fields.
///
/// # Returns
///
/// * `Result<Json<PredictionResponse>, AppError>` - The predicted label, or a
///   400 for invalid input and a 500 if inference fails.
#[utoipa::path(
    post,
    path = "/predict",
    tag = "prediction",
    request_body = PersonalityInput,
    responses(
        (status = 200, description = "Prediction successful", body = PredictionResponse),
        (status = 400, description = "Invalid or incomplete record", body = crate::models::ErrorResponse),
        (status = 429, description = "Rate limit exceeded"),
        (status = 408, description = "Request timed out", body = crate::models::ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = crate::models::ErrorResponse),
        (status = 500, description = "Prediction failed", body = crate::models::ErrorResponse)
    )
)]
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PersonalityInput>, JsonRejection>,
) -> Result<Json<PredictionResponse>, AppError> {
    let Json(input) = payload?;
    let row = preprocess(&input)?;
    tracing::debug!("POST /predict - features: {:?}", row);

    let personality = predict_labels(state.classifier.as_ref(), &[row])?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::InternalError("model returned no prediction".to_string()))?;

    tracing::info!("Prediction successful: {}", personality);
    Ok(Json(PredictionResponse::success(personality)))
}

/// POST /predict-csv
///
/// Predicts every row of an uploaded CSV file and returns the file with a
/// `Predicted_Personality` column appended.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `multipart` - Form upload with the CSV in the `file` field.
///
/// # Returns
///
/// * `Result<Response, AppError>` - `predictions.csv` as an attachment, or an
///   error if any row is invalid.
#[utoipa::path(
    post,
    path = "/predict-csv",
    tag = "prediction",
    request_body(content = crate::models::CsvUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Annotated CSV file", content_type = "text/csv", body = String),
        (status = 400, description = "Malformed file, missing column or invalid row", body = crate::models::ErrorResponse),
        (status = 413, description = "Upload too large", body = crate::models::ErrorResponse),
        (status = 429, description = "Rate limit exceeded"),
        (status = 408, description = "Request timed out", body = crate::models::ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = crate::models::ErrorResponse),
        (status = 500, description = "Prediction failed", body = crate::models::ErrorResponse)
    )
)]
pub async fn predict_csv(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let (file_name, data) = read_upload(multipart).await?;
    tracing::info!("POST /predict-csv - received {} ({} bytes)", file_name, data.len());

    let classifier = Arc::clone(&state.classifier);
    let output = tokio::task::spawn_blocking(move || batch::predict_csv(classifier.as_ref(), &data))
        .await?
        .context("CSV prediction failed")?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=predictions.csv",
            ),
        ],
        output,
    )
        .into_response())
}

/// Reads the CSV part of a multipart upload fully into memory.
///
/// Takes the `file` field, or failing that the first part that carries a
/// file name.
async fn read_upload(mut multipart: Multipart) -> Result<(String, Bytes), AppError> {
    while let Some(field) = multipart.next_field().await? {
        let is_upload = field.name() == Some(UPLOAD_FIELD) || field.file_name().is_some();
        if !is_upload {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.csv").to_string();
        let data = field.bytes().await?;
        return Ok((file_name, data));
    }

    Err(AppError::BadRequest(format!(
        "No file uploaded; expected a multipart field named '{}'",
        UPLOAD_FIELD
    )))
}
