//! OpenAPI document and Swagger UI page.

use crate::handlers;
use crate::models::{
    CsvUpload, ErrorResponse, HealthResponse, PersonalityInput, PersonalityRecord,
    PredictionResponse, RootResponse,
};
use crate::schema::{Personality, YesNo};
use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Personality Prediction API",
        description = "Predicts personality type from behavioral data"
    ),
    paths(
        handlers::root,
        handlers::health,
        handlers::predict,
        handlers::predict_csv
    ),
    components(schemas(
        PersonalityInput,
        PersonalityRecord,
        PredictionResponse,
        RootResponse,
        HealthResponse,
        ErrorResponse,
        CsvUpload,
        Personality,
        YesNo
    )),
    tags(
        (name = "health", description = "Liveness endpoints"),
        (name = "prediction", description = "Single-record and batch prediction")
    )
)]
pub struct ApiDoc;

/// Serves the generated OpenAPI document as JSON.
pub async fn serve_openapi_spec() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Serves the Swagger UI HTML page.
///
/// This endpoint returns an HTML page that embeds the Swagger UI, configured to
/// load the OpenAPI specification served by `serve_openapi_spec`.
pub async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Personality Prediction API - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.json",
                dom_id: '#swagger-ui',
                deepLinking: true,
                displayRequestDuration: true
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}
