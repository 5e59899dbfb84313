use crate::models::{ErrorResponse, HealthResponse, PersonalityRecord, PredictionResponse, RootResponse};
use crate::schema::Personality;
use reqwest::multipart::{Form, Part};
use std::fmt;
use std::time::Duration;

/// Errors returned by [`PredictionClient`].
#[derive(Debug)]
pub enum ClientError {
    /// The request never produced a response.
    Transport(reqwest::Error),
    /// The service answered with a non-success status.
    Api { status: u16, detail: String },
    /// The response body could not be decoded.
    Decode(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(e) => write!(f, "request failed: {}", e),
            ClientError::Api { status, detail } => write!(f, "service returned {}: {}", status, detail),
            ClientError::Decode(msg) => write!(f, "failed to decode response: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err)
    }
}

/// Client for the personality prediction service.
#[derive(Clone)]
pub struct PredictionClient {
    client: reqwest::Client,
    base_url: String,
}

impl PredictionClient {
    /// Creates a new `PredictionClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Service root, e.g. `http://localhost:8000`.
    /// * `timeout` - Per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET / - service identity message.
    pub async fn root(&self) -> Result<String, ClientError> {
        let response = self.client.get(self.url("/")).send().await?;
        let body: RootResponse = decode_json(response).await?;
        Ok(body.message)
    }

    /// GET /health - returns the reported status, normally "healthy".
    pub async fn health(&self) -> Result<String, ClientError> {
        let response = self.client.get(self.url("/health")).send().await?;
        let body: HealthResponse = decode_json(response).await?;
        Ok(body.status)
    }

    /// POST /predict for one record.
    pub async fn predict(&self, record: &PersonalityRecord) -> Result<Personality, ClientError> {
        tracing::debug!("Requesting prediction from {}", self.base_url);
        let response = self
            .client
            .post(self.url("/predict"))
            .json(record)
            .send()
            .await?;

        let body: PredictionResponse = decode_json(response).await?;
        Ok(body.personality)
    }

    /// POST /predict-csv; returns the annotated CSV bytes.
    pub async fn predict_csv(
        &self,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<Vec<u8>, ClientError> {
        tracing::debug!("Uploading {} ({} bytes)", file_name, contents.len());
        let part = Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/predict-csv"))
            .multipart(form)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Turns a non-success response into [`ClientError::Api`], using the
/// service's `detail` message when the body has one.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let detail = serde_json::from_str::<ErrorResponse>(&text)
        .map(|body| body.detail)
        .unwrap_or(text);

    Err(ClientError::Api {
        status: status.as_u16(),
        detail,
    })
}

async fn decode_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let response = check_status(response).await?;
    response
        .json()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}
