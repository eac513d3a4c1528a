//! Error types for every helper in the crate.
//!
//! Each concern gets its own enum so callers can match on the exact failure.
//! All messages are written to be shown to API clients as-is, and every
//! error converts into an error-envelope response through `IntoResponse`.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::json::JsonResponse;
use crate::upload::UploadedFile;

/// Failure while turning a request body into a typed value.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// `offset` is the number of bytes read when the error was detected;
    /// `None` means the body ended in the middle of a value.
    #[error("{}", malformed_message(.offset))]
    MalformedSyntax { offset: Option<u64> },
    #[error("{}", type_mismatch_message(.field, .offset))]
    TypeMismatch { field: Option<String>, offset: u64 },
    #[error("body must not be larger than {limit} bytes")]
    BodyTooLarge { limit: usize },
    #[error("body must not be empty")]
    EmptyBody,
    #[error("body contains unknown key \"{0}\"")]
    UnknownField(String),
    #[error("body must not contain more than one JSON payload")]
    MultiplePayloads,
    #[error("error unmarshalling JSON: {0}")]
    Unclassified(String),
}

fn malformed_message(offset: &Option<u64>) -> String {
    match offset {
        Some(offset) => format!("body contains badly formed JSON at character {}", offset),
        None => "body contains badly formed JSON (unexpected EOF)".to_string(),
    }
}

fn type_mismatch_message(field: &Option<String>, offset: &u64) -> String {
    match field {
        Some(field) => format!("body contains incorrect JSON type for field \"{}\"", field),
        None => format!("body contains incorrect JSON at character {}", offset),
    }
}

impl DecodeError {
    pub fn status(&self) -> StatusCode {
        match self {
            DecodeError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// The payload handed to `write_json` could not be serialized.
#[derive(Debug, thiserror::Error)]
#[error("failed to encode JSON response: {0}")]
pub struct EncodeError(#[from] pub serde_json::Error);

/// Failure while pushing JSON to a remote endpoint.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("failed to encode JSON payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("request to remote endpoint failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Failure while processing a multipart upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("files of type '{0}' are not allowed")]
    DisallowedFileType(String),
    #[error("the uploaded file is too large (limit {limit} bytes)")]
    PayloadTooLarge { limit: u64 },
    #[error("cannot create/utilize upload directory {}: {source}", .path.display())]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write uploaded file {}: {source}", .path.display())]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read uploaded part '{name}': {source}")]
    PartReadFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed multipart form: {0}")]
    MalformedForm(String),
    #[error("invalid file name '{0}'")]
    InvalidFileName(String),
    #[error("no file was uploaded")]
    NoFiles,
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::DisallowedFileType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            UploadError::MalformedForm(_)
            | UploadError::InvalidFileName(_)
            | UploadError::NoFiles => StatusCode::BAD_REQUEST,
            UploadError::DirectoryCreateFailed { .. }
            | UploadError::FileWriteFailed { .. }
            | UploadError::PartReadFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An aborted multi-file upload. `uploaded` holds the files that were
/// persisted before `error` stopped processing.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct UploadFailure {
    pub uploaded: Vec<UploadedFile>,
    #[source]
    pub error: UploadError,
}

impl UploadFailure {
    pub fn new(uploaded: Vec<UploadedFile>, error: UploadError) -> Self {
        Self { uploaded, error }
    }
}

impl From<UploadError> for UploadFailure {
    fn from(error: UploadError) -> Self {
        Self::new(Vec::new(), error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlugError {
    #[error("empty string not permitted")]
    EmptyInput,
    #[error("removing non-characters returns zero length slug")]
    NoValidCharacters,
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("display name '{0}' cannot be used as a download file name")]
    InvalidDisplayName(String),
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    pub fn status(&self) -> StatusCode {
        match self {
            DownloadError::NotFound(_) => StatusCode::NOT_FOUND,
            DownloadError::InvalidDisplayName(_) => StatusCode::BAD_REQUEST,
            DownloadError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn respond_with_error(status: StatusCode, message: String) -> Response {
    (status, Json(JsonResponse::failure(message))).into_response()
}

impl IntoResponse for DecodeError {
    fn into_response(self) -> Response {
        respond_with_error(self.status(), self.to_string())
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        respond_with_error(self.status(), self.to_string())
    }
}

impl IntoResponse for UploadFailure {
    fn into_response(self) -> Response {
        self.error.into_response()
    }
}

impl IntoResponse for SlugError {
    fn into_response(self) -> Response {
        respond_with_error(StatusCode::BAD_REQUEST, self.to_string())
    }
}

impl IntoResponse for DownloadError {
    fn into_response(self) -> Response {
        respond_with_error(self.status(), self.to_string())
    }
}
