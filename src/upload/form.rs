//! Multipart form parsing.
//!
//! The whole form is read before any file is inspected: each file part is
//! spooled into an anonymous temporary file while `multer` enforces the
//! aggregate size ceiling. An oversized body therefore fails here, before a
//! single file reaches the upload directory.

use axum::body::Body;
use axum::http::{header, HeaderMap};
use multer::{Constraints, Multipart, SizeLimit};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::UploadError;

/// A file part that has been fully received and spooled.
#[derive(Debug)]
pub(crate) struct SpooledPart {
    pub field_name: String,
    pub file_name: String,
    pub file: File,
}

/// Reads every part of a `multipart/form-data` body. Non-file fields are
/// drained and discarded.
pub(crate) async fn parse_multipart_form(
    headers: &HeaderMap,
    body: Body,
    max_bytes: u64,
) -> Result<Vec<SpooledPart>, UploadError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| UploadError::MalformedForm("missing Content-Type header".into()))?;
    let boundary = multer::parse_boundary(content_type).map_err(|_| {
        UploadError::MalformedForm("expected multipart/form-data with boundary".into())
    })?;

    let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(max_bytes));
    let mut multipart = Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

    let mut parts = Vec::new();
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| form_error(e, max_bytes))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        // An empty `<input type=file>` arrives as `filename=""`; treat it as a
        // plain value.
        let Some(file_name) = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
        else {
            while field
                .chunk()
                .await
                .map_err(|e| form_error(e, max_bytes))?
                .is_some()
            {}
            continue;
        };

        let spool = tempfile::tempfile().map_err(|source| UploadError::PartReadFailed {
            name: file_name.clone(),
            source,
        })?;
        let mut file = File::from_std(spool);
        while let Some(chunk) = field.chunk().await.map_err(|e| form_error(e, max_bytes))? {
            file.write_all(&chunk)
                .await
                .map_err(|source| UploadError::PartReadFailed {
                    name: file_name.clone(),
                    source,
                })?;
        }
        file.flush()
            .await
            .map_err(|source| UploadError::PartReadFailed {
                name: file_name.clone(),
                source,
            })?;
        parts.push(SpooledPart {
            field_name,
            file_name,
            file,
        });
    }
    Ok(parts)
}

fn form_error(err: multer::Error, max_bytes: u64) -> UploadError {
    match err {
        multer::Error::StreamSizeExceeded { .. } | multer::Error::FieldSizeExceeded { .. } => {
            tracing::warn!(limit = max_bytes, "multipart body exceeded configured limit");
            UploadError::PayloadTooLarge { limit: max_bytes }
        }
        other => UploadError::MalformedForm(other.to_string()),
    }
}
