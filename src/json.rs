//! JSON exchange: strict request decoding, the response envelope and
//! outbound pushes.
//!
//! Decoding reads the body through a byte limiter, decodes exactly one value
//! and maps every failure onto a [`DecodeError`] kind with a message that can
//! go straight back to the client.

use std::error::Error as StdError;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::error::Category;

use crate::error::{DecodeError, EncodeError, PushError};
use crate::Tools;

/// Uniform wire shape for structured responses.
///
/// `data` is only ever present on success responses; the constructors are
/// the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonResponse<T = serde_json::Value> {
    error: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T> JsonResponse<T> {
    pub fn success(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            error: false,
            message: message.into(),
            data,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

impl JsonResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            data: None,
        }
    }
}

impl Tools {
    /// Reads `body` (at most `max_json_bytes`) and decodes it into `T`.
    pub async fn read_json<T: DeserializeOwned>(&self, body: Body) -> Result<T, DecodeError> {
        let limit = self.max_json_bytes();
        let bytes = match Limited::new(body, limit).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if is_length_limit(err.as_ref()) => {
                tracing::warn!(limit, "request body exceeded configured limit");
                return Err(DecodeError::BodyTooLarge { limit });
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to read request body");
                return Err(DecodeError::Unclassified(err.to_string()));
            }
        };
        self.decode_json(&bytes)
    }

    /// Decodes an already buffered body into `T` under the same rules as
    /// [`Tools::read_json`].
    ///
    /// Unknown keys are detected while the value is being visited. Targets
    /// that make serde buffer the input first (internally or adjacently
    /// tagged enums, untagged enums, `#[serde(flatten)]` fields) hide extra
    /// keys from that check, so they decode without `UnknownField`. Tagged
    /// enums can opt back in by wrapping each variant's payload in a struct
    /// marked `#[serde(deny_unknown_fields)]`.
    pub fn decode_json<T: DeserializeOwned>(&self, body: &[u8]) -> Result<T, DecodeError> {
        let limit = self.max_json_bytes();
        if body.len() > limit {
            return Err(DecodeError::BodyTooLarge { limit });
        }
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(DecodeError::EmptyBody);
        }

        let mut unknown: Option<String> = None;
        let mut on_ignored = |path: serde_ignored::Path<'_>| {
            if unknown.is_none() {
                unknown = Some(path.to_string());
            }
        };
        let mut track = serde_path_to_error::Track::new();
        let mut de = serde_json::Deserializer::from_slice(body);
        let result = {
            let ignored = serde_ignored::Deserializer::new(&mut de, &mut on_ignored);
            T::deserialize(serde_path_to_error::Deserializer::new(ignored, &mut track))
        };

        if !self.allow_unknown_fields {
            if let Some(field) = unknown {
                return Err(DecodeError::UnknownField(field));
            }
        }
        let value = result.map_err(|err| classify(err, track.path(), body))?;
        de.end().map_err(|_| DecodeError::MultiplePayloads)?;
        Ok(value)
    }

    /// Serializes `data` into a JSON response with the given status.
    ///
    /// `headers` are copied onto the response verbatim before
    /// `Content-Type: application/json` is set.
    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        status: StatusCode,
        data: &T,
        headers: Option<&HeaderMap>,
    ) -> Result<Response, EncodeError> {
        let out = serde_json::to_vec(data)?;
        let mut response = Response::new(Body::from(out));
        *response.status_mut() = status;
        if let Some(extra) = headers {
            for (name, value) in extra {
                response.headers_mut().append(name, value.clone());
            }
        }
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(response)
    }

    /// Sends `err` to the client as an error envelope. `status` defaults to
    /// 400 Bad Request.
    pub fn error_json(
        &self,
        err: &dyn std::fmt::Display,
        status: Option<StatusCode>,
    ) -> Result<Response, EncodeError> {
        let payload = JsonResponse::failure(err.to_string());
        self.write_json(status.unwrap_or(StatusCode::BAD_REQUEST), &payload, None)
    }

    /// POSTs `data` as JSON to `uri` and hands back the live response with
    /// its status. A default client is used when `client` is `None`.
    ///
    /// The response body is not consumed; the caller decides whether to read
    /// or drop it.
    pub async fn push_json_to_remote<T: Serialize + ?Sized>(
        &self,
        uri: &str,
        data: &T,
        client: Option<&reqwest::Client>,
    ) -> Result<(reqwest::Response, StatusCode), PushError> {
        let payload = serde_json::to_vec(data)?;
        let default_client;
        let client = match client {
            Some(client) => client,
            None => {
                default_client = reqwest::Client::builder().build()?;
                &default_client
            }
        };
        let response = client
            .post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|err| {
                tracing::warn!(uri, error = %err, "push to remote failed");
                PushError::Transport(err)
            })?;
        let status = response.status();
        tracing::debug!(uri, status = status.as_u16(), "pushed JSON to remote");
        Ok((response, status))
    }
}

fn is_length_limit(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if err.is::<LengthLimitError>() {
            return true;
        }
        current = err.source();
    }
    false
}

fn classify(err: serde_json::Error, path: serde_path_to_error::Path, body: &[u8]) -> DecodeError {
    match err.classify() {
        Category::Eof => DecodeError::MalformedSyntax { offset: None },
        Category::Syntax => DecodeError::MalformedSyntax {
            offset: Some(byte_offset(body, err.line(), err.column())),
        },
        Category::Data => {
            let message = bare_message(&err);
            if let Some(field) = unknown_field_name(&message) {
                return DecodeError::UnknownField(field.to_string());
            }
            if is_type_error(&message) {
                let field = (path.iter().next().is_some()).then(|| path.to_string());
                return DecodeError::TypeMismatch {
                    field,
                    offset: byte_offset(body, err.line(), err.column()),
                };
            }
            DecodeError::Unclassified(message)
        }
        Category::Io => DecodeError::Unclassified(bare_message(&err)),
    }
}

/// Converts serde_json's 1-based line/column into the number of bytes read.
fn byte_offset(body: &[u8], line: usize, column: usize) -> u64 {
    let line_start: usize = body
        .split_inclusive(|b| *b == b'\n')
        .take(line.saturating_sub(1))
        .map(<[u8]>::len)
        .sum();
    (line_start + column) as u64
}

/// The error text without serde_json's " at line L column C" suffix.
fn bare_message(err: &serde_json::Error) -> String {
    let full = err.to_string();
    let suffix = format!(" at line {} column {}", err.line(), err.column());
    match full.strip_suffix(&suffix) {
        Some(bare) => bare.to_string(),
        None => full,
    }
}

fn unknown_field_name(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("unknown field `")?;
    rest.split('`').next()
}

fn is_type_error(message: &str) -> bool {
    ["invalid type", "invalid value", "invalid length"]
        .iter()
        .any(|prefix| message.starts_with(prefix))
}
