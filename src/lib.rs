//! Request helpers for axum services.
//!
//! [`Tools`] carries the per-service limits and exposes every operation:
//! strict JSON decoding with classified errors ([`Tools::read_json`]), the
//! `{error, message, data}` response envelope ([`Tools::write_json`],
//! [`Tools::error_json`]), outbound JSON pushes, multipart uploads with
//! content sniffing ([`Tools::upload_files`]) and forced-download static
//! files. Slugs, random names and directory creation live in [`util`].
//!
//! Nothing here keeps state between calls; a `Tools` value can be cloned
//! into handler state and shared freely.

mod config;
mod download;
pub mod error;
pub mod json;
pub mod upload;
pub mod util;

use std::io;
use std::path::Path;

pub use config::ToolsConfig;
pub use error::{
    DecodeError, DownloadError, EncodeError, PushError, SlugError, UploadError, UploadFailure,
};
pub use json::JsonResponse;
pub use upload::sniff::detect_content_type;
pub use upload::{RenamePolicy, UploadedFile};
pub use util::{create_dir_if_not_exists, random_string, slugify};

/// Default ceiling for a whole multipart body: 1 GiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1024 * 1024 * 1024;
/// Default ceiling for a JSON request body: 1 MiB.
pub const DEFAULT_MAX_JSON_BYTES: usize = 1024 * 1024;

/// Configuration shared by all helpers. Zero sizes mean "use the default".
#[derive(Debug, Clone, Default)]
pub struct Tools {
    pub max_upload_bytes: u64,
    /// Sniffed MIME types accepted by uploads, compared case-insensitively.
    /// Empty allows every type.
    pub allowed_file_types: Vec<String>,
    pub max_json_bytes: usize,
    pub allow_unknown_fields: bool,
}

impl Tools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a `Tools` from `WEBTOOLKIT_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        ToolsConfig::from_env().map(Self::from)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        match self.max_upload_bytes {
            0 => DEFAULT_MAX_UPLOAD_BYTES,
            n => n,
        }
    }

    pub fn max_json_bytes(&self) -> usize {
        match self.max_json_bytes {
            0 => DEFAULT_MAX_JSON_BYTES,
            n => n,
        }
    }

    pub fn random_string(&self, n: usize) -> String {
        random_string(n)
    }

    pub fn slugify(&self, s: &str) -> Result<String, SlugError> {
        slugify(s)
    }

    pub async fn create_dir_if_not_exists(&self, path: impl AsRef<Path>) -> io::Result<()> {
        create_dir_if_not_exists(path).await
    }
}

impl From<ToolsConfig> for Tools {
    fn from(config: ToolsConfig) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes.unwrap_or(0),
            allowed_file_types: config.allowed_file_types,
            max_json_bytes: config.max_json_bytes.unwrap_or(0),
            allow_unknown_fields: config.allow_unknown_fields,
        }
    }
}
