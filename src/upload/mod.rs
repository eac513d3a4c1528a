//! Multipart upload processing.
//!
//! `Tools::upload_files` walks every file part of a multipart request in
//! stream order: sniff the first bytes, check the allow-list, pick a name,
//! make sure the directory exists and copy the part into place. The first
//! failure stops processing and the files persisted so far travel back with
//! the error.

mod form;
pub mod sniff;

use std::path::Path;

use axum::body::Body;
use axum::http::Request;
use serde::Serialize;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::error::{UploadError, UploadFailure};
use crate::util::{create_dir_if_not_exists, random_string, RANDOM_NAME_LEN};
use crate::Tools;

use self::form::{parse_multipart_form, SpooledPart};
use self::sniff::{detect_content_type, SNIFF_LEN};

/// Metadata for one persisted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Name the file was stored under inside the upload directory.
    pub new_file_name: String,
    /// Name sent by the client. Untrusted.
    pub original_file_name: String,
    pub file_size: u64,
}

/// How uploaded files are named on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenamePolicy {
    /// A random 25 character token plus the original extension.
    #[default]
    Random,
    /// The client-supplied base name. Existing files with the same name are
    /// overwritten.
    KeepOriginal,
}

impl Tools {
    /// Stores every file in the multipart `request` under `upload_dir`.
    ///
    /// On failure the returned [`UploadFailure`] still carries the files that
    /// were written before the failing part.
    pub async fn upload_files(
        &self,
        request: Request<Body>,
        upload_dir: impl AsRef<Path>,
        policy: RenamePolicy,
    ) -> Result<Vec<UploadedFile>, UploadFailure> {
        let upload_dir = upload_dir.as_ref();
        let (parts, body) = request.into_parts();
        let spooled = parse_multipart_form(&parts.headers, body, self.max_upload_bytes()).await?;

        let mut uploaded = Vec::with_capacity(spooled.len());
        for part in spooled {
            match self.store_part(part, upload_dir, policy).await {
                Ok(file) => uploaded.push(file),
                Err(error) => return Err(UploadFailure::new(uploaded, error)),
            }
        }
        Ok(uploaded)
    }

    /// Like [`Tools::upload_files`] but returns only the first file.
    pub async fn upload_one_file(
        &self,
        request: Request<Body>,
        upload_dir: impl AsRef<Path>,
        policy: RenamePolicy,
    ) -> Result<UploadedFile, UploadError> {
        let files = self
            .upload_files(request, upload_dir, policy)
            .await
            .map_err(|failure| failure.error)?;
        files.into_iter().next().ok_or(UploadError::NoFiles)
    }

    async fn store_part(
        &self,
        part: SpooledPart,
        upload_dir: &Path,
        policy: RenamePolicy,
    ) -> Result<UploadedFile, UploadError> {
        let SpooledPart {
            field_name,
            file_name,
            mut file,
        } = part;
        let read_failed = |source| UploadError::PartReadFailed {
            name: file_name.clone(),
            source,
        };

        file.rewind().await.map_err(read_failed)?;
        let mut head = Vec::with_capacity(SNIFF_LEN);
        (&mut file)
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut head)
            .await
            .map_err(read_failed)?;

        let file_type = detect_content_type(&head);
        if !self.is_allowed_type(file_type) {
            tracing::warn!(field = %field_name, file = %file_name, file_type, "rejected upload with disallowed type");
            return Err(UploadError::DisallowedFileType(file_type.to_string()));
        }

        file.rewind().await.map_err(read_failed)?;

        let new_file_name = match policy {
            RenamePolicy::Random => {
                format!("{}{}", random_string(RANDOM_NAME_LEN), extension(&file_name))
            }
            RenamePolicy::KeepOriginal => base_name(&file_name)
                .ok_or_else(|| UploadError::InvalidFileName(file_name.clone()))?
                .to_string(),
        };

        create_dir_if_not_exists(upload_dir)
            .await
            .map_err(|source| UploadError::DirectoryCreateFailed {
                path: upload_dir.to_path_buf(),
                source,
            })?;

        let target = upload_dir.join(&new_file_name);
        let file_size = persist(&mut file, &target).await?;
        tracing::debug!(file = %new_file_name, bytes = file_size, file_type, "stored upload");

        Ok(UploadedFile {
            new_file_name,
            original_file_name: file_name,
            file_size,
        })
    }

    fn is_allowed_type(&self, file_type: &str) -> bool {
        self.allowed_file_types.is_empty()
            || self
                .allowed_file_types
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(file_type))
    }
}

async fn persist(source: &mut File, target: &Path) -> Result<u64, UploadError> {
    let write_failed = |source| UploadError::FileWriteFailed {
        path: target.to_path_buf(),
        source,
    };
    let mut out = File::create(target).await.map_err(write_failed)?;
    let copied = tokio::io::copy(source, &mut out)
        .await
        .map_err(write_failed)?;
    out.flush().await.map_err(write_failed)?;
    Ok(copied)
}

/// Last path component of a client-supplied name, accepting both `/` and
/// `\` as separators.
fn base_name(name: &str) -> Option<&str> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    match base {
        "" | "." | ".." => None,
        base => Some(base),
    }
}

/// Extension of the base name including the leading dot, or an empty string.
fn extension(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    match base.rfind('.') {
        Some(idx) => &base[idx..],
        None => "",
    }
}
