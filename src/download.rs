use std::path::Path;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request};
use axum::response::Response;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::DownloadError;
use crate::Tools;

impl Tools {
    /// Serves the file at `path` and asks the browser to save it as
    /// `display_name` instead of rendering it.
    ///
    /// A missing file stops here with [`DownloadError::NotFound`]; nothing
    /// is served in that case.
    pub async fn download_static_file(
        &self,
        request: Request<Body>,
        path: impl AsRef<Path>,
        display_name: &str,
    ) -> Result<Response, DownloadError> {
        let path = path.as_ref();
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(DownloadError::NotFound(path.to_path_buf())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "requested download does not exist");
                return Err(DownloadError::NotFound(path.to_path_buf()));
            }
            Err(source) => {
                return Err(DownloadError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }

        let disposition = content_disposition(display_name)?;
        let response = match ServeFile::new(path).oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let mut response = response.map(Body::new);
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, disposition);
        Ok(response)
    }
}

fn content_disposition(display_name: &str) -> Result<HeaderValue, DownloadError> {
    let escaped = display_name.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", escaped))
        .map_err(|_| DownloadError::InvalidDisplayName(display_name.to_string()))
}
