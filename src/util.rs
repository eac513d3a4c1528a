//! Small standalone helpers: random names, slugs and directory creation.
//!
//! None of these touch request state. They are re-exported from the crate
//! root and also reachable through `Tools` for callers that prefer a single
//! entry point.

use std::io;
use std::path::Path;

use once_cell::sync::Lazy;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::OsRng;
use regex::Regex;

use crate::error::SlugError;

/// Characters used by [`random_string`]. Exactly 64 entries.
pub const RANDOM_STRING_SOURCE: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_+";

/// Length of the token used when an upload is renamed.
pub const RANDOM_NAME_LEN: usize = 25;

static NON_SLUG_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

/// Returns `n` characters drawn independently from [`RANDOM_STRING_SOURCE`].
///
/// Indices come from the operating system RNG through `Uniform`, which uses
/// rejection sampling, so every character of the alphabet is equally likely.
pub fn random_string(n: usize) -> String {
    let alphabet = RANDOM_STRING_SOURCE.as_bytes();
    let index = Uniform::from(0..alphabet.len());
    let mut rng = OsRng;
    (0..n)
        .map(|_| alphabet[index.sample(&mut rng)] as char)
        .collect()
}

/// Converts `s` into a URL safe slug.
///
/// Runs of anything outside `[a-z0-9]` (after lower-casing) collapse into a
/// single `-`, and leading/trailing hyphens are removed.
pub fn slugify(s: &str) -> Result<String, SlugError> {
    if s.trim_matches(' ').is_empty() {
        return Err(SlugError::EmptyInput);
    }
    let lower = s.to_lowercase();
    let slug = NON_SLUG_RUN.replace_all(&lower, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        return Err(SlugError::NoValidCharacters);
    }
    Ok(slug.to_string())
}

/// Creates `path` and any missing parents. An existing directory is fine.
pub async fn create_dir_if_not_exists(path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    if tokio::fs::metadata(path).await.is_ok() {
        return Ok(());
    }
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o755);
    builder.create(path).await
}
