//! Image reference resolution for codex invocations.
//!
//! Callers may pass images either as filesystem paths (forwarded to codex
//! verbatim) or as `data:` URIs. Data URIs are materialized into uniquely
//! named temp files because the codex CLI only accepts `--image <path>`.
//! The child process reads those files after we return from spawning it,
//! so they must outlive command construction; [`ResolvedImages`] tracks
//! every file it created and offers a best-effort [`cleanup`] hook for
//! after the child has exited.
//!
//! [`cleanup`]: ResolvedImages::cleanup

use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, warn};

use crate::error::{CodexError, CodexResult};

/// Image references resolved to filesystem paths, in request order.
///
/// Pass-through paths are kept untouched; each data URI yields exactly one
/// new temp file (no deduplication between identical URIs).
#[derive(Debug, Default)]
pub struct ResolvedImages {
    paths: Vec<PathBuf>,
    created: Vec<PathBuf>,
}

impl ResolvedImages {
    /// Resolve every image reference in `refs`, materializing data URIs.
    ///
    /// A failed resolution leaves nothing behind: temp files already
    /// written for earlier references are removed before the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`CodexError::InvalidImage`] when a base64 payload does not
    /// decode (the message names the offending image by position), or
    /// [`CodexError::Io`] when a temp file cannot be written.
    pub fn resolve(refs: &[String]) -> CodexResult<Self> {
        Self::resolve_in(&std::env::temp_dir(), refs)
    }

    /// As [`resolve`](Self::resolve), with temp files rooted at `dir`.
    fn resolve_in(dir: &Path, refs: &[String]) -> CodexResult<Self> {
        let mut resolved = Self::default();
        for (index, image_ref) in refs.iter().enumerate() {
            if image_ref.starts_with("data:") {
                let path = match write_data_uri(dir, index, image_ref) {
                    Ok(path) => path,
                    Err(e) => {
                        // Earlier temp files must not outlive a failed
                        // resolution.
                        resolved.cleanup();
                        return Err(e);
                    }
                };
                debug!(path = %path.display(), "materialized data URI image");
                resolved.created.push(path.clone());
                resolved.paths.push(path);
            } else {
                resolved.paths.push(PathBuf::from(image_ref));
            }
        }
        Ok(resolved)
    }

    /// All resolved image paths, in the order the references were given.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Paths of temp files this resolution created (data URIs only).
    pub fn created(&self) -> &[PathBuf] {
        &self.created
    }

    /// Best-effort removal of the temp files created by this resolution.
    ///
    /// Only call this once the child process has exited; codex reads the
    /// files during its run. Failures are logged at warn level and
    /// otherwise ignored. Calling twice is a no-op.
    pub fn cleanup(&mut self) {
        for path in self.created.drain(..) {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "failed to remove temp image");
            }
        }
    }
}

/// Decode a `data:` URI and persist its payload to a fresh `.png` temp file
/// under `dir`. `index` is the reference's zero-based position in the
/// request, used to name the offender in error messages.
///
/// URIs carrying a `base64,` marker have the portion after the first comma
/// base64-decoded; otherwise the raw remainder (after the first comma, or
/// after the scheme when no comma exists) is written as-is.
fn write_data_uri(dir: &Path, index: usize, uri: &str) -> CodexResult<PathBuf> {
    let rest = uri.strip_prefix("data:").unwrap_or(uri);

    let bytes: Vec<u8> = if uri.contains("base64,") {
        let encoded = uri.split_once(',').map_or(rest, |(_, payload)| payload);
        STANDARD
            .decode(encoded)
            .map_err(|e| CodexError::InvalidImage {
                reason: format!("image {}: base64 payload did not decode: {e}", index + 1),
            })?
    } else {
        let payload = rest.split_once(',').map_or(rest, |(_, payload)| payload);
        payload.as_bytes().to_vec()
    };

    let mut tmp = tempfile::Builder::new()
        .prefix("codex-image-")
        .suffix(".png")
        .tempfile_in(dir)
        .map_err(|source| CodexError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    tmp.write_all(&bytes).map_err(|source| CodexError::Io {
        path: tmp.path().to_path_buf(),
        source,
    })?;

    // keep() disarms the delete-on-drop guard; the file must survive for
    // the child process to read.
    let (_file, path) = tmp.keep().map_err(|e| CodexError::Io {
        path: e.file.path().to_path_buf(),
        source: e.error,
    })?;

    Ok(path)
}
