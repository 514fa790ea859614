//! Static file server
//!
//! Every path not claimed by another route is mapped onto a file below the
//! root directory. Directory requests serve their `index.html`.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use axum::{handler::HandlerWithoutStateExt, http::StatusCode, http::Uri, Router};
use percent_encoding::percent_decode_str;
use tower_http::services::ServeDir;
use tracing::debug;

/// Fails unless `root` is an existing directory.
pub fn ensure_root(root: &Path) -> Result<()> {
    let metadata = root
        .metadata()
        .with_context(|| format!("static folder {root:?} is not accessible"))?;

    if !metadata.is_dir() {
        bail!("static folder {root:?} is not a directory");
    }

    Ok(())
}

/// Serves the files below `root` for every request `router` does not handle.
pub fn register(router: Router, root: impl Into<PathBuf>) -> Router {
    let root = root.into();

    let fallback = {
        let root = root.clone();
        move |uri: Uri| {
            let root = root.clone();
            async move { not_served(&root, uri.path()) }
        }
    };

    router.fallback_service(ServeDir::new(&root).fallback(fallback.into_service()))
}

/// Status for a request the file service could not answer.
///
/// A regular file that exists below `root` but could not be opened is
/// forbidden; everything else, including paths escaping `root`, is not found.
fn not_served(root: &Path, request_path: &str) -> StatusCode {
    let status = match resolve(root, request_path) {
        Some(path) if path.is_file() => StatusCode::FORBIDDEN,
        _ => StatusCode::NOT_FOUND,
    };

    debug!(path = request_path, %status, "static file not served");

    status
}

/// Maps a request path onto `root`, refusing anything that could leave it.
///
/// The path is percent-decoded first, the same way the file service decodes it.
fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
    let mut path = root.to_path_buf();

    for segment in decoded.split('/') {
        if segment.contains('\\') {
            return None;
        }

        match Path::new(segment).components().next() {
            None | Some(Component::CurDir) => {}
            Some(Component::Normal(name)) => path.push(name),
            _ => return None,
        }
    }

    Some(path)
}
