use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

/// A request-scoped temporary file. The file is removed when the guard is
/// dropped, on every exit path; a file that was never written (or already
/// removed) is ignored, and any other removal failure is logged and
/// suppressed so it can never mask the request's primary outcome.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Reserve a scratch path under `dir` with the given filename. The file
    /// itself is created later by whoever writes to the path.
    pub fn new(dir: &Path, filename: &str) -> Self {
        Self {
            path: dir.join(filename),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed scratch file"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to remove scratch file");
            }
        }
    }
}

/// Build a collision-resistant scratch filename: `{prefix}_{uuid}_{basename}`,
/// where the basename is taken from the source URL or path with any query
/// string stripped.
pub fn unique_filename(prefix: &str, source: &str) -> String {
    let basename = source
        .rsplit('/')
        .next()
        .unwrap_or(source)
        .split('?')
        .next()
        .unwrap_or_default();
    format!("{prefix}_{}_{basename}", Uuid::new_v4())
}
