//! Local file reads and writes for attachments, downloads and build logs.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::{ActionError, ActionResult};

/// Read a local file for upload
pub fn read_payload(path: &Path) -> ActionResult<Vec<u8>> {
  fs::read(path).map_err(|err| ActionError::Access(format!("{}: {}", path.display(), err)))
}

/// Where a download named `file_name` should be written.
///
/// An empty target means the working directory; a directory target gets the
/// file name appended. Only the last component of `file_name` is used, since
/// it comes from the server. An existing regular file is never overwritten.
pub fn resolve_target(target: &str, file_name: &str) -> ActionResult<PathBuf> {
  let target = target.trim();
  let path = if target.is_empty() {
    PathBuf::from(bare_name(file_name)?)
  } else if Path::new(target).is_dir() {
    Path::new(target).join(bare_name(file_name)?)
  } else {
    PathBuf::from(target)
  };

  if path.exists() {
    return Err(ActionError::Access(format!("{} already exists", path.display())));
  }
  Ok(path)
}

fn bare_name(file_name: &str) -> ActionResult<&std::ffi::OsStr> {
  Path::new(file_name)
    .file_name()
    .filter(|name| !name.is_empty())
    .ok_or_else(|| ActionError::invalid_input(format!("unusable file name '{}'", file_name)))
}

/// Write downloaded bytes to `path`
pub fn write_payload(path: &Path, content: &[u8]) -> ActionResult<()> {
  fs::write(path, content).map_err(|err| ActionError::Access(format!("{}: {}", path.display(), err)))?;
  info!("Wrote {} bytes to {}", content.len(), path.display());
  Ok(())
}
