use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::exit_codes::EXIT_OUTPUT;
use crate::CliError;

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Write `contents` to `<path>.tmp`, then rename it onto `path`.
/// A failure at any step leaves `path` untouched.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            CliError::new(EXIT_OUTPUT, format!("cannot create {}: {e}", parent.display()))
        })?;
    }

    let tmp = tmp_path(path);
    if let Err(e) = std::fs::write(&tmp, contents) {
        let _ = std::fs::remove_file(&tmp);
        return Err(CliError::new(EXIT_OUTPUT, format!("cannot write {}: {e}", tmp.display())));
    }

    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(CliError::new(
            EXIT_OUTPUT,
            format!("failed to rename tmp to {}: {e}", path.display()),
        ));
    }
    tracing::debug!(path = %path.display(), bytes = contents.len(), "output written");
    Ok(())
}
