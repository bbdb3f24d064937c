use std::fs::{create_dir_all, remove_file};
use std::io;
use std::path::{Path, PathBuf};

use failure::{format_err, Error, ResultExt};

/// Creates the directory that will hold `path`, if any.
pub fn create_parent_all(path: &Path) -> Result<(), Error> {
    let parent_path = match path.parent() {
        Some(t) if !t.as_os_str().is_empty() => t,
        _ => return Ok(()),
    };
    create_dir_all(parent_path)
        .with_context(|_| format!("create_dir_all({:?}) failed", parent_path))?;
    Ok(())
}

/// Removes `path`, returning whether it existed.
pub fn remove_file_if_exists(path: &Path) -> Result<bool, Error> {
    match remove_file(path) {
        Ok(()) => Ok(true),
        Err(ref e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::from(e).context(format!("remove_file({:?}) failed", path)).into()),
    }
}

/// Removes an SQLite database together with its rollback journal.
pub fn remove_database(path: &Path) -> Result<bool, Error> {
    let existed = remove_file_if_exists(path)?;
    remove_file_if_exists(&journal_path(path))?;
    Ok(existed)
}

fn journal_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push("-journal");
    PathBuf::from(s)
}

/// `file:` URI for `path`, as understood by `sqlite3_open_v2()` with `SQLITE_OPEN_URI`.
pub fn sqlite_uri(path: &Path, mode: &str) -> Result<String, Error> {
    let s = path.to_str().ok_or_else(|| format_err!("Malformed path: {:?}", path))?;
    let escaped = s
        .replace('%', "%25")
        .replace('?', "%3f")
        .replace('#', "%23");
    Ok(format!("file:{}?mode={}", escaped, mode))
}
