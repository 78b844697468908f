//! Atomic replacement of files inside a capability directory.
//!
//! Contents are written to a hidden temporary sibling, synced, and renamed
//! over the target, so readers never observe a half-written document.

use std::io::{self, Write};

use cap_std::fs::{Dir, OpenOptions};
use uuid::Uuid;

/// Replace `file_name` inside `dir` with `contents`.
///
/// # Errors
///
/// Returns the underlying I/O error when the temporary file cannot be
/// written or renamed; the temporary file is removed on failure.
pub(crate) fn write_atomic(dir: &Dir, file_name: &str, contents: &[u8]) -> io::Result<()> {
    if file_name.is_empty() || file_name.contains(['/', '\\']) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{file_name}' is not a plain file name"),
        ));
    }
    let tmp_name = format!(".{file_name}.tmp.{}", Uuid::new_v4().simple());

    let written =
        write_temp(dir, &tmp_name, contents).and_then(|()| replace(dir, &tmp_name, file_name));
    if written.is_err() {
        drop(dir.remove_file(&tmp_name));
    }
    written?;

    if dir.open(".").and_then(|handle| handle.sync_all()).is_err() {
        // Directory sync is best effort.
    }
    Ok(())
}

fn write_temp(dir: &Dir, tmp_name: &str, contents: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    let mut file = dir.open_with(tmp_name, &options)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(windows)]
fn replace(dir: &Dir, tmp_name: &str, file_name: &str) -> io::Result<()> {
    match dir.remove_file(file_name) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    dir.rename(tmp_name, dir, file_name)
}

#[cfg(not(windows))]
fn replace(dir: &Dir, tmp_name: &str, file_name: &str) -> io::Result<()> {
    dir.rename(tmp_name, dir, file_name)
}
