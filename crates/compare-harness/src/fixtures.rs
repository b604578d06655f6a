//! Fixture path conventions.
//!
//! Reference files live next to the output they are compared against,
//! with a `cmp_` prefix on the file name.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The reference sibling of an output path: `out/hello.pdf` pairs with
/// `out/cmp_hello.pdf`.
pub fn cmp_path_for(dest: impl AsRef<Path>) -> PathBuf {
    let dest = dest.as_ref();
    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!("cmp_{}", file_name))
}

/// Creates the parent directory of an output path if it does not exist.
pub fn ensure_parent_dir(dest: impl AsRef<Path>) -> io::Result<()> {
    if let Some(parent) = dest.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
