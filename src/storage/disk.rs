//! On-disk size sampling

use std::fs;
use std::io;
use std::path::Path;

/// Total size of all regular files below `path`
#[cfg(feature = "rocksdb")]
pub fn dir_size(path: &Path) -> io::Result<u64> {
    let mut size = 0;
    for entry in walkdir::WalkDir::new(path) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() {
            size += entry.metadata().map_err(io::Error::from)?.len();
        }
    }
    Ok(size)
}

/// Size of a single file, zero if it does not exist
pub fn file_size(path: &Path) -> io::Result<u64> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e),
    }
}
