//! The cache version stamp: a 4-byte big-endian integer naming the last
//! software version whose assets were extracted.

use crate::error::{StampReadError, StampWriteError};
use std::fs;
use std::io::Write;
use std::path::Path;

const STAMP_LEN: usize = 4;

pub fn read_stamp(path: &Path) -> Result<u32, StampReadError> {
    let bytes = fs::read(path).map_err(|source| StampReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let raw: [u8; STAMP_LEN] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| StampReadError::Corrupt {
            path: path.to_path_buf(),
            len: bytes.len(),
        })?;

    Ok(u32::from_be_bytes(raw))
}

/// Replaces the stamp via a temporary sibling and a rename.
pub fn write_stamp(path: &Path, version: u32) -> Result<(), StampWriteError> {
    let to_err = |source: std::io::Error| StampWriteError {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let mut file = fs::File::create(&tmp).map_err(to_err)?;
    file.write_all(&version.to_be_bytes()).map_err(to_err)?;
    file.sync_all().map_err(to_err)?;
    drop(file);

    fs::rename(&tmp, path).map_err(to_err)
}
