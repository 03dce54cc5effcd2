//! `.gt` export files on disk
//!
//! Files are checked locally (extension, size bounds) before any upload; the
//! pipeline repeats the size checks server-side.

use std::path::{Path, PathBuf};

use gtvault_core::ErrorKind;

use crate::error::{TransferError, TransferResult};

/// Nonce plus tag: nothing shorter can be an export.
pub const MIN_EXPORT_SIZE: u64 = 28;

/// Largest export a `max_payload` plaintext ceiling can produce.
pub fn max_export_size(max_payload: usize) -> u64 {
    (max_payload as u64).saturating_add(MIN_EXPORT_SIZE)
}

/// Case-insensitive extension check. `ext` may carry a leading dot.
pub fn has_extension(path: &Path, ext: &str) -> bool {
    let want = ext.trim_start_matches('.');
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(want))
}

pub fn check_name(path: &Path, ext: &str) -> TransferResult<()> {
    if has_extension(path, ext) {
        Ok(())
    } else {
        Err(TransferError::invalid_file(
            ErrorKind::InvalidInput,
            format!(
                "Please select a .{} file",
                ext.trim_start_matches('.')
            ),
        ))
    }
}

pub fn check_size(len: u64, max: u64) -> TransferResult<()> {
    if len == 0 {
        return Err(TransferError::invalid_file(
            ErrorKind::InvalidInput,
            "File is empty",
        ));
    }
    if len < MIN_EXPORT_SIZE {
        return Err(TransferError::invalid_file(
            ErrorKind::MalformedData,
            "File is too small to be a valid export",
        ));
    }
    if len > max {
        return Err(TransferError::invalid_file(
            ErrorKind::PayloadTooLarge,
            format!("File is too large ({len} bytes, maximum {max})"),
        ));
    }
    Ok(())
}

/// Validate and read an export. The size is checked from metadata before
/// the contents are read.
pub async fn read_export(path: &Path, ext: &str, max: u64) -> TransferResult<Vec<u8>> {
    check_name(path, ext)?;
    let meta = tokio::fs::metadata(path).await?;
    check_size(meta.len(), max)?;

    let bytes = tokio::fs::read(path).await?;
    // file may have changed between stat and read
    check_size(bytes.len() as u64, max)?;
    Ok(bytes)
}

/// Write `bytes` as `dir/filename`, creating `dir` if needed.
pub async fn write_export(dir: &Path, filename: &str, bytes: &[u8]) -> TransferResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(filename);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}
