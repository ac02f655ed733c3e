//! Moving a finished download from the engine's temp file to its destination.

use std::path::Path;

use super::TransferError;

/// Move `temp` to `destination`. Rename first; when that fails but the
/// destination directory exists (e.g. temp dir on another filesystem), copy
/// and remove the temp file. The destination directory is never created.
pub async fn relocate_artifact(temp: &Path, destination: &Path) -> Result<(), TransferError> {
    let rename_err = match tokio::fs::rename(temp, destination).await {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    let parent_exists = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => tokio::fs::metadata(p)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false),
        _ => true,
    };
    if !parent_exists {
        return Err(relocation_error(destination, rename_err));
    }
    tokio::fs::copy(temp, destination)
        .await
        .map_err(|e| relocation_error(destination, e))?;
    if let Err(e) = tokio::fs::remove_file(temp).await {
        tracing::debug!(temp = %temp.display(), "temp file left behind: {}", e);
    }
    Ok(())
}

fn relocation_error(destination: &Path, e: std::io::Error) -> TransferError {
    TransferError::Relocation {
        destination: destination.to_path_buf(),
        reason: e.to_string(),
    }
}
