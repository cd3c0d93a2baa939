//! Filesystem helpers.

use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::error::Result;

/// Write bytes atomically (write to temp, then rename).
///
/// Missing parent directories are created.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
