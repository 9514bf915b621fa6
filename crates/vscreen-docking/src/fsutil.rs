//! Append helpers shared by the ledger and the result store.

use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

/// Returns true when the file exists, is non-empty and its last byte is not
/// a newline, i.e. a previous write was cut short.
async fn has_torn_tail(path: &Path) -> std::io::Result<bool> {
    let mut file = match File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if file.metadata().await?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] != b'\n')
}

/// Whether the file is missing or empty.
pub(crate) async fn is_missing_or_empty(path: &Path) -> std::io::Result<bool> {
    match fs::metadata(path).await {
        Ok(m) => Ok(m.len() == 0),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e),
    }
}

/// Append `bytes` to `path`, creating it if needed, and sync to disk before
/// returning. A torn last line left by a crash is terminated first so the new
/// record starts on its own line.
pub(crate) async fn append_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let torn = has_torn_tail(path).await?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    if torn {
        file.write_all(b"\n").await?;
    }
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_data().await?;
    Ok(())
}

/// Read a whole text file, treating a missing file as empty.
pub(crate) async fn read_optional(path: &Path) -> std::io::Result<Option<String>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
