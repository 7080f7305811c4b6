// src/core/fs_ops.rs
//! File helpers shared by the persistent stores

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub struct FsOps;

impl FsOps {
    /// Create the parent directory of `path` if it has one and it is missing
    pub async fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
                debug!("Created directory: {}", parent.display());
            }
        }
        Ok(())
    }

    /// Read a file, mapping "not found" to `None`
    pub async fn read_optional(path: &Path) -> std::io::Result<Option<String>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Replace the whole file through a sibling temp file and a rename
    pub async fn write_replace(path: &Path, content: &str) -> std::io::Result<()> {
        Self::ensure_parent_dir(path).await?;

        let tmp = Self::temp_sibling(path);
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, path).await?;
        debug!("Written file: {}", path.display());
        Ok(())
    }

    /// Append one line and wait until it reaches the disk
    pub async fn append_line_durable(path: &Path, line: &str) -> std::io::Result<()> {
        Self::ensure_parent_dir(path).await?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        file.write_all(&bytes).await?;
        file.sync_data().await?;
        Ok(())
    }

    fn temp_sibling(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("state");
        path.with_file_name(format!(".{}.tmp", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_optional_missing() {
        let dir = TempDir::new().expect("tempdir");
        let got = FsOps::read_optional(&dir.path().join("absent.txt"))
            .await
            .expect("read");
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_append_creates_parent_and_appends() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("ids.txt");
        FsOps::append_line_durable(&path, "a").await.expect("append a");
        FsOps::append_line_durable(&path, "b").await.expect("append b");
        let content = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(content, "a\nb\n");
    }

    #[tokio::test]
    async fn test_write_replace_overwrites() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("doc.json");
        FsOps::write_replace(&path, "first").await.expect("write");
        FsOps::write_replace(&path, "second").await.expect("rewrite");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "second");
        assert!(!dir.path().join(".doc.json.tmp").exists());
    }
}
