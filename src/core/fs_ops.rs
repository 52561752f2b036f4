// src/core/fs_ops.rs
//! File system helpers shared by the upload handler and the worker

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::utils::sanitize_file_name;

pub struct FsOps;

impl FsOps {
    pub async fn ensure_dir_exists(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)
                .await
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
            info!("Created directory: {}", path.display());
        }
        Ok(())
    }

    pub async fn read_bytes(path: &Path) -> Result<Vec<u8>> {
        fs::read(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))
    }

    pub async fn write_bytes(path: &Path, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            Self::ensure_dir_exists(parent).await?;
        }

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write file: {}", path.display()))?;
        Ok(())
    }

    pub async fn remove_dir_all(path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_dir_all(path)
                .await
                .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
            info!("Removed directory: {}", path.display());
        }
        Ok(())
    }

    /// Directory holding the documents of one submission
    pub fn submission_dir(upload_root: &Path, submission_id: &str) -> PathBuf {
        upload_root.join(sanitize_file_name(submission_id))
    }

    /// Pick a file name inside `dir` that is not taken yet
    pub fn unique_file_path(dir: &Path, file_name: &str) -> PathBuf {
        let safe = sanitize_file_name(file_name);
        let candidate = dir.join(&safe);
        if !candidate.exists() {
            return candidate;
        }

        let path = Path::new(&safe);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");
        let ext = path.extension().and_then(|s| s.to_str());

        let mut counter = 1;
        loop {
            let name = match ext {
                Some(ext) => format!("{}-{}.{}", stem, counter, ext),
                None => format!("{}-{}", stem, counter),
            };
            let candidate = dir.join(name);
            if !candidate.exists() {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Load the stored documents of a submission as (file name, bytes) pairs.
    /// Missing files are skipped with a warning.
    pub async fn load_submission_files(
        upload_root: &Path,
        submission_id: &str,
        file_names: &[String],
    ) -> Result<Vec<(String, Vec<u8>)>> {
        let dir = Self::submission_dir(upload_root, submission_id);
        let mut files = Vec::with_capacity(file_names.len());

        for name in file_names {
            let path = dir.join(name);
            if !path.exists() {
                warn!(
                    "Stored file missing for submission {}: {}",
                    submission_id,
                    path.display()
                );
                continue;
            }
            files.push((name.clone(), Self::read_bytes(&path).await?));
        }

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_unique_file_path_avoids_collisions() {
        let tmp = TempDir::new().unwrap();
        let first = FsOps::unique_file_path(tmp.path(), "cv.pdf");
        FsOps::write_bytes(&first, b"one").await.unwrap();

        let second = FsOps::unique_file_path(tmp.path(), "cv.pdf");
        assert_eq!(second.file_name().unwrap(), "cv-1.pdf");
    }

    #[tokio::test]
    async fn test_load_submission_files_skips_missing() {
        let tmp = TempDir::new().unwrap();
        let dir = FsOps::submission_dir(tmp.path(), "sub-1");
        FsOps::write_bytes(&dir.join("cv.txt"), b"hello").await.unwrap();

        let files = FsOps::load_submission_files(
            tmp.path(),
            "sub-1",
            &["cv.txt".to_string(), "gone.pdf".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "cv.txt");
        assert_eq!(files[0].1, b"hello");
    }
}
