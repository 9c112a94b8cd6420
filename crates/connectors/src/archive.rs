use async_trait::async_trait;
use chrono::Local;
use mirror_core::{archive::PageArchive, error::ArchiveError};
use model::entity::EntityKind;
use serde_json::Value;
use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info, warn};

/// Filesystem page archive.
///
/// Pages are written to a sibling temp file, fsynced and renamed into place,
/// so a crash mid-write leaves at worst a `.tmp` leftover and never a
/// partial archived page. The sweep deletes archived pages whose mtime is
/// past the retention horizon.
pub struct FsPageArchive {
    dir: PathBuf,
    retention: Duration,
}

impl FsPageArchive {
    pub fn new(dir: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            dir: dir.into(),
            retention,
        }
    }

    async fn sweep_before(&self, cutoff: SystemTime) -> Result<usize, ArchiveError> {
        let mut deleted = 0usize;
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            // Nothing archived yet.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            match Self::sweep_one(&path, cutoff).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(path = %path.display(), %err, "failed to sweep archived page, skipping");
                }
            }
        }
        Ok(deleted)
    }

    async fn sweep_one(path: &Path, cutoff: SystemTime) -> Result<bool, ArchiveError> {
        let meta = fs::metadata(path).await?;
        if !meta.is_file() {
            return Ok(false);
        }
        let modified = meta.modified()?;
        if modified < cutoff {
            fs::remove_file(path).await?;
            debug!(path = %path.display(), "deleted expired archived page");
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl PageArchive for FsPageArchive {
    async fn archive(
        &self,
        entity: EntityKind,
        start_index: u64,
        raw: &Value,
    ) -> Result<PathBuf, ArchiveError> {
        fs::create_dir_all(&self.dir).await?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!(
            "{}_page_{}_{}.json",
            entity.profile().archive_prefix,
            start_index,
            timestamp
        );
        let path = self.dir.join(&filename);
        let tmp_path = self.dir.join(format!("{filename}.tmp"));

        let body = serde_json::to_vec_pretty(raw)?;
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp_path, &path).await?;

        debug!(path = %path.display(), "archived raw page");
        Ok(path)
    }

    async fn sweep(&self) -> Result<usize, ArchiveError> {
        let cutoff = SystemTime::now() - self.retention;
        let deleted = self.sweep_before(cutoff).await?;
        info!(deleted, dir = %self.dir.display(), "archive sweep finished");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn archive_writes_a_complete_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let archive = FsPageArchive::new(dir.path(), Duration::from_secs(3600));

        let raw = json!({ "totalResults": 1, "vulnerabilities": [{ "cve": { "id": "CVE-1" } }] });
        let path = archive.archive(EntityKind::Cve, 0, &raw).await.unwrap();

        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("cve_data_page_0_"));
        let body = fs::read(&path).await.unwrap();
        let decoded: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(decoded, raw);

        // No temp leftover.
        let mut entries = fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(e) = entries.next_entry().await.unwrap() {
            names.push(e.file_name().into_string().unwrap());
        }
        assert_eq!(names.len(), 1);
        assert!(!names[0].ends_with(".tmp"));
    }

    #[tokio::test]
    async fn sweep_deletes_only_expired_pages() {
        let dir = tempfile::tempdir().unwrap();
        let archive = FsPageArchive::new(dir.path(), Duration::from_secs(3600));

        let raw = json!({ "totalResults": 0 });
        archive.archive(EntityKind::Cve, 0, &raw).await.unwrap();
        archive.archive(EntityKind::Cpe, 0, &raw).await.unwrap();

        // A cutoff in the past deletes nothing.
        let deleted = archive
            .sweep_before(SystemTime::now() - Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(deleted, 0);

        // A cutoff in the future deletes both.
        let deleted = archive
            .sweep_before(SystemTime::now() + Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(deleted, 2);
    }

    #[tokio::test]
    async fn sweep_of_missing_dir_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let archive = FsPageArchive::new(dir.path().join("never_created"), Duration::ZERO);
        assert_eq!(archive.sweep().await.unwrap(), 0);
    }
}
