//! Report snapshot files on disk
//!
//! Snapshots are `report_<YYYYMMDD_HHMMSS>.json` files in one directory.
//! A file is staged under a hidden temporary name and then hard-linked into
//! place, so readers never see a partial snapshot and an existing snapshot is
//! never replaced.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
    time::SystemTime,
};

use chrono::NaiveDateTime;
use tokio::{fs, io::AsyncWriteExt};

use crate::{
    error::{AppError, AppResult},
    models::report::ReportSnapshot,
};

const PREFIX: &str = "report_";
const EXTENSION: &str = "json";

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Directory of immutable, timestamp-named report snapshots
#[derive(Debug, Clone)]
pub struct SnapshotDirectory {
    root: PathBuf,
}

impl SnapshotDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File name for a snapshot taken at `at`; `attempt` > 0 adds a suffix
    pub fn file_name(at: NaiveDateTime, attempt: u32) -> String {
        let stamp = at.format("%Y%m%d_%H%M%S");
        if attempt == 0 {
            format!("{}{}.{}", PREFIX, stamp, EXTENSION)
        } else {
            format!("{}{}_{}.{}", PREFIX, stamp, attempt, EXTENSION)
        }
    }

    fn is_snapshot(path: &Path) -> bool {
        let name_matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.starts_with(PREFIX));
        let ext_matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e == EXTENSION);
        name_matches && ext_matches
    }

    /// Persist a snapshot, creating the directory on first use
    pub async fn write(&self, snapshot: &ReportSnapshot, at: NaiveDateTime) -> AppResult<PathBuf> {
        fs::create_dir_all(&self.root).await?;

        let body = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| AppError::Storage(format!("Could not encode report: {}", e)))?;

        let staging = self.root.join(format!(
            ".staging-{}-{}.tmp",
            std::process::id(),
            STAGING_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let published = match Self::stage(&staging, &body).await {
            Ok(()) => self.publish(&staging, at).await,
            Err(e) => Err(e.into()),
        };
        match fs::remove_file(&staging).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %staging.display(), "Could not remove staging file: {}", e);
            }
        }
        published
    }

    async fn stage(staging: &Path, body: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(staging).await?;
        file.write_all(body).await?;
        // tokio reports buffered write errors on flush, not on sync
        file.flush().await?;
        file.sync_all().await
    }

    async fn publish(&self, staging: &Path, at: NaiveDateTime) -> AppResult<PathBuf> {
        let mut attempt = 0;
        loop {
            let target = self.root.join(Self::file_name(at, attempt));
            match fs::hard_link(staging, &target).await {
                Ok(()) => return Ok(target),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Ordering among snapshots with equal mtimes: stamp, then collision suffix
    fn sequence(path: &Path) -> (String, u32) {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        let rest = stem.strip_prefix(PREFIX).unwrap_or(stem);
        match rest.rsplit_once('_') {
            Some((stamp, suffix)) if stamp.contains('_') => match suffix.parse() {
                Ok(n) => (stamp.to_string(), n),
                Err(_) => (rest.to_string(), 0),
            },
            _ => (rest.to_string(), 0),
        }
    }

    /// Path of the snapshot with the newest modification time
    pub async fn latest_path(&self) -> AppResult<PathBuf> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AppError::NotFound("No reports directory found.".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut newest: Option<(SystemTime, (String, u32), PathBuf)> = None;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !Self::is_snapshot(&path) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified()?;

            let key = (modified, Self::sequence(&path));
            let is_newer = match newest {
                None => true,
                Some((ref t, ref seq, _)) => (&key.0, &key.1) > (t, seq),
            };
            if is_newer {
                newest = Some((key.0, key.1, path));
            }
        }

        newest
            .map(|(_, _, path)| path)
            .ok_or_else(|| AppError::NotFound("No reports available.".to_string()))
    }

    /// Decode the newest snapshot
    pub async fn latest(&self) -> AppResult<ReportSnapshot> {
        let path = self.latest_path().await?;
        let bytes = fs::read(&path).await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            AppError::Storage(format!("Could not read the report {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn snapshot(borrowed: i64) -> ReportSnapshot {
        ReportSnapshot {
            total_authors: 1,
            total_books: 2,
            total_borrowed_books: borrowed,
            timestamp: "2024-03-09 10:00:00".to_string(),
        }
    }

    #[test]
    fn test_file_name_format() {
        assert_eq!(SnapshotDirectory::file_name(at(10, 5, 7), 0), "report_20240309_100507.json");
        assert_eq!(SnapshotDirectory::file_name(at(10, 5, 7), 2), "report_20240309_100507_2.json");
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = SnapshotDirectory::new(tmp.path().join("reports"));
        assert!(matches!(dir.latest().await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_directory_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "not a report").unwrap();
        let dir = SnapshotDirectory::new(tmp.path());
        assert!(matches!(dir.latest().await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_write_creates_directory_and_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = SnapshotDirectory::new(tmp.path().join("nested").join("reports"));

        let path = dir.write(&snapshot(3), at(10, 0, 0)).await.unwrap();
        assert!(path.ends_with("report_20240309_100000.json"));
        assert_eq!(dir.latest().await.unwrap(), snapshot(3));

        let leftovers: Vec<_> = std::fs::read_dir(dir.root())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_same_second_does_not_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = SnapshotDirectory::new(tmp.path());

        let first = dir.write(&snapshot(1), at(10, 0, 0)).await.unwrap();
        let second = dir.write(&snapshot(2), at(10, 0, 0)).await.unwrap();

        assert_ne!(first, second);
        assert!(second.ends_with("report_20240309_100000_1.json"));
        assert_eq!(dir.latest().await.unwrap(), snapshot(2));
    }

    #[tokio::test]
    async fn test_latest_uses_modification_time_not_name() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = SnapshotDirectory::new(tmp.path());

        let later_name = dir.write(&snapshot(1), at(23, 59, 59)).await.unwrap();
        dir.write(&snapshot(2), at(0, 0, 0)).await.unwrap();

        let file = std::fs::File::options().write(true).open(&later_name).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(3600))
            .unwrap();

        assert_eq!(dir.latest().await.unwrap(), snapshot(2));
    }

    #[test]
    fn test_sequence_orders_suffixes_numerically() {
        let plain = SnapshotDirectory::sequence(Path::new("report_20240101_010203.json"));
        let ninth = SnapshotDirectory::sequence(Path::new("report_20240101_010203_9.json"));
        let eleventh = SnapshotDirectory::sequence(Path::new("report_20240101_010203_11.json"));

        assert_eq!(plain, ("20240101_010203".to_string(), 0));
        assert!(plain < ninth);
        assert!(ninth < eleventh);
    }

    #[tokio::test]
    async fn test_equal_mtimes_pick_highest_suffix() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = SnapshotDirectory::new(tmp.path());

        let mut written = Vec::new();
        for borrowed in 0..12 {
            written.push(dir.write(&snapshot(borrowed), at(1, 2, 3)).await.unwrap());
        }
        assert!(written[11].ends_with("report_20240309_010203_11.json"));

        let same = SystemTime::now() - Duration::from_secs(60);
        for path in &written {
            let file = std::fs::File::options().write(true).open(path).unwrap();
            file.set_modified(same).unwrap();
        }

        assert_eq!(dir.latest().await.unwrap(), snapshot(11));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_failed_staging_write_leaves_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = SnapshotDirectory::new(tmp.path());

        // Point the next staging names at a device that rejects every write
        let start = STAGING_COUNTER.load(Ordering::Relaxed);
        for n in start..start + 64 {
            let name = format!(".staging-{}-{}.tmp", std::process::id(), n);
            std::os::unix::fs::symlink("/dev/full", tmp.path().join(name)).unwrap();
        }

        let err = dir.write(&snapshot(1), at(10, 0, 0)).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));

        let names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.iter().filter(|n| n.starts_with(".staging-")).count(), 63);
        assert!(!names.iter().any(|n| n.starts_with(PREFIX)));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("report_20240309_100000.json"), "{ not json").unwrap();
        let dir = SnapshotDirectory::new(tmp.path());
        assert!(matches!(dir.latest().await, Err(AppError::Storage(_))));
    }
}
