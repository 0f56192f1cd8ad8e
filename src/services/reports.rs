//! Report generation and retrieval
//!
//! Generation requests are queued to a single background worker; the caller
//! only learns that the request was accepted and polls for the newest
//! snapshot afterwards. Failed generations are logged and not retried.

use std::{path::PathBuf, sync::Arc};

use chrono::{DateTime, Local, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{
    error::{AppError, AppResult},
    models::report::ReportSnapshot,
    repository::{snapshots::SnapshotDirectory, Repository},
};

/// Computes aggregate counts and writes them as a snapshot
pub struct ReportGenerator {
    repository: Repository,
    snapshots: SnapshotDirectory,
}

impl ReportGenerator {
    pub fn new(repository: Repository, snapshots: SnapshotDirectory) -> Self {
        Self {
            repository,
            snapshots,
        }
    }

    pub async fn generate(&self) -> AppResult<(PathBuf, ReportSnapshot)> {
        let totals = self.repository.ledger.totals().await?;
        let now = Local::now().naive_local();

        let snapshot = ReportSnapshot {
            total_authors: totals.authors,
            total_books: totals.books,
            total_borrowed_books: totals.open_records,
            timestamp: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        };

        let path = self.snapshots.write(&snapshot, now).await?;
        Ok((path, snapshot))
    }
}

/// A queued generation request
#[derive(Debug, Clone)]
pub struct ReportJob {
    pub requested_at: DateTime<Utc>,
}

async fn run_worker(generator: Arc<ReportGenerator>, mut jobs: mpsc::Receiver<ReportJob>) {
    tracing::info!("Report worker started");

    while let Some(job) = jobs.recv().await {
        match generator.generate().await {
            Ok((path, snapshot)) => tracing::info!(
                path = %path.display(),
                requested_at = %job.requested_at,
                total_borrowed_books = snapshot.total_borrowed_books,
                "Report generated"
            ),
            Err(e) => tracing::error!(requested_at = %job.requested_at, "Report generation failed: {}", e),
        }
    }

    tracing::info!("Report worker stopped");
}

#[derive(Clone)]
pub struct ReportsService {
    snapshots: SnapshotDirectory,
    jobs: mpsc::Sender<ReportJob>,
}

impl ReportsService {
    /// Create the service and spawn its worker on the current runtime
    pub fn start(repository: Repository, snapshots: SnapshotDirectory, queue_capacity: usize) -> Self {
        let generator = Arc::new(ReportGenerator::new(repository, snapshots.clone()));
        let (jobs, receiver) = mpsc::channel(queue_capacity.max(1));

        tokio::spawn(run_worker(generator, receiver));

        Self {
            snapshots,
            jobs,
        }
    }

    /// Queue a generation without waiting for it
    pub fn request_generation(&self) -> AppResult<()> {
        let job = ReportJob {
            requested_at: Utc::now(),
        };

        match self.jobs.try_send(job) {
            Ok(()) => Ok(()),
            // A queued job has not started yet, so it will count state at least this recent
            Err(TrySendError::Full(job)) => {
                tracing::debug!(requested_at = %job.requested_at, "Report queue full, request coalesced");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => {
                Err(AppError::Internal("Report worker is not running".to_string()))
            }
        }
    }

    pub async fn latest(&self) -> AppResult<ReportSnapshot> {
        self.snapshots.latest().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        models::report::LibraryTotals,
        repository::{MockAuthorRepo, MockBookRepo, MockLedgerRepo},
    };

    fn counting_repository(authors: i64, books: i64, open: i64) -> Repository {
        // Counts come from a single call, never from the per-table repos
        let mut ledger = MockLedgerRepo::new();
        ledger.expect_totals().returning(move || {
            Ok(LibraryTotals {
                authors,
                books,
                open_records: open,
            })
        });

        Repository {
            authors: Arc::new(MockAuthorRepo::new()),
            books: Arc::new(MockBookRepo::new()),
            ledger: Arc::new(ledger),
        }
    }

    #[tokio::test]
    async fn test_generate_writes_counts() {
        let tmp = tempfile::tempdir().unwrap();
        let generator = ReportGenerator::new(
            counting_repository(2, 5, 3),
            SnapshotDirectory::new(tmp.path().join("reports")),
        );

        let (path, snapshot) = generator.generate().await.unwrap();
        assert!(path.exists());
        assert_eq!(snapshot.total_authors, 2);
        assert_eq!(snapshot.total_books, 5);
        assert_eq!(snapshot.total_borrowed_books, 3);
        assert_eq!(snapshot.timestamp.len(), "2024-01-01 00:00:00".len());
    }

    #[tokio::test]
    async fn test_unwritable_directory_is_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("reports");
        std::fs::write(&blocker, "a file where the directory should be").unwrap();

        let generator = ReportGenerator::new(counting_repository(0, 0, 0), SnapshotDirectory::new(blocker));
        let err = generator.generate().await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }

    #[tokio::test]
    async fn test_requested_generation_is_eventually_visible() {
        let tmp = tempfile::tempdir().unwrap();
        let reports = ReportsService::start(
            counting_repository(1, 1, 0),
            SnapshotDirectory::new(tmp.path()),
            4,
        );

        assert!(matches!(reports.latest().await, Err(AppError::NotFound(_))));
        reports.request_generation().unwrap();

        let snapshot = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Ok(snapshot) = reports.latest().await {
                    return snapshot;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("report was never written");

        assert_eq!(snapshot.total_authors, 1);
    }
}
