//! File-per-submission storage for care records.
//!
//! Each submission is written once as pretty-printed JSON and never
//! updated. Listing reads the whole directory; there is no index.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use shelter_core::care_record::{
    filename_matches_subject, is_record_file, record_filename, sort_newest_first, subject_name,
    CareRecord, SubmissionStamp,
};
use shelter_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt care record {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Identifiers returned for a stored submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub submission_id: String,
    /// Path of the written file, relative to the working directory when
    /// the data directory is.
    pub filename: String,
}

/// Care records kept as individual files in one directory.
#[derive(Debug, Clone)]
pub struct CareRecordStore {
    dir: PathBuf,
}

impl CareRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stamp and persist a record received now.
    pub async fn submit(&self, record: CareRecord) -> Result<Submission, StoreError> {
        self.submit_at(record, Local::now().naive_local()).await
    }

    /// Stamp and persist a record received at `now`.
    ///
    /// A second submission for the same hedgehog within the same second
    /// replaces the first file.
    pub async fn submit_at(
        &self,
        mut record: CareRecord,
        now: NaiveDateTime,
    ) -> Result<Submission, StoreError> {
        let subject = subject_name(&record)?.to_owned();

        let stamp = SubmissionStamp::at(now);
        stamp.apply(&mut record);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.dir.join(record_filename(&subject, &stamp.submission_id));
        let contents = serde_json::to_vec_pretty(&record).map_err(|source| StoreError::Corrupt {
            path: path.clone(),
            source,
        })?;
        tokio::fs::write(&path, contents)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

        let filename = path.display().to_string();
        tracing::info!(hedgehog = %subject, filename = %filename, "Saved care record");

        Ok(Submission {
            submission_id: stamp.submission_id,
            filename,
        })
    }

    /// Every stored record, newest first.
    pub async fn list_all(&self) -> Result<Vec<CareRecord>, StoreError> {
        self.read_matching(is_record_file).await
    }

    /// Records whose filename contains `name`, ignoring case, newest first.
    pub async fn list_for_subject(&self, name: &str) -> Result<Vec<CareRecord>, StoreError> {
        self.read_matching(|filename| filename_matches_subject(filename, name))
            .await
    }

    /// Decode every file accepted by `keep`. Any unreadable or corrupt file
    /// fails the whole listing.
    async fn read_matching<F>(&self, keep: F) -> Result<Vec<CareRecord>, StoreError>
    where
        F: Fn(&str) -> bool,
    {
        let io_err = |source| StoreError::Io {
            path: self.dir.clone(),
            source,
        };

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(e)),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let Some(filename) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if !keep(&filename) {
                continue;
            }

            let path = entry.path();
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|source| StoreError::Io {
                    path: path.clone(),
                    source,
                })?;
            let record: CareRecord = serde_json::from_slice(&bytes)
                .map_err(|source| StoreError::Corrupt { path, source })?;
            records.push(record);
        }

        sort_newest_first(&mut records);
        Ok(records)
    }
}
