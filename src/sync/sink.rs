//! Persistence boundary for derived domain records.
//!
//! The pipeline hands every synced pull request to a [`RecordSink`]. The
//! bundled [`JsonlRecordSink`] writes one JSON object per line, so the
//! output can be bulk-loaded by whatever store sits downstream.

use std::collections::HashSet;
use std::io::{BufWriter, Write};

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::{Dir, File};

use crate::github::FetchError;
use crate::github::models::FetchedPR;

use super::records::{SeedRecord, TeamMemberRecord, participants, pull_request_records};

/// Number of records written per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    /// Pull request rows.
    pub pull_requests: usize,
    /// Review rows.
    pub reviews: usize,
    /// Commit rows.
    pub commits: usize,
    /// Changed-file rows.
    pub files: usize,
    /// Check-run rows.
    pub check_runs: usize,
    /// Team members seen for the first time.
    pub team_members: usize,
}

impl RecordCounts {
    fn record(&mut self, record: &SeedRecord<'_>) {
        let counter = match record {
            SeedRecord::PullRequest(_) => &mut self.pull_requests,
            SeedRecord::Review(_) => &mut self.reviews,
            SeedRecord::Commit(_) => &mut self.commits,
            SeedRecord::File(_) => &mut self.files,
            SeedRecord::CheckRun(_) => &mut self.check_runs,
            SeedRecord::TeamMember(_) => &mut self.team_members,
        };
        *counter += 1;
    }
}

/// Receives the pull requests of each synced repository.
pub trait RecordSink: Send {
    /// Persists `prs` for `repository` (in `owner/name` form).
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] when records cannot be written.
    fn persist(&mut self, repository: &str, prs: &[FetchedPR])
    -> Result<RecordCounts, FetchError>;
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecordSink;

impl RecordSink for NoopRecordSink {
    fn persist(
        &mut self,
        _repository: &str,
        _prs: &[FetchedPR],
    ) -> Result<RecordCounts, FetchError> {
        Ok(RecordCounts::default())
    }
}

/// Writes records as JSON lines, emitting each team member once per sink.
#[derive(Debug)]
pub struct JsonlRecordSink<W: Write> {
    writer: W,
    seen_members: HashSet<String>,
}

impl<W: Write> JsonlRecordSink<W> {
    /// Wraps `writer`.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            seen_members: HashSet::new(),
        }
    }

    /// Returns the underlying writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record(&mut self, record: &SeedRecord<'_>) -> Result<(), FetchError> {
        serde_json::to_writer(&mut self.writer, record).map_err(|error| FetchError::Io {
            message: format!("JSON serialization failed: {error}"),
        })?;
        writeln!(self.writer).map_err(|error| io_error(&error))
    }
}

impl JsonlRecordSink<BufWriter<File>> {
    /// Creates (or truncates) the file at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] when the directory or file cannot be created.
    pub fn create(path: &Utf8Path) -> Result<Self, FetchError> {
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let file_name = path.file_name().ok_or_else(|| FetchError::Io {
            message: format!("invalid records path '{path}': no file name"),
        })?;

        Dir::create_ambient_dir_all(parent, ambient_authority()).map_err(|error| {
            FetchError::Io {
                message: format!("failed to create records directory '{parent}': {error}"),
            }
        })?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|error| {
            FetchError::Io {
                message: format!("failed to open records directory '{parent}': {error}"),
            }
        })?;
        let file = dir.create(file_name).map_err(|error| FetchError::Io {
            message: format!("failed to create records file '{path}': {error}"),
        })?;

        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> RecordSink for JsonlRecordSink<W> {
    fn persist(
        &mut self,
        repository: &str,
        prs: &[FetchedPR],
    ) -> Result<RecordCounts, FetchError> {
        let mut counts = RecordCounts::default();
        for pr in prs {
            for record in pull_request_records(repository, pr) {
                self.write_record(&record)?;
                counts.record(&record);
            }
            for login in participants(pr) {
                if !self.seen_members.insert(login.to_ascii_lowercase()) {
                    continue;
                }
                let record = SeedRecord::TeamMember(TeamMemberRecord { repository, login });
                self.write_record(&record)?;
                counts.record(&record);
            }
        }
        self.writer.flush().map_err(|error| io_error(&error))?;
        Ok(counts)
    }
}

fn io_error(error: &std::io::Error) -> FetchError {
    FetchError::Io {
        message: error.to_string(),
    }
}
