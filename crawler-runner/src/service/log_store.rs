//! Incremental log store
//!
//! Persists fetched log lines under `<root>/<owner_key>/<YYYY-MM-DD>.log`,
//! one `<timestamp> | <content>` record per line. Files are append-only and
//! kept in timestamp order: a line is appended only when it sorts strictly
//! after the last line already in its file (the high-water mark), so merging
//! the same batch twice appends nothing the second time.
//!
//! Assumes it is the only writer of the store directory.

use chrono::{NaiveDate, NaiveDateTime};
use crawler_core::domain::log::{LogLine, strip_level_marker};
use crawler_core::domain::timestamp::{
    LINE_SEPARATOR, parse_log_line_timestamp, parse_timestamp,
};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::error::StoreError;

/// Bytes read per step when scanning a file backwards for its last line
const TAIL_CHUNK: u64 = 8 * 1024;

/// Service trait for merging fetched lines into persistent storage
pub trait LogStore: Send + Sync {
    /// Merges a batch of lines for one owner
    ///
    /// Lines are partitioned by calendar date; each date is merged into its
    /// own file independently. Lines at or before a file's high-water mark
    /// are skipped as already stored.
    ///
    /// # Arguments
    /// * `owner_key` - Store partition the lines belong to
    /// * `lines` - Lines in the order they were received
    fn merge(&self, owner_key: &str, lines: &[LogLine]) -> Result<MergeReport, StoreError>;
}

/// Outcome of a merge for one owner
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub owner_key: String,
    /// One entry per date file touched, in date order
    pub dates: Vec<DateReport>,
    /// Lines dropped because their timestamp did not parse
    pub rejected: usize,
}

impl MergeReport {
    /// Total number of lines appended across all dates
    pub fn appended(&self) -> usize {
        self.dates.iter().map(|d| d.appended).sum()
    }

    /// Total number of lines skipped as already stored
    pub fn skipped(&self) -> usize {
        self.dates.iter().map(|d| d.skipped).sum()
    }
}

/// Outcome of merging one date partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateReport {
    pub date: NaiveDate,
    pub appended: usize,
    pub skipped: usize,
}

/// A line waiting to be merged into its date file
struct PendingLine<'a> {
    ts: NaiveDateTime,
    /// Timestamp exactly as received; written verbatim
    raw_ts: &'a str,
    content: Cow<'a, str>,
}

/// File-backed implementation of LogStore
#[derive(Debug, Clone)]
pub struct FileLogStore {
    root: PathBuf,
}

impl FileLogStore {
    /// Creates a store rooted at `root` without touching the filesystem
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates a store rooted at `root`, creating the directory if missing
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::new(root);
        fs::create_dir_all(&store.root).map_err(|e| StoreError::io(&store.root, e))?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `owner_key`'s lines for `date`
    pub fn file_path(&self, owner_key: &str, date: NaiveDate) -> PathBuf {
        self.root
            .join(owner_key)
            .join(format!("{}.log", date.format("%Y-%m-%d")))
    }

    /// Creates the owner directory and an empty date file if absent
    ///
    /// Returns an append handle to the file. Safe to call when the file
    /// already exists.
    fn ensure_file(&self, owner_key: &str, date: NaiveDate) -> Result<(PathBuf, File), StoreError> {
        let dir = self.root.join(owner_key);
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let path = self.file_path(owner_key, date);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;

        Ok((path, file))
    }

    fn merge_partition(
        &self,
        owner_key: &str,
        date: NaiveDate,
        mut pending: Vec<PendingLine<'_>>,
    ) -> Result<DateReport, StoreError> {
        let (path, file) = self.ensure_file(owner_key, date)?;
        let high_water_mark = high_water_mark(&path)?;

        // Stable: lines sharing a timestamp keep their received order
        pending.sort_by_key(|line| line.ts);

        let mut writer = BufWriter::new(file);
        let mut report = DateReport {
            date,
            appended: 0,
            skipped: 0,
        };

        for line in &pending {
            if high_water_mark.is_some_and(|mark| line.ts <= mark) {
                report.skipped += 1;
                continue;
            }

            writeln!(writer, "{} {} {}", line.raw_ts, LINE_SEPARATOR, line.content)
                .map_err(|e| StoreError::io(&path, e))?;
            report.appended += 1;
        }

        writer.flush().map_err(|e| StoreError::io(&path, e))?;
        Ok(report)
    }
}

impl LogStore for FileLogStore {
    fn merge(&self, owner_key: &str, lines: &[LogLine]) -> Result<MergeReport, StoreError> {
        validate_owner_key(owner_key)?;

        let mut report = MergeReport {
            owner_key: owner_key.to_string(),
            ..Default::default()
        };

        let mut partitions: BTreeMap<NaiveDate, Vec<PendingLine<'_>>> = BTreeMap::new();
        for line in lines {
            let ts = match parse_timestamp(&line.timestamp) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!("Skipping line for {}: {}", owner_key, e);
                    report.rejected += 1;
                    continue;
                }
            };

            partitions.entry(ts.date()).or_default().push(PendingLine {
                ts,
                raw_ts: &line.timestamp,
                content: normalize_content(&line.content),
            });
        }

        for (date, pending) in partitions {
            let date_report = self.merge_partition(owner_key, date, pending)?;
            info!(
                "Stored {} new lines for {} on {}",
                date_report.appended, owner_key, date_report.date
            );
            debug!(
                "Skipped {} already stored line(s) for {} on {}",
                date_report.skipped, owner_key, date_report.date
            );
            report.dates.push(date_report);
        }

        Ok(report)
    }
}

/// Rejects owner keys that cannot be used as a single directory name
fn validate_owner_key(owner_key: &str) -> Result<(), StoreError> {
    let invalid = owner_key.trim().is_empty()
        || owner_key == "."
        || owner_key == ".."
        || owner_key.contains(['/', '\\', '\0']);

    if invalid {
        return Err(StoreError::InvalidOwnerKey(owner_key.to_string()));
    }
    Ok(())
}

/// Prepares content for storage as a single record
///
/// Strips a leading `LEVEL |` marker and escapes embedded line breaks so that
/// every record occupies exactly one line.
fn normalize_content(content: &str) -> Cow<'_, str> {
    let content = strip_level_marker(content).trim_end_matches(['\r', '\n']);

    if content.contains(['\r', '\n']) {
        Cow::Owned(content.replace("\r\n", "\\n").replace(['\r', '\n'], "\\n"))
    } else {
        Cow::Borrowed(content)
    }
}

/// Timestamp of the last record in `path`, or `None` for an empty file
fn high_water_mark(path: &Path) -> Result<Option<NaiveDateTime>, StoreError> {
    let Some(last_line) = read_last_line(path).map_err(|e| StoreError::io(path, e))? else {
        return Ok(None);
    };

    parse_log_line_timestamp(&last_line)
        .map(Some)
        .map_err(|source| StoreError::Timestamp {
            path: path.to_path_buf(),
            source,
        })
}

/// Reads the last non-blank line of a file, scanning backwards from the end
fn read_last_line(path: &Path) -> io::Result<Option<String>> {
    let mut file = File::open(path)?;
    let mut start = file.metadata()?.len();
    let mut tail: Vec<u8> = Vec::new();

    loop {
        let content_end = tail
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map(|pos| pos + 1);

        if let Some(end) = content_end {
            if let Some(newline) = tail[..end].iter().rposition(|&b| b == b'\n') {
                return Ok(Some(String::from_utf8_lossy(&tail[newline + 1..end]).into_owned()));
            }
            if start == 0 {
                return Ok(Some(String::from_utf8_lossy(&tail[..end]).into_owned()));
            }
        } else if start == 0 {
            return Ok(None);
        }

        let chunk_start = start.saturating_sub(TAIL_CHUNK);
        let mut chunk = vec![0u8; (start - chunk_start) as usize];
        file.seek(SeekFrom::Start(chunk_start))?;
        file.read_exact(&mut chunk)?;
        chunk.extend_from_slice(&tail);
        tail = chunk;
        start = chunk_start;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileLogStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLogStore::open(dir.path()).unwrap();
        (dir, store)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn read_lines(store: &FileLogStore, owner: &str, day: &str) -> Vec<String> {
        fs::read_to_string(store.file_path(owner, date(day)))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn batch(lines: &[(&str, &str)]) -> Vec<LogLine> {
        lines.iter().map(|(ts, c)| LogLine::new(*ts, *c)).collect()
    }

    #[test]
    fn test_merge_into_empty_store() {
        let (_dir, store) = store();
        let lines = batch(&[
            ("2024-01-01T10:00:00.000000", "INFO | hello"),
            ("2024-01-01T10:00:01.000000", "world"),
        ]);

        let report = store.merge("hk1", &lines).unwrap();
        assert_eq!(report.appended(), 2);
        assert_eq!(
            read_lines(&store, "hk1", "2024-01-01"),
            [
                "2024-01-01T10:00:00.000000 |  hello",
                "2024-01-01T10:00:01.000000 | world",
            ]
        );

        let report = store.merge("hk1", &lines).unwrap();
        assert_eq!(report.appended(), 0);
        assert_eq!(report.skipped(), 2);
        assert_eq!(read_lines(&store, "hk1", "2024-01-01").len(), 2);
    }

    #[test]
    fn test_only_lines_after_high_water_mark_are_appended() {
        let (_dir, store) = store();
        store
            .merge("hk1", &batch(&[("2024-01-01T10:00:05.000000", "stored")]))
            .unwrap();

        let report = store
            .merge(
                "hk1",
                &batch(&[
                    ("2024-01-01T10:00:01.000000", "old"),
                    ("2024-01-01T10:00:05.000000", "same instant"),
                    ("2024-01-01T10:00:06.000000", "new a"),
                    ("2024-01-01T10:00:07.000000", "new b"),
                ]),
            )
            .unwrap();

        assert_eq!(report.appended(), 2);
        assert_eq!(report.skipped(), 2);
        assert_eq!(
            read_lines(&store, "hk1", "2024-01-01"),
            [
                "2024-01-01T10:00:05.000000 | stored",
                "2024-01-01T10:00:06.000000 | new a",
                "2024-01-01T10:00:07.000000 | new b",
            ]
        );
    }

    #[test]
    fn test_batch_spanning_two_dates() {
        let (_dir, store) = store();
        let report = store
            .merge(
                "hk1",
                &batch(&[
                    ("2024-01-01T23:59:59.000000", "late"),
                    ("2024-01-02T00:00:01.000000", "early"),
                    ("2024-01-01T23:59:59.500000", "later"),
                ]),
            )
            .unwrap();

        assert_eq!(report.dates.len(), 2);
        assert_eq!(report.dates[0].date, date("2024-01-01"));
        assert_eq!(report.dates[0].appended, 2);
        assert_eq!(report.dates[1].appended, 1);
        assert_eq!(
            read_lines(&store, "hk1", "2024-01-01"),
            [
                "2024-01-01T23:59:59.000000 | late",
                "2024-01-01T23:59:59.500000 | later",
            ]
        );
        assert_eq!(
            read_lines(&store, "hk1", "2024-01-02"),
            ["2024-01-02T00:00:01.000000 | early"]
        );
    }

    #[test]
    fn test_out_of_order_batch_is_stored_sorted() {
        let (_dir, store) = store();
        store
            .merge(
                "hk1",
                &batch(&[
                    ("2024-01-01T10:00:03.000000", "c"),
                    ("2024-01-01T10:00:01.000000", "a"),
                    ("2024-01-01T10:00:02.000000", "b1"),
                    ("2024-01-01T10:00:02.000000", "b2"),
                ]),
            )
            .unwrap();

        assert_eq!(
            read_lines(&store, "hk1", "2024-01-01"),
            [
                "2024-01-01T10:00:01.000000 | a",
                "2024-01-01T10:00:02.000000 | b1",
                "2024-01-01T10:00:02.000000 | b2",
                "2024-01-01T10:00:03.000000 | c",
            ]
        );
    }

    #[test]
    fn test_owners_are_kept_apart() {
        let (_dir, store) = store();
        let lines = batch(&[("2024-01-01T10:00:00.000000", "x")]);
        store.merge("hk1", &lines).unwrap();
        let report = store.merge("hk2", &lines).unwrap();

        assert_eq!(report.appended(), 1);
        assert_eq!(read_lines(&store, "hk2", "2024-01-01").len(), 1);
    }

    #[test]
    fn test_unparseable_timestamp_is_rejected() {
        let (_dir, store) = store();
        let report = store
            .merge(
                "hk1",
                &batch(&[
                    ("yesterday", "bad"),
                    ("2024-01-01T10:00:00.000000", "good"),
                ]),
            )
            .unwrap();

        assert_eq!(report.rejected, 1);
        assert_eq!(report.appended(), 1);
    }

    #[test]
    fn test_corrupt_last_line_fails_the_merge() {
        let (_dir, store) = store();
        let path = store.file_path("hk1", date("2024-01-01"));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "garbage without timestamp\n").unwrap();

        let err = store
            .merge("hk1", &batch(&[("2024-01-01T10:00:00.000000", "x")]))
            .unwrap_err();
        assert!(matches!(err, StoreError::Timestamp { .. }));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "garbage without timestamp\n"
        );
    }

    #[test]
    fn test_invalid_owner_keys() {
        let (dir, store) = store();
        let lines = batch(&[("2024-01-01T10:00:00.000000", "x")]);

        for key in ["", " ", ".", "..", "../escape", "a/b", "a\\b"] {
            let err = store.merge(key, &lines).unwrap_err();
            assert!(matches!(err, StoreError::InvalidOwnerKey(_)), "{key:?}");
        }
        assert!(!dir.path().join("escape").exists());
    }

    #[test]
    fn test_multiline_content_stays_one_record() {
        let (_dir, store) = store();
        store
            .merge(
                "hk1",
                &batch(&[("2024-01-01T10:00:00.000000", "Traceback:\n  frame\n")]),
            )
            .unwrap();

        assert_eq!(
            read_lines(&store, "hk1", "2024-01-01"),
            ["2024-01-01T10:00:00.000000 | Traceback:\\n  frame"]
        );
    }

    #[test]
    fn test_read_last_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.log");

        fs::write(&path, "").unwrap();
        assert_eq!(read_last_line(&path).unwrap(), None);

        fs::write(&path, "only").unwrap();
        assert_eq!(read_last_line(&path).unwrap().as_deref(), Some("only"));

        fs::write(&path, "first\nsecond\n\n  \n").unwrap();
        assert_eq!(read_last_line(&path).unwrap().as_deref(), Some("second"));

        // last line longer than one chunk, preceded by many lines
        let long = "y".repeat(TAIL_CHUNK as usize * 2 + 17);
        let body = format!("{}{}\n", "x\n".repeat(10_000), long);
        fs::write(&path, body).unwrap();
        assert_eq!(read_last_line(&path).unwrap(), Some(long));
    }

    #[test]
    fn test_empty_existing_file_has_no_high_water_mark() {
        let (_dir, store) = store();
        let (path, _file) = store.ensure_file("hk1", date("2024-01-01")).unwrap();
        assert!(path.exists());
        assert_eq!(high_water_mark(&path).unwrap(), None);

        // idempotent
        store.ensure_file("hk1", date("2024-01-01")).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
