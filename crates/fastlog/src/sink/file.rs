//! Daily-rotating append-only log file.

use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use time::{format_description::BorrowedFormatItem, macros::format_description, Date};

use super::Sink;
use crate::{Clock, LogLine, SinkError};

/// File name of a day's log (`yyMMdd.log`).
const FILE_NAME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!(version = 2, "[year repr:last_two][month][day].log");

#[derive(Debug)]
struct OpenFile {
    day: Date,
    path: PathBuf,
    file: File,
}

/// Appends lines to `<directory>/<yyMMdd>.log`, switching files when the UTC day changes.
///
/// The file is opened lazily on the first write of each day. Every write is flushed. Runs on the
/// same UTC day append to the same file, so restarts continue the existing log.
#[derive(Debug)]
pub struct FileSink<C> {
    directory: PathBuf,
    clock: C,
    current: Option<OpenFile>,
}

impl<C: Clock> FileSink<C> {
    /// Creates a sink writing into `directory`. Nothing is created until the first write.
    pub fn new(directory: impl Into<PathBuf>, clock: C) -> Self {
        Self {
            directory: directory.into(),
            clock,
            current: None,
        }
    }

    /// The directory holding the daily files.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the currently open file, if any.
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|open| open.path.as_path())
    }

    /// Path of the file that holds lines written on `day`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::FileName`] if the date cannot be rendered.
    pub fn path_for(&self, day: Date) -> Result<PathBuf, SinkError> {
        let name = day
            .format(FILE_NAME_FORMAT)
            .map_err(|error| SinkError::FileName(error.to_string()))?;
        Ok(self.directory.join(name))
    }

    /// Returns the file for the current UTC day, rotating if the day has changed.
    fn file_for_today(&mut self) -> Result<&mut OpenFile, SinkError> {
        let today = self.clock.now().date();

        let open = match self.current.take() {
            Some(open) if open.day == today => open,
            stale => {
                if let Some(mut stale) = stale {
                    let _ = stale.file.flush();
                    tracing::debug!(
                        target: "fastlog",
                        path = %stale.path.display(),
                        "rotating log file"
                    );
                }
                let open = self.open(today)?;
                tracing::debug!(target: "fastlog", path = %open.path.display(), "opened log file");
                open
            }
        };

        Ok(self.current.insert(open))
    }

    fn open(&self, day: Date) -> Result<OpenFile, SinkError> {
        if !self.directory.is_dir() {
            fs::create_dir_all(&self.directory).map_err(|source| SinkError::CreateDirectory {
                path: self.directory.clone(),
                source,
            })?;
        }

        let path = self.path_for(day)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| SinkError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(OpenFile { day, path, file })
    }
}

impl<C: Clock> Sink for FileSink<C> {
    fn write_line(&mut self, line: &LogLine) -> Result<(), SinkError> {
        let open = self.file_for_today()?;
        open.file
            .write_all(line.as_bytes())
            .and_then(|()| open.file.flush())
            .map_err(|source| SinkError::Write {
                path: open.path.clone(),
                source,
            })
    }

    fn close(&mut self) {
        if let Some(mut open) = self.current.take() {
            let _ = open.file.flush();
            tracing::debug!(target: "fastlog", path = %open.path.display(), "closed log file");
        }
    }
}

/// `logs` next to the running executable, or under the working directory if the executable
/// path is unavailable.
pub fn default_log_directory() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
        .join("logs")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use std::sync::Arc;

    use time::{macros::utc_datetime, Duration};

    use super::*;
    use crate::{LogLine, ManualClock};

    fn line(text: &str) -> LogLine {
        LogLine::untagged(format!("{text}\r\n"))
    }

    #[test]
    fn names_files_by_two_digit_year_month_day() {
        let sink = FileSink::new("/tmp/x", ManualClock::new(utc_datetime!(2024-01-01 00:00)));
        let path = sink.path_for(time::macros::date!(2025-03-07)).unwrap();
        assert_eq!(path, Path::new("/tmp/x/250307.log"));
    }

    #[test]
    fn creates_directory_lazily_and_appends() {
        let temp = tempfile::tempdir().unwrap();
        let directory = temp.path().join("nested").join("logs");
        let clock = Arc::new(ManualClock::new(utc_datetime!(2024-02-29 10:00)));
        let mut sink = FileSink::new(&directory, Arc::clone(&clock));

        assert!(!directory.exists());
        assert_eq!(sink.directory(), directory.as_path());
        assert_eq!(sink.current_path(), None);

        sink.write_line(&line("one")).unwrap();
        sink.write_line(&line("two")).unwrap();

        let path = directory.join("240229.log");
        assert_eq!(sink.current_path(), Some(path.as_path()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\r\ntwo\r\n");
    }

    #[test]
    fn rotates_when_the_utc_day_changes() {
        let temp = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(utc_datetime!(2024-12-31 23:59:59)));
        let mut sink = FileSink::new(temp.path(), Arc::clone(&clock));

        sink.write_line(&line("old year")).unwrap();
        clock.advance(Duration::seconds(1));
        sink.write_line(&line("new year")).unwrap();

        assert_eq!(
            fs::read_to_string(temp.path().join("241231.log")).unwrap(),
            "old year\r\n"
        );
        assert_eq!(
            fs::read_to_string(temp.path().join("250101.log")).unwrap(),
            "new year\r\n"
        );
        assert_eq!(
            sink.current_path(),
            Some(temp.path().join("250101.log").as_path())
        );
    }

    #[cfg(unix)]
    #[test]
    fn same_day_writes_reuse_the_open_handle() {
        let temp = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(utc_datetime!(2024-08-08 08:00)));
        let mut sink = FileSink::new(temp.path(), Arc::clone(&clock));
        let path = temp.path().join("240808.log");

        sink.write_line(&line("first")).unwrap();
        fs::remove_file(&path).unwrap();
        clock.advance(Duration::hours(1));
        sink.write_line(&line("second")).unwrap();

        // The unlinked handle keeps receiving writes; nothing reopened the path.
        assert!(!path.exists());
    }

    #[test]
    fn same_day_of_a_later_month_still_rotates() {
        let temp = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(utc_datetime!(2024-04-15 12:00)));
        let mut sink = FileSink::new(temp.path(), Arc::clone(&clock));

        sink.write_line(&line("april")).unwrap();
        clock.set(utc_datetime!(2024-05-15 12:00));
        sink.write_line(&line("may")).unwrap();

        assert!(temp.path().join("240415.log").exists());
        assert!(temp.path().join("240515.log").exists());
    }

    #[test]
    fn reopening_on_the_same_day_appends() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("240701.log");
        fs::write(&path, "from a previous run\r\n").unwrap();

        let clock = ManualClock::new(utc_datetime!(2024-07-01 08:00));
        let mut sink = FileSink::new(temp.path(), clock);
        sink.write_line(&line("after restart")).unwrap();
        sink.close();
        sink.write_line(&line("after close")).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "from a previous run\r\nafter restart\r\nafter close\r\n"
        );
    }

    #[test]
    fn unusable_directory_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("not-a-directory");
        fs::write(&blocker, "").unwrap();

        let clock = ManualClock::new(utc_datetime!(2024-07-01 08:00));
        let mut sink = FileSink::new(blocker.join("logs"), clock);
        let error = sink.write_line(&line("lost")).unwrap_err();

        assert!(matches!(error, SinkError::CreateDirectory { .. }));
        assert_eq!(sink.current_path(), None);
    }
}
