//! Dump log file lifecycle: rotation, open, synced append, close

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use espterm_core::prelude::*;

/// Default dump log name, relative to the working directory
pub const DEFAULT_DUMP_FILE: &str = "dump.log";

/// Manages where dump captures are written and preserves earlier captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpLogSink {
    base: PathBuf,
}

impl DumpLogSink {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Path of the active dump log
    pub fn path(&self) -> &Path {
        &self.base
    }

    /// First `<base>.N` (N = 1, 2, ...) that does not exist yet
    pub fn next_rotation_path(&self) -> PathBuf {
        let mut index: u32 = 1;
        loop {
            let candidate = rotation_path(&self.base, index);
            if !candidate.exists() {
                return candidate;
            }
            index += 1;
        }
    }

    /// Copy an existing dump log to the lowest free numbered name.
    ///
    /// The original is left in place (it is truncated later by
    /// [`DumpLogSink::open_for_write`]). Returns the path of the copy, or
    /// `None` when there was nothing to preserve.
    pub fn rotate_if_exists(&self) -> Result<Option<PathBuf>> {
        if !self.base.exists() {
            return Ok(None);
        }

        let contents = fs::read(&self.base).map_err(|e| Error::dump_log(&self.base, e))?;

        let target = self.next_rotation_path();
        let mut dest = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .map_err(|e| Error::dump_log(&target, e))?;

        if let Err(e) = dest.write_all(&contents).and_then(|()| dest.sync_all()) {
            drop(dest);
            if let Err(remove_err) = fs::remove_file(&target) {
                warn!(
                    "Failed to remove incomplete copy {}: {}",
                    target.display(),
                    remove_err
                );
            }
            return Err(Error::dump_log(&target, e));
        }

        info!(
            "Preserved {} ({} bytes) as {}",
            self.base.display(),
            contents.len(),
            target.display()
        );
        Ok(Some(target))
    }

    /// Create or truncate the dump log for a fresh capture
    pub fn open_for_write(&self) -> Result<DumpLog> {
        let file = File::create(&self.base).map_err(|e| Error::dump_log(&self.base, e))?;
        debug!("Opened dump log {}", self.base.display());
        Ok(DumpLog::new(file, self.base.clone()))
    }
}

impl Default for DumpLogSink {
    fn default() -> Self {
        Self::new(DEFAULT_DUMP_FILE)
    }
}

fn rotation_path(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

/// An open dump log. Every append reaches storage before it returns, so a
/// capture survives a crash of either side.
#[derive(Debug)]
pub struct DumpLog {
    file: File,
    path: PathBuf,
    written: u64,
}

impl DumpLog {
    pub(crate) fn new(file: File, path: PathBuf) -> Self {
        Self {
            file,
            path,
            written: 0,
        }
    }

    /// Append bytes and sync them to storage
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.file
            .write_all(bytes)
            .and_then(|()| self.file.flush())
            .and_then(|()| self.file.sync_data())
            .map_err(|e| Error::dump_log(&self.path, e))?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    /// Flush, sync and release the file
    pub fn close(mut self) -> Result<()> {
        self.file
            .flush()
            .and_then(|()| self.file.sync_all())
            .map_err(|e| Error::dump_log(&self.path, e))?;
        debug!(
            "Closed dump log {} after {} bytes",
            self.path.display(),
            self.written
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes appended since the log was opened
    pub fn bytes_written(&self) -> u64 {
        self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sink_in(dir: &TempDir) -> DumpLogSink {
        DumpLogSink::new(dir.path().join("dump.log"))
    }

    #[test]
    fn test_rotate_without_existing_file_is_noop() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir);
        assert_eq!(sink.rotate_if_exists().unwrap(), None);
        assert!(!dir.path().join("dump.log.1").exists());
    }

    #[test]
    fn test_rotate_preserves_content_under_first_suffix() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir);
        fs::write(sink.path(), b"old dump\x00\xff").unwrap();

        let rotated = sink.rotate_if_exists().unwrap().unwrap();
        assert_eq!(rotated, dir.path().join("dump.log.1"));
        assert_eq!(fs::read(&rotated).unwrap(), b"old dump\x00\xff");
        // Original stays until a new capture truncates it
        assert_eq!(fs::read(sink.path()).unwrap(), b"old dump\x00\xff");
    }

    #[test]
    fn test_rotate_picks_lowest_unused_suffix() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir);
        fs::write(sink.path(), b"current").unwrap();
        fs::write(dir.path().join("dump.log.1"), b"one").unwrap();
        fs::write(dir.path().join("dump.log.3"), b"three").unwrap();

        let rotated = sink.rotate_if_exists().unwrap().unwrap();
        assert_eq!(rotated, dir.path().join("dump.log.2"));
        assert_eq!(fs::read(&rotated).unwrap(), b"current");
        assert_eq!(fs::read(dir.path().join("dump.log.1")).unwrap(), b"one");
        assert_eq!(fs::read(dir.path().join("dump.log.3")).unwrap(), b"three");
    }

    #[test]
    fn test_new_capture_contains_only_new_bytes() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir);
        fs::write(sink.path(), b"previous capture").unwrap();

        sink.rotate_if_exists().unwrap();
        let mut log = sink.open_for_write().unwrap();
        log.append(b"fresh").unwrap();
        log.append(b"").unwrap();
        assert_eq!(log.bytes_written(), 5);
        log.close().unwrap();

        assert_eq!(fs::read(sink.path()).unwrap(), b"fresh");
        assert_eq!(
            fs::read(dir.path().join("dump.log.1")).unwrap(),
            b"previous capture"
        );
    }

    #[test]
    fn test_append_is_visible_before_close() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir);
        let mut log = sink.open_for_write().unwrap();
        log.append(b"abc").unwrap();
        log.append(b"def").unwrap();

        assert_eq!(fs::read(sink.path()).unwrap(), b"abcdef");
        drop(log);
        assert_eq!(fs::read(sink.path()).unwrap(), b"abcdef");
    }

    #[test]
    fn test_open_in_missing_directory_is_dump_log_error() {
        let dir = TempDir::new().unwrap();
        let sink = DumpLogSink::new(dir.path().join("missing").join("dump.log"));
        let err = sink.open_for_write().unwrap_err();
        assert!(matches!(err, Error::DumpLog { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_unreadable_dump_log_leaves_no_copies() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir);
        fs::create_dir(sink.path()).unwrap();

        for _ in 0..3 {
            match sink.rotate_if_exists().unwrap_err() {
                Error::DumpLog { path, .. } => assert_eq!(path, sink.path()),
                other => panic!("unexpected error: {other:?}"),
            }
        }

        let mut names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        names.sort();
        assert_eq!(names, vec!["dump.log"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_append_failure_is_dump_log_error() {
        let file = OpenOptions::new().write(true).open("/dev/full").unwrap();
        let mut log = DumpLog::new(file, PathBuf::from("/dev/full"));

        let err = log.append(b"no space").unwrap_err();
        assert!(matches!(err, Error::DumpLog { ref path, .. } if path == Path::new("/dev/full")));
        assert!(err.is_recoverable());
        assert_eq!(log.bytes_written(), 0);
    }

    #[test]
    fn test_rotation_path_appends_index() {
        assert_eq!(
            rotation_path(Path::new("logs/dump.log"), 7),
            PathBuf::from("logs/dump.log.7")
        );
    }

    #[test]
    fn test_default_sink_uses_dump_log() {
        assert_eq!(DumpLogSink::default().path(), Path::new("dump.log"));
    }
}
