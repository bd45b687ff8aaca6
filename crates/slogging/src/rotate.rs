//! Size-based log file rotation.
//!
//! [`RotatingFile`] is a plain `io::Write` sink. It rolls the active file
//! over once a write would push it past the size limit, renaming it to
//! `<stem>-<UTC timestamp>.<ext>`, optionally gzips the rolled file, then
//! prunes rolled files by count and age. Backup age is read from the
//! timestamp embedded in the file name, not from file metadata.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use slogging_types::Options;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";
const COMPRESS_SUFFIX: &str = ".gz";
const MAX_AGE_DAYS: u64 = 365 * 1000;

/// When and how the active file is rolled over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Roll over once a write would take the file past this size
    pub max_size_bytes: u64,
    /// Rolled files to keep; 0 keeps all
    pub max_backups: usize,
    /// Delete rolled files older than this
    pub max_age: Option<Duration>,
    /// Gzip rolled files
    pub compress: bool,
}

impl RotationPolicy {
    /// Policy described by the initializer options.
    pub fn from_options(options: &Options) -> Self {
        let max_age = (options.max_age_days > 0)
            .then(|| Duration::days(options.max_age_days.min(MAX_AGE_DAYS) as i64));
        Self {
            max_size_bytes: options.max_size_bytes(),
            max_backups: options.max_backups,
            max_age,
            compress: options.compress,
        }
    }
}

/// A rolled-over file found next to the active one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    /// Location on disk
    pub path: PathBuf,
    /// When the file was rolled over
    pub rotated_at: DateTime<Utc>,
    /// Whether the file is gzipped
    pub compressed: bool,
}

/// Append-only log file that rotates by size.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    policy: RotationPolicy,
    file: Option<File>,
    size: u64,
}

impl RotatingFile {
    /// Create a rotating file at `path`. Nothing is opened until the first
    /// write, so this never fails.
    pub fn new(path: impl Into<PathBuf>, policy: RotationPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
            file: None,
            size: 0,
        }
    }

    /// Path of the active file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes in the active file, as far as this writer knows.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Roll the active file over now.
    pub fn rotate(&mut self) -> io::Result<()> {
        self.rotate_at(Utc::now())
    }

    /// Rolled files belonging to this log, newest first.
    pub fn backups(&self) -> io::Result<Vec<Backup>> {
        let (dir, stem, ext) = self.name_parts();
        let prefix = format!("{}-", stem);

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut backups = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(rest) = name.strip_prefix(&prefix) else {
                continue;
            };
            let (rest, compressed) = match rest.strip_suffix(COMPRESS_SUFFIX) {
                Some(rest) => (rest, true),
                None => (rest, false),
            };
            let Some(stamp) = rest.strip_suffix(ext.as_str()) else {
                continue;
            };
            let Ok(time) = NaiveDateTime::parse_from_str(stamp, BACKUP_TIME_FORMAT) else {
                continue;
            };
            backups.push(Backup {
                path: entry.path(),
                rotated_at: time.and_utc(),
                compressed,
            });
        }

        backups.sort_by(|a, b| b.rotated_at.cmp(&a.rotated_at));
        Ok(backups)
    }

    fn rotate_at(&mut self, now: DateTime<Utc>) -> io::Result<()> {
        self.file = None;
        self.size = 0;

        if self.path.exists() {
            let backup = self.free_backup_path(now)?;
            fs::rename(&self.path, &backup)?;
            if self.policy.compress {
                compress_file(&backup)?;
            }
        }

        self.open_active()?;
        self.prune(now)
    }

    fn open_active(&mut self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.size = file.metadata()?.len();
        self.file = Some(file);
        Ok(())
    }

    fn prune(&self, now: DateTime<Utc>) -> io::Result<()> {
        let mut backups = self.backups()?;
        let mut doomed = Vec::new();

        if let Some(max_age) = self.policy.max_age {
            let cutoff = now - max_age;
            backups.retain(|b| {
                if b.rotated_at < cutoff {
                    doomed.push(b.path.clone());
                    false
                } else {
                    true
                }
            });
        }

        if self.policy.max_backups > 0 && backups.len() > self.policy.max_backups {
            doomed.extend(backups.drain(self.policy.max_backups..).map(|b| b.path));
        }

        for path in doomed {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Backup name for `now`. The timestamp is pushed past the newest
    /// existing backup, then forward a millisecond at a time until no rolled
    /// file with that name is on disk, so names always sort in rotation order.
    fn free_backup_path(&self, now: DateTime<Utc>) -> io::Result<PathBuf> {
        let (dir, stem, ext) = self.name_parts();
        let mut at = now;
        if let Some(newest) = self.backups()?.first() {
            if at <= newest.rotated_at {
                at = newest.rotated_at + Duration::milliseconds(1);
            }
        }
        loop {
            let name = format!("{}-{}{}", stem, at.format(BACKUP_TIME_FORMAT), ext);
            let candidate = dir.join(&name);
            let compressed = dir.join(format!("{}{}", name, COMPRESS_SUFFIX));
            if !candidate.exists() && !compressed.exists() {
                return Ok(candidate);
            }
            at += Duration::milliseconds(1);
        }
    }

    /// Directory, file stem and extension (with its dot, or empty).
    fn name_parts(&self) -> (PathBuf, String, String) {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "log".to_string());
        let ext = self
            .path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        (dir, stem, ext)
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.file.is_none() {
            self.open_active()?;
        }

        if self.size > 0 && self.size + buf.len() as u64 > self.policy.max_size_bytes {
            self.rotate()?;
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("log file is not open"))?;
        let written = file.write(buf)?;
        self.size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

fn compress_file(path: &Path) -> io::Result<()> {
    let mut target = path.as_os_str().to_owned();
    target.push(COMPRESS_SUFFIX);

    let mut source = File::open(path)?;
    let mut encoder = GzEncoder::new(File::create(PathBuf::from(target))?, Compression::default());
    io::copy(&mut source, &mut encoder)?;
    encoder.finish()?.sync_all()?;
    drop(source);

    fs::remove_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn policy(max_size_bytes: u64) -> RotationPolicy {
        RotationPolicy {
            max_size_bytes,
            max_backups: 0,
            max_age: None,
            compress: false,
        }
    }

    #[test]
    fn test_policy_from_options() {
        let opts = Options {
            max_size_mb: 0,
            max_backups: 3,
            max_age_days: 7,
            compress: true,
            ..Default::default()
        };
        let policy = RotationPolicy::from_options(&opts);
        assert_eq!(policy.max_size_bytes, 1024 * 1024);
        assert_eq!(policy.max_backups, 3);
        assert_eq!(policy.max_age, Some(Duration::days(7)));
        assert!(policy.compress);

        let policy = RotationPolicy::from_options(&Options::default());
        assert_eq!(policy.max_age, None);
    }

    #[test]
    fn test_new_does_not_touch_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("app.log");
        let _file = RotatingFile::new(&path, policy(1024));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("app.log");
        let mut file = RotatingFile::new(&path, policy(1024));

        file.write_all(b"hello\n").unwrap();
        file.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
        assert_eq!(file.size(), 6);
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "old\n").unwrap();

        let mut file = RotatingFile::new(&path, policy(1024));
        file.write_all(b"new\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew\n");
        assert_eq!(file.size(), 8);
    }

    #[test]
    fn test_rolls_over_past_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut file = RotatingFile::new(&path, policy(10));

        file.write_all(b"12345678\n").unwrap();
        file.write_all(b"abcdefgh\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "abcdefgh\n");
        let backups = file.backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert!(!backups[0].compressed);
        assert_eq!(fs::read_to_string(&backups[0].path).unwrap(), "12345678\n");

        let name = backups[0].path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("app-"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn test_oversized_write_lands_in_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut file = RotatingFile::new(&path, policy(4));

        file.write_all(b"a\n").unwrap();
        file.write_all(b"a much longer line\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "a much longer line\n");
        assert_eq!(file.backups().unwrap().len(), 1);
    }

    #[test]
    fn test_max_backups_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut file = RotatingFile::new(
            &path,
            RotationPolicy {
                max_backups: 2,
                ..policy(4)
            },
        );

        for line in ["one\n", "two\n", "three\n", "four\n", "five\n"] {
            file.write_all(line.as_bytes()).unwrap();
        }

        let backups = file.backups().unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(fs::read_to_string(&backups[0].path).unwrap(), "four\n");
        assert_eq!(fs::read_to_string(&backups[1].path).unwrap(), "three\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "five\n");
    }

    #[test]
    fn test_max_age_prunes_old_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let stale = dir.path().join("app-2001-01-01T00-00-00.000.log");
        let unrelated = dir.path().join("other-2001-01-01T00-00-00.000.log");
        fs::write(&stale, "stale\n").unwrap();
        fs::write(&unrelated, "keep\n").unwrap();

        let mut file = RotatingFile::new(
            &path,
            RotationPolicy {
                max_age: Some(Duration::days(30)),
                ..policy(1024)
            },
        );
        file.write_all(b"current\n").unwrap();
        file.rotate().unwrap();

        assert!(!stale.exists());
        assert!(unrelated.exists());
        assert_eq!(file.backups().unwrap().len(), 1);
    }

    #[test]
    fn test_compressed_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut file = RotatingFile::new(
            &path,
            RotationPolicy {
                compress: true,
                ..policy(8)
            },
        );

        file.write_all(b"first\n").unwrap();
        file.write_all(b"second\n").unwrap();

        let backups = file.backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert!(backups[0].compressed);
        assert!(backups[0].path.to_string_lossy().ends_with(".log.gz"));

        let mut decoded = String::new();
        GzDecoder::new(File::open(&backups[0].path).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "first\n");
    }

    #[test]
    fn test_backup_names_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut file = RotatingFile::new(&path, policy(1024));
        let now = Utc::now();

        file.write_all(b"a\n").unwrap();
        file.rotate_at(now).unwrap();
        file.write_all(b"b\n").unwrap();
        file.rotate_at(now).unwrap();

        assert_eq!(file.backups().unwrap().len(), 2);
    }
}
