//! Everything related to the polling watch set: identity tracking,
//! rotation handling, and incremental line dispatch.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::slice::Iter;
use std::time::Duration;

use crate::error::{CallbackError, Error, Result};
use crate::identity::FileIdentity;
use crate::strategy::{BinaryOpen, FileSource, GlobList, ListStrategy, OpenStrategy};
use crate::tail::tail_with;

/// Number of historical lines emitted per already-present file at startup,
/// unless overridden.
pub const DEFAULT_TAIL_LINES: usize = 10;

/// Upper bound on the bytes read from a file per drain chunk, unless
/// overridden.
pub const DEFAULT_READ_SIZE_HINT: usize = 1024 * 1024;

/// Polling interval conventionally passed to [`LogWatcher::run`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Batch of lines captured for a given source path.
///
/// This is structured with performance in mind, and to provide the caller
/// extra context about the set. Lines are raw byte buffers: batches from
/// an incremental drain keep their terminators, batches from the startup
/// tail pass have them stripped.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct LineBatch {
    /// The path from where the lines were read.
    source: PathBuf,
    /// The batched list of lines.
    lines: Vec<Vec<u8>>,
}

impl LineBatch {
    pub(crate) fn new(source: PathBuf, lines: Vec<Vec<u8>>) -> Self {
        LineBatch { source, lines }
    }

    /// Returns a reference to the file from where the lines were read.
    pub fn source(&self) -> &Path {
        self.source.as_path()
    }

    /// Returns a slice of the batched lines.
    pub fn lines(&self) -> &[Vec<u8>] {
        self.lines.as_slice()
    }

    /// Returns an iterator over the batched lines.
    pub fn iter(&self) -> Iter<'_, Vec<u8>> {
        self.lines().iter()
    }

    /// Returns the number of lines in the batch.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if the number of lines in the batch is zero.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the internal components that make up a `LineBatch`.
    pub fn into_inner(self) -> (PathBuf, Vec<Vec<u8>>) {
        let LineBatch { source, lines } = self;

        (source, lines)
    }
}

impl IntoIterator for LineBatch {
    type Item = Vec<u8>;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.into_iter()
    }
}

/// An open handle whose position marks the last byte already delivered to
/// the callback.
struct WatchedFile {
    path: PathBuf,
    source: Box<dyn FileSource>,
}

/// Configures and constructs a [`LogWatcher`].
pub struct LogWatcherBuilder {
    list: Box<dyn ListStrategy>,
    open: Box<dyn OpenStrategy>,
    tail_lines: usize,
    read_size_hint: usize,
}

impl LogWatcherBuilder {
    /// Starts a builder for a watcher over files matching `pattern`. The
    /// pattern is validated eagerly.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(LogWatcherBuilder {
            list: Box::new(GlobList::new(pattern)?),
            open: Box::new(BinaryOpen),
            tail_lines: DEFAULT_TAIL_LINES,
            read_size_hint: DEFAULT_READ_SIZE_HINT,
        })
    }

    /// Number of historical lines to emit per already-present file before
    /// following. Zero disables the startup tail. Files discovered after
    /// construction are never tailed; they start at offset zero.
    pub fn tail_lines(mut self, lines: usize) -> Self {
        self.tail_lines = lines;
        self
    }

    /// Upper bound on the bytes read per drain chunk.
    pub fn read_size_hint(mut self, bytes: usize) -> Self {
        self.read_size_hint = bytes;
        self
    }

    /// Replaces the candidate enumeration strategy.
    pub fn list_strategy(mut self, list: impl ListStrategy + 'static) -> Self {
        self.list = Box::new(list);
        self
    }

    /// Replaces the file open strategy.
    pub fn open_strategy(mut self, open: impl OpenStrategy + 'static) -> Self {
        self.open = Box::new(open);
        self
    }

    /// Builds the watcher: discovers the files currently matching, seeks
    /// every handle to its end so future drains only see appended content,
    /// then emits the configured historical tail per file through the
    /// callback. A file that vanishes during the tail pass is skipped;
    /// any other I/O error propagates.
    pub fn build<F>(self, callback: F) -> Result<LogWatcher<F>>
    where
        F: FnMut(LineBatch) -> std::result::Result<(), CallbackError>,
    {
        let mut watcher = LogWatcher {
            watched: HashMap::new(),
            list: self.list,
            open: self.open,
            callback,
            read_size_hint: self.read_size_hint,
        };
        watcher.refresh()?;

        for entry in watcher.watched.values_mut() {
            entry.source.seek(SeekFrom::End(0))?;
        }

        if self.tail_lines > 0 {
            let paths: Vec<PathBuf> = watcher
                .watched
                .values()
                .map(|entry| entry.path.clone())
                .collect();
            for path in paths {
                let lines = match tail_with(watcher.open.as_ref(), &path, self.tail_lines) {
                    Ok(lines) => lines,
                    Err(err) if err.is_not_found() => continue,
                    Err(err) => return Err(err),
                };
                if !lines.is_empty() {
                    (watcher.callback)(LineBatch::new(path, lines)).map_err(Error::Callback)?;
                }
            }
        }

        Ok(watcher)
    }
}

/// Watches a set of files selected by a listing strategy, polling for
/// appended content and transparently handling rotation.
///
/// On every polling pass the watcher reconciles its watch set against the
/// files currently matching, then reads whatever new bytes each watched
/// file has and hands them to the callback as a [`LineBatch`]. A file
/// replaced at the same path by a different storage object is detected by
/// its [`FileIdentity`] changing: the old handle gets one final drain, the
/// new file is followed from offset zero.
///
/// ## Example
///
/// ```no_run
/// use globtail::LogWatcher;
///
/// fn main() -> Result<(), globtail::Error> {
///     let mut watcher = LogWatcher::new("/var/log/*.log", |batch| {
///         for line in batch.iter() {
///             print!("({}) {}", batch.source().display(), String::from_utf8_lossy(line));
///         }
///         Ok(())
///     })?;
///
///     watcher.run(std::time::Duration::from_millis(100))
/// }
/// ```
pub struct LogWatcher<F> {
    watched: HashMap<FileIdentity, WatchedFile>,
    list: Box<dyn ListStrategy>,
    open: Box<dyn OpenStrategy>,
    callback: F,
    read_size_hint: usize,
}

impl<F> LogWatcher<F> {
    /// Number of files currently watched.
    pub fn len(&self) -> usize {
        self.watched.len()
    }

    /// Returns `true` if no files are currently watched.
    pub fn is_empty(&self) -> bool {
        self.watched.is_empty()
    }

    /// Releases every watched handle and clears the set. Idempotent, and
    /// also invoked on drop, so handles never leak even if the caller
    /// forgets to close explicitly.
    pub fn close(&mut self) {
        self.watched.clear();
    }
}

impl<F> LogWatcher<F>
where
    F: FnMut(LineBatch) -> std::result::Result<(), CallbackError>,
{
    /// Constructs a watcher over `pattern` with the default tail window
    /// and read chunk size. See [`LogWatcherBuilder`] for the knobs.
    pub fn new(pattern: &str, callback: F) -> Result<Self> {
        LogWatcherBuilder::new(pattern)?.build(callback)
    }

    /// Runs refresh-then-drain passes forever, sleeping `interval` between
    /// passes. Expected to be stopped by external process termination; for
    /// a single pass use [`poll_once`](Self::poll_once).
    pub fn run(&mut self, interval: Duration) -> Result<()> {
        loop {
            self.poll_once()?;
            std::thread::sleep(interval);
        }
    }

    /// Performs exactly one refresh-then-drain pass and returns, never
    /// waiting for new data to arrive.
    pub fn poll_once(&mut self) -> Result<()> {
        self.refresh()?;

        let ids: Vec<FileIdentity> = self.watched.keys().copied().collect();
        for id in ids {
            if let Some(entry) = self.watched.get_mut(&id) {
                drain(entry, self.read_size_hint, &mut self.callback)?;
            }
        }
        Ok(())
    }

    /// Reconciles the watch set against the current directory contents:
    /// picks up new files, drops removed ones after a final drain, and
    /// rewatches rotated paths from offset zero.
    fn refresh(&mut self) -> Result<()> {
        let mut candidates: Vec<(FileIdentity, PathBuf)> = Vec::new();
        for path in self.list.list()? {
            let metadata = match std::fs::symlink_metadata(&path) {
                Ok(metadata) => metadata,
                // Vanished between listing and stating: ordinary churn.
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            // Regular files only; symlinks, directories and special files
            // are not followed.
            if !metadata.file_type().is_file() {
                continue;
            }
            candidates.push((FileIdentity::from_metadata(&metadata)?, path));
        }

        // Re-stat everything currently watched to spot removals and
        // rotations before any new entries are added.
        let watched: Vec<(FileIdentity, PathBuf)> = self
            .watched
            .iter()
            .map(|(id, entry)| (*id, entry.path.clone()))
            .collect();
        for (id, path) in watched {
            match std::fs::metadata(&path) {
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    self.unwatch(id)?;
                }
                Err(err) => return Err(err.into()),
                Ok(metadata) => {
                    if FileIdentity::from_metadata(&metadata)? != id {
                        // Same path, different storage object: the file
                        // rotated underneath us. Reload it from scratch.
                        tracing::debug!(path = %path.display(), "log rotation detected");
                        self.unwatch(id)?;
                        self.watch(&path)?;
                    }
                }
            }
        }

        for (id, path) in candidates {
            if !self.watched.contains_key(&id) {
                self.watch(&path)?;
            }
        }
        Ok(())
    }

    /// Opens `path` and adds it to the watch set with the cursor at byte
    /// zero. A path that vanished since listing is skipped silently.
    fn watch(&mut self, path: &Path) -> Result<()> {
        let source = match self.open.open(path) {
            Ok(source) => source,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        let id = match FileIdentity::of(path) {
            Ok(id) => id,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        tracing::info!(path = %path.display(), "watching logfile");
        self.watched.insert(
            id,
            WatchedFile {
                path: path.to_path_buf(),
                source,
            },
        );
        Ok(())
    }

    /// Drops `id` from the watch set after one final drain of whatever the
    /// old handle can still read, so a rename-then-recreate rotation does
    /// not lose the last lines written to the old file.
    fn unwatch(&mut self, id: FileIdentity) -> Result<()> {
        if let Some(mut entry) = self.watched.remove(&id) {
            tracing::info!(path = %entry.path.display(), "un-watching logfile");
            drain(&mut entry, self.read_size_hint, &mut self.callback)?;
        }
        Ok(())
    }
}

impl<F> Drop for LogWatcher<F> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Reads all bytes currently available past the handle's position,
/// invoking the callback once per non-empty chunk, and returns as soon as
/// a read comes back empty.
fn drain<F>(entry: &mut WatchedFile, size_hint: usize, callback: &mut F) -> Result<()>
where
    F: FnMut(LineBatch) -> std::result::Result<(), CallbackError>,
{
    loop {
        let mut chunk = vec![0u8; size_hint];
        let read = entry.source.read(&mut chunk)?;
        if read == 0 {
            return Ok(());
        }
        chunk.truncate(read);

        let lines = split_chunk(&chunk);
        callback(LineBatch::new(entry.path.clone(), lines)).map_err(Error::Callback)?;
    }
}

/// Splits a drain chunk into lines, keeping terminators. A trailing
/// fragment without a terminator is delivered as its own line and is not
/// carried over to the next drain, so a slow writer can see one logical
/// line arrive split across two batches.
fn split_chunk(chunk: &[u8]) -> Vec<Vec<u8>> {
    chunk
        .split_inclusive(|&b| b == b'\n')
        .map(<[u8]>::to_vec)
        .collect()
}
