//! Pluggable strategies for candidate listing and file opening.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// An open file handle the watcher can read incrementally. The handle's
/// own position serves as the read cursor.
pub trait FileSource: Read + Seek {}

impl<T: Read + Seek> FileSource for T {}

/// Decides how candidate files are enumerated on each refresh.
///
/// The default is [`GlobList`]; an alternative such as [`DirList`] may be
/// supplied at construction. Order of the returned paths is not
/// significant.
pub trait ListStrategy {
    fn list(&self) -> Result<Vec<PathBuf>>;
}

/// Decides how a file is opened for reading.
///
/// The default is [`BinaryOpen`], so the watcher hands raw byte buffers to
/// the callback and any decoding is the consumer's concern. An override
/// may wrap the handle with a decoding reader; a decode failure then
/// surfaces as an ordinary I/O error and is fatal.
pub trait OpenStrategy {
    fn open(&self, path: &Path) -> io::Result<Box<dyn FileSource>>;
}

/// Default listing strategy: expand a glob pattern.
pub struct GlobList {
    pattern: String,
}

impl GlobList {
    /// Validates `pattern` eagerly so a malformed pattern fails at
    /// construction rather than on the first refresh.
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        glob::Pattern::new(&pattern)?;
        Ok(GlobList { pattern })
    }
}

impl ListStrategy for GlobList {
    fn list(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in glob::glob(&self.pattern)? {
            match entry {
                Ok(path) => paths.push(path),
                // An unreadable entry mid-walk is an unexpected I/O
                // failure, unlike a file that simply vanished.
                Err(err) => return Err(Error::Io(err.into_error())),
            }
        }
        Ok(paths)
    }
}

/// Alternate listing strategy: a single directory, filtered by file
/// extension. A missing directory yields an empty candidate list, same as
/// a glob that matches nothing.
pub struct DirList {
    dir: PathBuf,
    extensions: Vec<OsString>,
}

impl DirList {
    pub fn new<I, S>(dir: impl Into<PathBuf>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        DirList {
            dir: dir.into(),
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }
}

impl ListStrategy for DirList {
    fn list(&self) -> Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            match path.extension() {
                Some(ext) if self.extensions.iter().any(|want| want.as_os_str() == ext) => {
                    paths.push(path)
                }
                _ => {}
            }
        }
        Ok(paths)
    }
}

/// Default open strategy: raw binary.
pub struct BinaryOpen;

impl OpenStrategy for BinaryOpen {
    fn open(&self, path: &Path) -> io::Result<Box<dyn FileSource>> {
        let file = File::open(path)?;
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_glob_list_rejects_bad_pattern() {
        assert!(matches!(GlobList::new("logs/a["), Err(Error::Pattern(_))));
    }

    #[test]
    fn test_glob_list_matches() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("a.log")).unwrap();
        File::create(dir.path().join("b.txt")).unwrap();

        let pattern = dir.path().join("*.log");
        let list = GlobList::new(pattern.to_str().unwrap()).unwrap();
        let paths = list.list().unwrap();
        assert_eq!(paths, vec![dir.path().join("a.log")]);
    }

    #[test]
    fn test_dir_list_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("a.log")).unwrap();
        File::create(dir.path().join("b.txt")).unwrap();
        File::create(dir.path().join("noext")).unwrap();

        let list = DirList::new(dir.path(), ["log", "txt"]);
        let mut paths = list.list().unwrap();
        paths.sort();
        assert_eq!(
            paths,
            vec![dir.path().join("a.log"), dir.path().join("b.txt")]
        );
    }

    #[test]
    fn test_dir_list_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let list = DirList::new(dir.path().join("nope"), ["log"]);
        assert!(list.list().unwrap().is_empty());
    }
}
