//! Stable identity for a file's underlying storage object.

use std::fs::Metadata;
use std::io;
use std::path::Path;

/// Identifies a specific storage object independent of its path.
///
/// Two stats of the same underlying file yield equal identities, and a
/// file replaced at the same path by a different storage object yields a
/// different identity. Rotation detection hinges entirely on comparing
/// these values across polling cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    raw: (u64, u64),
}

impl FileIdentity {
    /// Derives an identity from file metadata.
    ///
    /// On Unix this is the device and inode pair, collision-free within a
    /// single filesystem namespace. Elsewhere it falls back to the file's
    /// creation timestamp, a weak approximation: two files created within
    /// the same clock tick are indistinguishable, and rotation can go
    /// undetected if the replacement's timestamp collides.
    #[cfg(unix)]
    pub fn from_metadata(metadata: &Metadata) -> io::Result<Self> {
        use std::os::unix::fs::MetadataExt;

        Ok(FileIdentity {
            raw: (metadata.dev(), metadata.ino()),
        })
    }

    #[cfg(not(unix))]
    pub fn from_metadata(metadata: &Metadata) -> io::Result<Self> {
        use std::time::UNIX_EPOCH;

        let created = metadata.created()?;
        let since_epoch = created
            .duration_since(UNIX_EPOCH)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        Ok(FileIdentity {
            raw: (since_epoch.as_secs(), u64::from(since_epoch.subsec_nanos())),
        })
    }

    /// Stats `path` and derives its identity. A `NotFound` error here is
    /// expected churn when a file vanishes between listing and stating;
    /// callers decide whether that is fatal.
    pub fn of(path: impl AsRef<Path>) -> io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Self::from_metadata(&metadata)
    }
}
