//! A library providing polling-based, multiplexed tailing for (namely log)
//! files, with transparent handling of log rotation.
//!
//! No kernel event integration is used: on each polling pass the watcher
//! re-expands its glob pattern, reconciles the set of watched files, and
//! reads whatever new bytes each file has. A file replaced at the same
//! path by a different storage object (rename+recreate rotation) is
//! detected by its [`FileIdentity`] changing; the old handle is drained
//! one last time before the new file is followed from offset zero.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use globtail::LogWatcher;
//!
//! fn main() -> Result<(), globtail::Error> {
//!     let mut watcher = LogWatcher::new("/var/log/**/*.log", |batch| {
//!         for line in batch.iter() {
//!             print!("({}) {}", batch.source().display(), String::from_utf8_lossy(line));
//!         }
//!         Ok(())
//!     })?;
//!
//!     // Emits new lines to the callback every 100ms, forever.
//!     watcher.run(Duration::from_millis(100))
//! }
//! ```
//!
//! ## Caveats
//!
//! Lines are raw byte buffers and drains deliver them with terminators
//! attached; an unterminated trailing fragment is handed over as-is at the
//! moment of the read and never buffered across passes, so a logical line
//! written slowly can arrive split across two batches. Decoding, if
//! desired, belongs to the caller or to a custom [`OpenStrategy`].

mod error;
mod identity;
mod strategy;
mod tail;
mod watcher;

pub use error::{CallbackError, Error, Result};
pub use identity::FileIdentity;
pub use strategy::{BinaryOpen, DirList, FileSource, GlobList, ListStrategy, OpenStrategy};
pub use tail::{tail, tail_with};
pub use watcher::{
    LineBatch, LogWatcher, LogWatcherBuilder, DEFAULT_POLL_INTERVAL, DEFAULT_READ_SIZE_HINT,
    DEFAULT_TAIL_LINES,
};

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
