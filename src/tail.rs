//! Reading the last N lines of a file via backward block reads.

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{Error, Result};
use crate::strategy::{BinaryOpen, OpenStrategy};

/// Block size for the backward scan. Small enough that a short tail of a
/// large file only touches its last few kilobytes.
const BLOCK_SIZE: u64 = 1024;

/// Reads the last `window` lines of the file at `path`.
///
/// Line terminators are stripped from the returned buffers, and a file
/// with fewer than `window` lines is returned whole. Fails with
/// [`Error::InvalidWindow`] when `window` is zero, and with
/// [`Error::NotFound`] when the path does not exist at call time.
pub fn tail(path: impl AsRef<Path>, window: usize) -> Result<Vec<Vec<u8>>> {
    tail_with(&BinaryOpen, path.as_ref(), window)
}

/// Like [`tail`], but opens the file through the supplied strategy.
pub fn tail_with(open: &dyn OpenStrategy, path: &Path, window: usize) -> Result<Vec<Vec<u8>>> {
    if window == 0 {
        return Err(Error::InvalidWindow(window));
    }

    let mut source = open.open(path).map_err(|e| Error::from_io(e, path))?;
    let size = source.seek(SeekFrom::End(0))?;

    // Walk backward one block at a time, prepending to the accumulator,
    // until enough terminators have been seen or the scan reaches the
    // start of the file.
    let mut data: Vec<u8> = Vec::new();
    let mut blocks_read: u64 = 0;
    loop {
        let span = (blocks_read + 1) * BLOCK_SIZE;
        let (offset, len, at_start) = if span >= size {
            (0, size - blocks_read * BLOCK_SIZE, true)
        } else {
            (size - span, BLOCK_SIZE, false)
        };

        source.seek(SeekFrom::Start(offset))?;
        let mut block = vec![0u8; len as usize];
        source.read_exact(&mut block)?;

        block.extend_from_slice(&data);
        data = block;

        if at_start || count_terminators(&data) >= window {
            break;
        }
        blocks_read += 1;
    }

    let mut lines = split_lines(&data);
    if lines.len() > window {
        lines.drain(..lines.len() - window);
    }
    Ok(lines)
}

fn count_terminators(data: &[u8]) -> usize {
    data.iter().filter(|&&b| b == b'\n').count()
}

/// Splits on `\n`, dropping terminators and any `\r` preceding them. A
/// trailing terminator does not produce an empty final line.
fn split_lines(data: &[u8]) -> Vec<Vec<u8>> {
    let mut lines: Vec<Vec<u8>> = data
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line).to_vec())
        .collect();
    if lines.last().map_or(false, |last| last.is_empty()) {
        lines.pop();
    }
    lines
}
