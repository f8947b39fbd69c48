use std::cell::RefCell;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use globtail::{CallbackError, LineBatch, LogWatcher};
use tempfile::tempdir;

type Captured = Rc<RefCell<Vec<(PathBuf, Vec<Vec<u8>>)>>>;

fn recorder() -> (Captured, impl FnMut(LineBatch) -> Result<(), CallbackError>) {
    let captured: Captured = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&captured);
    let callback = move |batch: LineBatch| -> Result<(), CallbackError> {
        let (source, lines) = batch.into_inner();
        sink.borrow_mut().push((source, lines));
        Ok(())
    };
    (captured, callback)
}

fn append(path: &Path, data: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(data).unwrap();
}

#[test]
fn test_rename_and_recreate() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.log");
    File::create(&path).unwrap();
    let pattern = dir.path().join("*.log");

    let (captured, callback) = recorder();
    let mut watcher = LogWatcher::new(pattern.to_str().unwrap(), callback).unwrap();

    // Classic logrotate move: last writes land in the old file, which is
    // renamed out of the pattern before a fresh file takes its path.
    append(&path, b"last\n");
    fs::rename(&path, dir.path().join("app.log.1")).unwrap();
    fs::write(&path, b"fresh\n").unwrap();

    watcher.poll_once().unwrap();

    let batches = captured.borrow();
    assert_eq!(batches.len(), 2);
    // Final drain of the old storage object, attributed to the watched path.
    assert_eq!(batches[0].0, path);
    assert_eq!(batches[0].1, vec![b"last\n".to_vec()]);
    // The replacement is followed from offset zero, not tailed.
    assert_eq!(batches[1].0, path);
    assert_eq!(batches[1].1, vec![b"fresh\n".to_vec()]);

    assert_eq!(watcher.len(), 1);
}

#[test]
fn test_delete_and_recreate() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.log");
    File::create(&path).unwrap();
    let pattern = dir.path().join("*.log");

    let (captured, callback) = recorder();
    let mut watcher = LogWatcher::new(pattern.to_str().unwrap(), callback).unwrap();

    append(&path, b"goodbye\n");
    fs::remove_file(&path).unwrap();
    fs::write(&path, b"hello\n").unwrap();

    watcher.poll_once().unwrap();

    let batches = captured.borrow();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].1, vec![b"goodbye\n".to_vec()]);
    assert_eq!(batches[1].1, vec![b"hello\n".to_vec()]);
    assert_eq!(watcher.len(), 1);
}

#[test]
fn test_rotation_with_nothing_pending() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.log");
    File::create(&path).unwrap();
    let pattern = dir.path().join("*.log");

    let (captured, callback) = recorder();
    let mut watcher = LogWatcher::new(pattern.to_str().unwrap(), callback).unwrap();

    // Old file had no unread bytes, so only the new content is emitted.
    fs::rename(&path, dir.path().join("app.log.1")).unwrap();
    fs::write(&path, b"fresh\n").unwrap();

    watcher.poll_once().unwrap();

    let batches = captured.borrow();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].1, vec![b"fresh\n".to_vec()]);
}
