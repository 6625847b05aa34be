use std::{
    ffi::OsString,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use tasklist_core::{
    storage::{decode_tasks, encode_tasks, StorageError, TaskStorage},
    tasks::Task,
};
use tempfile::NamedTempFile;
use tracing::{debug, instrument, warn};

/// Task collection stored as a single JSON file, with the previous version
/// kept next to it under a `.bak` suffix.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    backup_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let backup_path = backup_path_for(&path);
        Self { path, backup_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Copy the current file over the backup. Failures are logged and ignored
    /// so they never block the primary write.
    fn rotate_backup(&self) {
        if !self.path.exists() {
            return;
        }
        match fs::copy(&self.path, &self.backup_path) {
            Ok(bytes) => debug!(backup = ?self.backup_path, bytes, "rotated task backup"),
            Err(err) => warn!(backup = ?self.backup_path, "failed to write task backup: {err}"),
        }
    }
}

impl TaskStorage for JsonFileStore {
    #[instrument(skip_all, fields(path = ?self.path))]
    fn load(&self) -> Result<Vec<Task>, StorageError> {
        let bytes = fs::read(&self.path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                StorageError::NotFound {
                    location: self.path.display().to_string(),
                }
            } else {
                storage_err(err)
            }
        })?;
        let tasks = decode_tasks(&bytes)?;
        debug!(count = tasks.len(), "loaded tasks");
        Ok(tasks)
    }

    #[instrument(skip_all, fields(path = ?self.path, count = tasks.len()))]
    fn save(&self, tasks: &[Task]) -> Result<(), StorageError> {
        let bytes = encode_tasks(tasks)?;
        self.rotate_backup();
        write_file(&self.path, &bytes)
    }

    #[instrument(skip_all, fields(path = ?self.path))]
    fn reset(&self) -> Result<(), StorageError> {
        write_file(&self.path, &encode_tasks(&[])?)
    }
}

fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(storage_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(storage_err)?;
    tmp.write_all(bytes).map_err(storage_err)?;
    tmp.flush().map_err(storage_err)?;
    tmp.persist(path).map_err(|e| storage_err(e.error))?;
    Ok(())
}

fn storage_err<E: ToString>(err: E) -> StorageError {
    StorageError::Io {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_tasks(path: &Path) -> Vec<Task> {
        decode_tasks(&fs::read(path).expect("read")).expect("decode")
    }

    #[test]
    fn missing_file_is_reported_as_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("tasks.json"));
        let err = store.load().expect_err("nothing written yet");
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn backup_sits_next_to_the_primary_file() {
        let store = JsonFileStore::new("/data/tasks.json");
        assert_eq!(store.backup_path(), Path::new("/data/tasks.json.bak"));
    }

    #[test]
    fn save_creates_parent_dirs_and_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("nested/deeper/tasks.json"));
        let tasks = vec![Task::new("write tests".into()), Task::new("ship".into())];

        store.save(&tasks).expect("save");
        assert_eq!(store.load().expect("load"), tasks);
        assert!(!store.backup_path().exists(), "first save has nothing to back up");
    }

    #[test]
    fn save_copies_previous_contents_to_backup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("tasks.json"));
        let first = vec![Task::new("first".into())];
        let second = vec![Task::new("second".into())];

        store.save(&first).expect("first save");
        let before = fs::read(store.path()).expect("read primary");
        store.save(&second).expect("second save");

        assert_eq!(fs::read(store.backup_path()).expect("read backup"), before);
        assert_eq!(read_tasks(store.path()), second);
    }

    #[test]
    fn reset_empties_primary_and_keeps_backup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("tasks.json"));
        let tasks = vec![Task::new("keep me".into())];
        store.save(&tasks).expect("save");
        store.save(&tasks).expect("save again");

        fs::write(store.path(), "{ broken").expect("corrupt primary");
        store.reset().expect("reset");

        assert_eq!(fs::read_to_string(store.path()).expect("read"), "[]");
        assert_eq!(read_tasks(store.backup_path()), tasks);
    }

    #[test]
    fn backup_failure_does_not_block_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("tasks.json"));
        store.save(&[]).expect("initial save");
        // A directory in the backup's place makes the copy fail.
        fs::create_dir(store.backup_path()).expect("block backup path");

        let tasks = vec![Task::new("still saved".into())];
        store.save(&tasks).expect("save despite backup failure");
        assert_eq!(read_tasks(store.path()), tasks);
    }

    #[test]
    fn corrupt_and_misshapen_files_are_distinguished() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("tasks.json"));

        fs::write(store.path(), "not json at all").expect("write");
        assert!(matches!(store.load(), Err(StorageError::Corrupt { .. })));

        fs::write(store.path(), r#"{"title": "object, not array"}"#).expect("write");
        assert!(matches!(store.load(), Err(StorageError::Invalid { .. })));
    }

    #[test]
    fn unreadable_path_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path());
        assert!(matches!(store.load(), Err(StorageError::Io { .. })));
    }

    #[test]
    fn loads_files_written_by_earlier_versions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.json");
        fs::write(
            &path,
            r#"[
  {
    "id": "5f1d7c2e-0a4b-4c8e-9b61-3f2a9d8e7c10",
    "title": "Comprar pão",
    "completed": true,
    "created_at": "2024-03-02T08:15:00.000001",
    "updated_at": "2024-03-02T09:00:00.5"
  },
  {
    "id": "c3e1b0d4-6f7a-4e2b-8c9d-1a2b3c4d5e6f",
    "title": "Sem flag",
    "created_at": "2024-03-01T18:00:00"
  }
]"#,
        )
        .expect("write legacy file");

        let tasks = JsonFileStore::new(&path).load().expect("load legacy");
        assert_eq!(tasks.len(), 2);
        assert!(tasks[0].completed && tasks[0].updated_at.is_some());
        assert!(!tasks[1].completed && tasks[1].updated_at.is_none());
        assert_eq!(tasks[1].id.as_str(), "c3e1b0d4-6f7a-4e2b-8c9d-1a2b3c4d5e6f");
    }
}
