use tasklist_core::{
    storage::{StorageError, TaskStorage},
    tasks::{self, normalize_title, SortMode, Task, TaskError, TaskId, TaskStats},
};
use tracing::{debug, instrument, warn};

/// Owner of the task collection. Every mutation is written through to the
/// backing `TaskStorage` before the call returns.
///
/// When a write fails the mutation has still been applied in memory, which
/// stays authoritative; the returned `TaskError::StorageIo` tells the caller
/// that the change is not yet on disk.
pub struct TaskStore<S: TaskStorage> {
    storage: S,
    tasks: Vec<Task>,
    /// Set when the stored copy could not be read and was left in place.
    /// Cleared by the first mutation or explicit save.
    load_failed: bool,
}

impl<S: TaskStorage> TaskStore<S> {
    /// Load the collection, falling back to an empty one when the stored copy
    /// is missing or unusable. The second value is a notice for the user.
    ///
    /// A missing file is created right away. A file that is not JSON at all
    /// is overwritten with an empty list, leaving the backup alone. Any other
    /// failure leaves the file untouched.
    #[instrument(skip_all)]
    pub fn open(storage: S) -> (Self, Option<TaskError>) {
        match storage.load() {
            Ok(tasks) => {
                debug!(count = tasks.len(), "opened task store");
                let store = Self {
                    storage,
                    tasks,
                    load_failed: false,
                };
                (store, None)
            }
            Err(StorageError::NotFound { location }) => {
                debug!(%location, "no task file yet, creating an empty one");
                let store = Self::empty(storage);
                let warning = store.persist().err();
                (store, warning)
            }
            Err(StorageError::Corrupt { reason }) => {
                warn!("task file is corrupt, starting empty: {reason}");
                let store = Self::empty(storage);
                if let Err(err) = store.storage.reset() {
                    warn!("failed to reset corrupt task file: {err}");
                }
                (store, Some(TaskError::CorruptStorage { reason }))
            }
            Err(err) => {
                warn!("failed to load tasks, starting empty: {err}");
                let mut store = Self::empty(storage);
                store.load_failed = true;
                (store, Some(err.into()))
            }
        }
    }

    fn empty(storage: S) -> Self {
        Self {
            storage,
            tasks: Vec::new(),
            load_failed: false,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Tasks in stored order, newest insertions first.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    #[instrument(skip(self))]
    pub fn create(&mut self, title: &str) -> Result<Task, TaskError> {
        let title = normalize_title(title)?;
        let mut task = Task::new(title);
        while self.get(&task.id).is_some() {
            task.id = TaskId::generate();
        }
        self.tasks.insert(0, task.clone());
        debug!(id = %task.id, "created task");
        self.commit()?;
        Ok(task)
    }

    #[instrument(skip(self))]
    pub fn edit(&mut self, id: &TaskId, title: &str) -> Result<Task, TaskError> {
        let idx = self.position(id)?;
        let title = normalize_title(title)?;
        self.tasks[idx].rename(title);
        let updated = self.tasks[idx].clone();
        self.commit()?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub fn toggle_completed(&mut self, id: &TaskId) -> Result<Task, TaskError> {
        let idx = self.position(id)?;
        self.tasks[idx].toggle();
        let updated = self.tasks[idx].clone();
        debug!(completed = updated.completed, "toggled task");
        self.commit()?;
        Ok(updated)
    }

    /// Remove a task, handing it back for confirmation messages.
    #[instrument(skip(self))]
    pub fn delete(&mut self, id: &TaskId) -> Result<Task, TaskError> {
        let idx = self.position(id)?;
        let removed = self.tasks.remove(idx);
        self.commit()?;
        Ok(removed)
    }

    /// Drop every completed task and return how many went. Nothing is written
    /// when there was nothing to remove.
    #[instrument(skip(self))]
    pub fn clear_completed(&mut self) -> Result<usize, TaskError> {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        let removed = before - self.tasks.len();
        if removed > 0 {
            debug!(removed, "cleared completed tasks");
            self.commit()?;
        }
        Ok(removed)
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks)
    }

    /// Filtered and sorted copy of the collection for display.
    pub fn query(&self, search: &str, mode: SortMode) -> Vec<Task> {
        tasks::query(&self.tasks, search, mode)
    }

    /// Explicit save requested by the user. Writes even when loading failed.
    pub fn save(&mut self) -> Result<(), TaskError> {
        self.commit()
    }

    /// Final save at shutdown. Skipped when the stored copy could not be read
    /// and nothing has changed since, so that copy survives untouched.
    #[instrument(skip_all)]
    pub fn close(self) -> Result<(), TaskError> {
        if self.load_failed {
            debug!("leaving unreadable task file in place");
            return Ok(());
        }
        self.persist()
    }

    fn position(&self, id: &TaskId) -> Result<usize, TaskError> {
        self.tasks
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| TaskError::NotFound { id: id.to_string() })
    }

    fn commit(&mut self) -> Result<(), TaskError> {
        self.load_failed = false;
        self.persist()
    }

    fn persist(&self) -> Result<(), TaskError> {
        self.storage.save(&self.tasks).map_err(|err| {
            warn!("failed to persist tasks: {err}");
            TaskError::from(err)
        })
    }
}
