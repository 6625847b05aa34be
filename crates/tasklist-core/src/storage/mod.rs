mod task_storage;

#[cfg(any(test, feature = "test-util"))]
pub use task_storage::InMemoryTaskStorage;
pub use task_storage::{decode_tasks, encode_tasks, StorageError, TaskStorage};
