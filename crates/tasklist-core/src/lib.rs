//! Core types for tasklist: the task entity, the derived-view query and the
//! persistence contract. Kept free of I/O so every front end can share it.

pub mod storage;
pub mod tasks;
