//! File-backed task storage: a pretty-printed JSON array plus a `.bak`
//! copy of the previous version, refreshed on every save.

pub mod json_file_store;

pub use json_file_store::JsonFileStore;
