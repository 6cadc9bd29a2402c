// src/lib.rs

pub mod config;
pub mod core;
pub mod error;
pub mod persistence;
pub mod storage;
pub use crate::core::engine::{LocationStatus, ProgressEngine};
pub use crate::persistence::FileStore;
pub use crate::storage::{KeyValueStore, MemoryStore};
