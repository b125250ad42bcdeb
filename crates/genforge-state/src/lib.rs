//! Genforge-State: project file records and workspace persistence
//!
//! This crate holds the records every other genforge crate passes around and
//! the persistence contract the pipeline talks to.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: file-set integrity (unique paths, last write wins) and a
//! backend-agnostic store.
//!
//! ## Key Components
//!
//! - `FileOperation`: one generated or existing file plus its operation
//! - `ProjectStore`: load/save workspace files and publish session status
//! - `MemoryProjectStore` / `FsProjectStore`: in-memory fake and filesystem backend

mod error;
pub mod fakes;
pub mod file_op;
pub mod fs;
pub mod storage_traits;

pub use error::StoreError;
pub use fakes::MemoryProjectStore;
pub use file_op::{dedupe_by_path, merge_by_path, FileOperation, OperationKind};
pub use fs::FsProjectStore;
pub use storage_traits::{ProjectStore, SessionRecord, SessionStatus, StoreResult};
