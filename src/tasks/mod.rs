//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Cache Cleanup: Removes expired cache backend entries and local snapshots at configured intervals

mod cleanup;

pub use cleanup::spawn_cleanup_task;
