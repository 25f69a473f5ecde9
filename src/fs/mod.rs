//! Filesystem utilities for awflow.

pub mod atomic;

pub use atomic::atomic_write_file;
