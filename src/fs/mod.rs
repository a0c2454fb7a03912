//! Filesystem utilities for keylock.
//!
//! Atomic writes for files the CLI owns outright, such as `config.yaml`.
//! Lock files have their own exclusive-create protocol in
//! [`FileStore`](crate::store::FileStore).

mod atomic;

pub use atomic::{atomic_write, atomic_write_file};
