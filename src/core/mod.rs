// src/core/mod.rs
//! Filesystem plumbing shared by the stores

pub mod fs_ops;

pub use fs_ops::FsOps;
