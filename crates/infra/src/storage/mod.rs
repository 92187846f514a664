//! Storage backends

pub mod file;

pub use file::FileBackend;
