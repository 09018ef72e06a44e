//! Readers, writers, and in memory representations for each supported file type.
pub mod mesh;
pub mod skeleton;
