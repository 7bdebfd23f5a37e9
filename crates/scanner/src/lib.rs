#![allow(
    clippy::collapsible_if,
    clippy::manual_range_contains
)]
pub mod parser;
pub mod rename;
pub mod subtitles;
pub mod walk;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("show folder does not exist: {0}")]
    MissingDirectory(PathBuf),
    #[error("refusing to overwrite existing file: {0}")]
    TargetExists(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
