use thiserror::Error;

use crate::config::ConfigError;
use crate::serial::ArchiveError;

/// Crate-level convenience error: a thin wrapper over the per-module errors.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
