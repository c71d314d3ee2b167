//! Crate-level error type.

use crate::config::ConfigError;
use crate::event::DataError;
use thiserror::Error;

/// Any failure that aborts a preprocessing run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Data(#[from] DataError),
}

pub type Result<T> = std::result::Result<T, Error>;
