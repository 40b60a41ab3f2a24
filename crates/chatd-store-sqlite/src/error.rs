//! Error type for `chatd-store-sqlite`.

use chatd_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A domain error raised inside a transaction (typed not-found, decoding).
  #[error(transparent)]
  Core(#[from] chatd_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),
}

impl StoreError for Error {
  fn into_core(self) -> std::result::Result<chatd_core::Error, Self> {
    match self {
      Error::Core(e) => Ok(e),
      other => Err(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
