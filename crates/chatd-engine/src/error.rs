//! Error type for `chatd-engine`.

use chatd_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A typed domain failure: not-found, upstream unavailable, bad state.
  #[error(transparent)]
  Domain(#[from] chatd_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Lift a backend error, keeping any domain error it carries typed.
  pub fn from_store<E: StoreError>(e: E) -> Self {
    match e.into_core() {
      Ok(core) => Self::Domain(core),
      Err(other) => Self::Store(Box::new(other)),
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::Domain(e) if e.is_not_found())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
