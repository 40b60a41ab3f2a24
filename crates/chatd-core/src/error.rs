//! Error types for `chatd-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no such tenant: {0}")]
  UnknownTenant(Uuid),

  #[error("no such user: {0}")]
  UnknownUser(Uuid),

  #[error("no such session: {0}")]
  UnknownSession(Uuid),

  #[error("no such room: {0}")]
  UnknownRoom(Uuid),

  #[error("no such refresh token: {0:?}")]
  UnknownRefreshToken(String),

  #[error("unknown presence state: {0:?}")]
  UnknownState(String),

  #[error("upstream unavailable: {0}")]
  UpstreamUnavailable(String),

  /// A failure inside the storage backend, boxed so this crate stays free of
  /// database dependencies.
  #[error("backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap any backend error.
  pub fn backend(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Backend(Box::new(e))
  }

  /// True for the typed lookup failures that map to a 404 at the boundary.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::UnknownTenant(_)
        | Self::UnknownUser(_)
        | Self::UnknownSession(_)
        | Self::UnknownRoom(_)
        | Self::UnknownRefreshToken(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
