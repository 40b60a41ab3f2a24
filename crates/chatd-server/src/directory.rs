//! HTTP client for the external directory services.
//!
//! A snapshot is three listings: tenants and sessions from the identity
//! service, users from the configuration service. Each answers
//! `{"items": [...]}`. Any transport or decoding failure surfaces as
//! [`Error::UpstreamUnavailable`].

use std::time::Duration;

use anyhow::Context as _;
use chatd_core::{
  Error, Result,
  snapshot::{Snapshot, SnapshotFetcher, SnapshotSession, SnapshotTenant, SnapshotUser},
};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};

use crate::DirectoryConfig;

const TOKEN_HEADER: &str = "X-Auth-Token";

/// One page of a directory listing. Fields the snapshot does not need are
/// ignored.
#[derive(Debug, Deserialize)]
struct Items<T> {
  items: Vec<T>,
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct DirectoryClient {
  client: Client,
  config: DirectoryConfig,
}

impl DirectoryClient {
  pub fn new(config: DirectoryConfig) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout())
      .connect_timeout(Duration::from_secs(5))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(base: &str, path: &str) -> String { format!("{}{}", base.trim_end_matches('/'), path) }

  async fn list<T: DeserializeOwned>(&self, url: String, recurse: bool) -> Result<Vec<T>> {
    let mut req = self.client.get(&url);
    if recurse {
      req = req.query(&[("recurse", "true")]);
    }
    if !self.config.token.is_empty() {
      req = req.header(TOKEN_HEADER, &self.config.token);
    }

    let resp = req
      .send()
      .await
      .map_err(|e| Error::UpstreamUnavailable(format!("GET {url} failed: {e}")))?;
    if !resp.status().is_success() {
      return Err(Error::UpstreamUnavailable(format!("GET {url} → {}", resp.status())));
    }
    let page: Items<T> = resp
      .json()
      .await
      .map_err(|e| Error::UpstreamUnavailable(format!("GET {url}: bad listing: {e}")))?;
    Ok(page.items)
  }

  /// `GET {auth_url}/tenants`
  pub async fn tenants(&self) -> Result<Vec<SnapshotTenant>> {
    self.list(Self::url(&self.config.auth_url, "/tenants"), false).await
  }

  /// `GET {confd_url}/users?recurse=true`
  pub async fn users(&self) -> Result<Vec<SnapshotUser>> {
    self.list(Self::url(&self.config.confd_url, "/users"), true).await
  }

  /// `GET {auth_url}/sessions?recurse=true`
  pub async fn sessions(&self) -> Result<Vec<SnapshotSession>> {
    self.list(Self::url(&self.config.auth_url, "/sessions"), true).await
  }
}

impl SnapshotFetcher for DirectoryClient {
  async fn fetch_all(&self) -> Result<Snapshot> {
    let (tenants, users, sessions) =
      tokio::try_join!(self.tenants(), self.users(), self.sessions())?;
    Ok(Snapshot { tenants, users, sessions })
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use uuid::Uuid;

  use super::*;

  fn config(auth_url: &str) -> DirectoryConfig {
    DirectoryConfig {
      auth_url:           auth_url.into(),
      confd_url:          auth_url.into(),
      token:              String::new(),
      timeout_secs:       1,
      announce_new_users: true,
    }
  }

  #[test]
  fn listing_ignores_extra_fields() {
    let (uuid, user, tenant) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let page: Items<SnapshotSession> = serde_json::from_value(json!({
      "total": 1,
      "items": [{
        "uuid": uuid,
        "user_uuid": user,
        "tenant_uuid": tenant,
        "mobile": true,
        "expiration": 3600,
      }],
    }))
    .unwrap();

    assert_eq!(page.items, vec![SnapshotSession { uuid, user_uuid: user, tenant_uuid: tenant, mobile: true }]);
  }

  #[test]
  fn session_mobile_defaults_to_false() {
    let page: Items<SnapshotSession> = serde_json::from_value(json!({
      "items": [{ "uuid": Uuid::new_v4(), "user_uuid": Uuid::new_v4(), "tenant_uuid": Uuid::new_v4() }],
    }))
    .unwrap();
    assert!(!page.items[0].mobile);
  }

  #[test]
  fn urls_join_without_double_slash() {
    assert_eq!(DirectoryClient::url("http://auth/0.1/", "/tenants"), "http://auth/0.1/tenants");
    assert_eq!(DirectoryClient::url("http://auth/0.1", "/tenants"), "http://auth/0.1/tenants");
  }

  #[tokio::test]
  async fn unreachable_directory_is_upstream_unavailable() {
    // Port 9 (discard) on localhost is not expected to serve HTTP.
    let client = DirectoryClient::new(config("http://127.0.0.1:9")).unwrap();
    let err = client.fetch_all().await.unwrap_err();
    assert!(matches!(err, Error::UpstreamUnavailable(_)));
  }
}
