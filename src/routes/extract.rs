//! Request extractors: which client is calling, and who is signed in.

use std::{convert::Infallible, sync::Arc};

use axum::{
  async_trait,
  extract::FromRequestParts,
  http::request::Parts,
  response::Redirect,
};

use crate::domain::UserProfile;
use crate::error::AppError;
use crate::state::AppState;
use crate::storage::ClientStorage;

pub const CLIENT_ID_HEADER: &str = "x-client-id";
/// Query fallback for clients that cannot set headers (browser WebSockets).
pub const CLIENT_ID_QUERY: &str = "clientId";
pub const ANONYMOUS_CLIENT: &str = "anonymous";
pub const LOGIN_URL: &str = "/login";
pub const HOME_URL: &str = "/home";

fn client_id(parts: &Parts) -> String {
  let from_header = parts
    .headers
    .get(CLIENT_ID_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty());
  let from_query = || {
    parts.uri.query().and_then(|q| {
      q.split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == CLIENT_ID_QUERY)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
    })
  };
  from_header.or_else(from_query).unwrap_or(ANONYMOUS_CLIENT).to_string()
}

/// The caller's storage namespace. Never rejects; unknown callers share `anonymous`.
pub struct Client(pub ClientStorage);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Client {
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
    Ok(Client(state.storage_for(&client_id(parts))))
  }
}

/// Signed-in caller for API routes; rejects with 401 JSON.
pub struct SessionUser {
  pub storage: ClientStorage,
  pub user: UserProfile,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for SessionUser {
  type Rejection = AppError;

  async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
    let storage = state.storage_for(&client_id(parts));
    match state.auth.current_user(&storage) {
      Some(user) => Ok(SessionUser { storage, user }),
      None => Err(AppError::Unauthorized),
    }
  }
}

/// Signed-in caller for page routes; anyone else is sent to the login page.
pub struct PageUser {
  pub storage: ClientStorage,
  pub user: UserProfile,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for PageUser {
  type Rejection = Redirect;

  async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
    let storage = state.storage_for(&client_id(parts));
    match state.auth.current_user(&storage) {
      Some(user) => Ok(PageUser { storage, user }),
      None => Err(Redirect::to(LOGIN_URL)),
    }
  }
}
