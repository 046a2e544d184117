//! Mock authentication.
//!
//! `AuthProvider` is the capability the rest of the app talks to. `MockAuth`
//! keeps the signed-in profile in client storage; a real identity provider can
//! implement the same trait without touching handlers.

use tracing::info;

use crate::domain::UserProfile;
use crate::seeds::default_profile;
use crate::storage::{ClientStorage, USER_SESSION_KEY};

#[derive(Clone, Debug)]
pub struct Credentials {
  pub name: Option<String>,
  pub email: String,
  pub password: String,
}

pub trait AuthProvider: Send + Sync {
  fn current_user(&self, storage: &ClientStorage) -> Option<UserProfile>;
  fn sign_in(&self, storage: &ClientStorage, credentials: &Credentials) -> Result<UserProfile, String>;
  fn sign_out(&self, storage: &ClientStorage) -> Result<(), String>;
  fn update_profile(&self, storage: &ClientStorage, profile: &UserProfile) -> Result<(), String>;
}

/// Accepts any well-formed email with a non-empty password.
#[derive(Default)]
pub struct MockAuth;

fn validate(credentials: &Credentials) -> Result<(), String> {
  let email = credentials.email.trim();
  let well_formed = email
    .split_once('@')
    .map(|(user, domain)| !user.is_empty() && domain.contains('.'))
    .unwrap_or(false);
  if !well_formed {
    return Err("Introduce un correo electrónico válido".into());
  }
  if credentials.password.is_empty() {
    return Err("La contraseña no puede estar vacía".into());
  }
  Ok(())
}

fn display_name(credentials: &Credentials) -> String {
  credentials
    .name
    .as_deref()
    .map(str::trim)
    .filter(|n| !n.is_empty())
    .map(str::to_string)
    .unwrap_or_else(|| credentials.email.trim().split('@').next().unwrap_or_default().to_string())
}

impl AuthProvider for MockAuth {
  fn current_user(&self, storage: &ClientStorage) -> Option<UserProfile> {
    storage.load::<UserProfile>(USER_SESSION_KEY)
  }

  fn sign_in(&self, storage: &ClientStorage, credentials: &Credentials) -> Result<UserProfile, String> {
    validate(credentials)?;
    // Signing in again with the same email keeps accumulated progress.
    let email = credentials.email.trim();
    let profile = match self.current_user(storage) {
      Some(p) if p.email.eq_ignore_ascii_case(email) => p,
      _ => default_profile(&display_name(credentials), email),
    };
    storage.save(USER_SESSION_KEY, &profile)?;
    info!(target: "vocab_backend", client = %storage.client_id(), user = %profile.id, "Mock sign-in");
    Ok(profile)
  }

  fn sign_out(&self, storage: &ClientStorage) -> Result<(), String> {
    storage.remove(USER_SESSION_KEY)?;
    info!(target: "vocab_backend", client = %storage.client_id(), "Mock sign-out");
    Ok(())
  }

  fn update_profile(&self, storage: &ClientStorage, profile: &UserProfile) -> Result<(), String> {
    storage.save(USER_SESSION_KEY, profile)
  }
}
