//! Theme preference. The theme is explicit state handed to page models; the
//! store it persists into is injected by the caller.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::storage::{ClientStorage, THEME_KEY};

/// Document attribute the frontend sets to the theme name.
pub const THEME_ATTRIBUTE: &str = "data-theme";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
  #[default]
  Light,
  Dark,
  Ocean,
  Forest,
}

impl Theme {
  pub const ALL: [Theme; 4] = [Theme::Light, Theme::Dark, Theme::Ocean, Theme::Forest];

  pub fn name(self) -> &'static str {
    match self {
      Theme::Light => "light",
      Theme::Dark => "dark",
      Theme::Ocean => "ocean",
      Theme::Forest => "forest",
    }
  }

  pub fn parse(name: &str) -> Option<Theme> {
    let wanted = name.trim().to_ascii_lowercase();
    Theme::ALL.into_iter().find(|t| t.name() == wanted)
  }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ThemeState {
  pub theme: Theme,
  pub attribute: &'static str,
  pub available: Vec<&'static str>,
}

impl From<Theme> for ThemeState {
  fn from(theme: Theme) -> Self {
    Self {
      theme,
      attribute: THEME_ATTRIBUTE,
      available: Theme::ALL.iter().map(|t| t.name()).collect(),
    }
  }
}

pub struct ThemeProvider<'a> {
  storage: &'a ClientStorage,
}

impl<'a> ThemeProvider<'a> {
  pub fn new(storage: &'a ClientStorage) -> Self {
    Self { storage }
  }

  pub fn current(&self) -> Theme {
    self.storage.load::<Theme>(THEME_KEY).unwrap_or_default()
  }

  pub fn set(&self, theme: Theme) -> Result<Theme, String> {
    self.storage.save(THEME_KEY, &theme)?;
    debug!(target: "vocab_backend", client = %self.storage.client_id(), theme = theme.name(), "Theme saved");
    Ok(theme)
  }
}
