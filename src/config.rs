//! Server settings

use std::path::PathBuf;

use serde::Deserialize;

/// Environment variable naming a provider catalog when the client sends none
pub const PROVIDER_CATALOG_ENV: &str = "BLUEPRINT_LSP_PROVIDER_CATALOG";

/// Settings sent by the client as `initializationOptions`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Path to a JSON provider catalog
    pub provider_catalog: Option<PathBuf>,
    /// Whether hover is offered
    pub hover: bool,
    /// Upper bound on the number of completion items per response
    pub max_completion_items: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider_catalog: None,
            hover: true,
            max_completion_items: 100,
        }
    }
}

impl Settings {
    /// Read settings from the client's initialization options, falling back
    /// to defaults for anything missing or malformed
    pub fn from_initialization_options(options: Option<serde_json::Value>) -> Self {
        let mut settings = match options {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|err| {
                tracing::warn!("Ignoring invalid initialization options: {}", err);
                Settings::default()
            }),
            None => Settings::default(),
        };
        if settings.provider_catalog.is_none() {
            settings.provider_catalog = std::env::var_os(PROVIDER_CATALOG_ENV).map(PathBuf::from);
        }
        settings
    }
}
