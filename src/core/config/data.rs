use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted user preferences.
///
/// Only non-secret settings live here; credentials and capability state
/// go through the settings store. A missing file means defaults.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Model requested instead of the built-in default.
    pub default_model: Option<String>,
    /// Chat-completion endpoint base URL override.
    pub base_url: Option<String>,
}

impl Config {
    pub fn set_default_model(&mut self, model: impl Into<String>) {
        self.default_model = Some(model.into());
    }
}

/// Get a user-friendly display string for a path, using ~ notation on
/// Unix-like systems when possible.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
