//! Runtime environment detection: build mode, browser presence and config sources.

use std::env;
use std::fmt;
#[cfg(not(target_arch = "wasm32"))]
use std::fs;
use std::str::FromStr;

use serde_json::Value;

/// Environment variable overriding the build mode (`development` or `production`).
pub const APP_MODE_ENV: &str = "APP_MODE";

/// Whether the application runs as a local development build or a deployed one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuildMode {
    Development,
    Production,
}

impl BuildMode {
    /// Resolves the mode from `APP_MODE`, falling back to the compilation profile.
    pub fn from_env() -> Self {
        env::var(APP_MODE_ENV)
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_else(Self::from_profile)
    }

    pub fn from_profile() -> Self {
        if cfg!(debug_assertions) {
            BuildMode::Development
        } else {
            BuildMode::Production
        }
    }

    pub fn is_development(self) -> bool {
        self == BuildMode::Development
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildMode::Development => "development",
            BuildMode::Production => "production",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(BuildMode::Development),
            "prod" | "production" => Ok(BuildMode::Production),
            other => Err(format!("unknown build mode '{other}'")),
        }
    }
}

/// Returns `true` when running inside a browser window.
pub fn is_browser() -> bool {
    #[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
    {
        use wasm_bindgen::JsCast;
        js_sys::global().dyn_into::<web_sys::Window>().is_ok()
    }

    #[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
    {
        false
    }
}

/// Returns `true` when the browser reports cookies as enabled.
pub fn are_cookies_enabled() -> bool {
    #[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
    {
        web_sys::window()
            .map(|window| window.navigator().cookie_enabled())
            .unwrap_or(false)
    }

    #[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
    {
        false
    }
}

/// Returns `true` when the variable is set to anything other than an empty string,
/// `0` or `false`.
pub fn env_flag(name: &str) -> bool {
    match env::var(name) {
        Ok(raw) => {
            let value = raw.trim().to_ascii_lowercase();
            !(value.is_empty() || value == "0" || value == "false")
        }
        Err(_) => false,
    }
}

/// Parses a configuration source given either as inline JSON or as a path to a JSON file.
/// Only JSON objects are accepted.
pub fn parse_config_source(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(json) = serde_json::from_str::<Value>(trimmed) {
        return json.is_object().then_some(json);
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let contents = fs::read_to_string(trimmed).ok()?;
        let json = serde_json::from_str::<Value>(&contents).ok()?;
        json.is_object().then_some(json)
    }

    #[cfg(target_arch = "wasm32")]
    {
        None
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn parses_build_mode_aliases() {
        assert_eq!("dev".parse::<BuildMode>().unwrap(), BuildMode::Development);
        assert_eq!(
            " Production ".parse::<BuildMode>().unwrap(),
            BuildMode::Production
        );
        assert!("staging".parse::<BuildMode>().is_err());
    }

    #[test]
    fn profile_mode_matches_debug_assertions() {
        assert_eq!(
            BuildMode::from_profile().is_development(),
            cfg!(debug_assertions)
        );
    }

    #[test]
    fn parse_config_source_accepts_files_and_json() {
        let json = parse_config_source("{\"dev\":{\"apiKey\":\"foo\"}}").unwrap();
        assert_eq!(json["dev"]["apiKey"], "foo");

        let mut path = std::env::temp_dir();
        path.push(format!(
            "app_shell_env_test_{}.json",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        fs::write(&path, "{\"prod\":{\"projectId\":\"demo\"}}").unwrap();
        let file_json = parse_config_source(&path.to_string_lossy()).unwrap();
        assert_eq!(file_json["prod"]["projectId"], "demo");
        let _ = fs::remove_file(path);

        assert!(parse_config_source("[1, 2]").is_none());
        assert!(parse_config_source("/definitely/not/here.json").is_none());
    }

    #[test]
    fn env_flag_treats_false_values_as_unset() {
        let name = "APP_SHELL_TEST_FLAG_VALUES";
        std::env::set_var(name, "false");
        assert!(!env_flag(name));
        std::env::set_var(name, "1");
        assert!(env_flag(name));
        std::env::remove_var(name);
        assert!(!env_flag(name));
    }
}
