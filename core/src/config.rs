//! Backend endpoint configuration.
//!
//! Resolution order for each value: environment variable, then the optional
//! `supabase.toml` file in the working directory, then the built-in default
//! (URL only — there is no default key). Blank values fall through to the
//! next source. An empty resolved key means the client is unconfigured and
//! auth operations must be refused.

use std::env;
use std::path::Path;

use serde::Deserialize;

/// Project URL used when neither the environment nor the file names one.
pub const DEFAULT_URL: &str = "https://dqndvgmklfnwtvrwgioa.supabase.co";

const CONFIG_FILE: &str = "supabase.toml";

const ENV_URL: &str = "SUPABASE_URL";
const ENV_PUBLISHABLE_KEY: &str = "SUPABASE_PUBLISHABLE_KEY";
const ENV_ANON_KEY: &str = "SUPABASE_ANON_KEY";

/// Optional keys of the `supabase.toml` file.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    url: Option<String>,
    publishable_key: Option<String>,
    anon_key: Option<String>,
}

impl FileConfig {
    /// An absent or unreadable file is simply an empty source.
    fn load(path: &Path) -> Self {
        let Ok(text) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str(&text) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), "ignoring malformed config file: {err}");
                Self::default()
            }
        }
    }
}

/// Resolved backend endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub api_key: String,
}

impl Config {
    /// Resolve from the process environment and `supabase.toml`.
    pub fn resolve() -> Self {
        Self::from_sources(
            env::var(ENV_URL).ok(),
            env::var(ENV_PUBLISHABLE_KEY).ok(),
            env::var(ENV_ANON_KEY).ok(),
            FileConfig::load(Path::new(CONFIG_FILE)),
        )
    }

    fn from_sources(
        env_url: Option<String>,
        env_publishable: Option<String>,
        env_anon: Option<String>,
        file: FileConfig,
    ) -> Self {
        let base_url = pick(&[env_url, file.url]).unwrap_or_else(|| DEFAULT_URL.to_string());
        let api_key = pick(&[env_publishable, env_anon, file.publishable_key, file.anon_key])
            .unwrap_or_default();
        Self { base_url, api_key }
    }

    /// False when no API key could be resolved; auth operations must then be
    /// refused by the caller.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// First candidate that is non-blank after trimming.
fn pick(candidates: &[Option<String>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_wins_over_file_and_default() {
        let config = Config::from_sources(
            Some("https://env.example".to_string()),
            Some("env-key".to_string()),
            None,
            FileConfig {
                url: Some("https://file.example".to_string()),
                publishable_key: Some("file-key".to_string()),
                anon_key: None,
            },
        );
        assert_eq!(config.base_url, "https://env.example");
        assert_eq!(config.api_key, "env-key");
    }

    #[test]
    fn blank_env_falls_through_to_file() {
        let config = Config::from_sources(
            Some("   ".to_string()),
            Some(String::new()),
            None,
            FileConfig {
                url: Some("https://file.example".to_string()),
                publishable_key: Some(" file-key ".to_string()),
                anon_key: None,
            },
        );
        assert_eq!(config.base_url, "https://file.example");
        assert_eq!(config.api_key, "file-key");
    }

    #[test]
    fn anon_key_is_the_second_choice_in_each_source() {
        let config = Config::from_sources(
            None,
            None,
            Some("env-anon".to_string()),
            FileConfig {
                url: None,
                publishable_key: Some("file-pub".to_string()),
                anon_key: None,
            },
        );
        assert_eq!(config.api_key, "env-anon");
    }

    #[test]
    fn defaults_apply_when_everything_is_absent() {
        let config = Config::from_sources(None, None, None, FileConfig::default());
        assert_eq!(config.base_url, DEFAULT_URL);
        assert_eq!(config.api_key, "");
        assert!(!config.is_configured());
    }

    #[test]
    fn file_config_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("supabase.toml");
        std::fs::write(&path, "url = [broken").unwrap();
        let file = FileConfig::load(&path);
        assert!(file.url.is_none());

        let absent = FileConfig::load(&dir.path().join("missing.toml"));
        assert!(absent.publishable_key.is_none());
    }

    #[test]
    fn file_config_reads_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("supabase.toml");
        std::fs::write(
            &path,
            "url = \"https://file.example\"\nanon_key = \"anon-1\"\n",
        )
        .unwrap();
        let file = FileConfig::load(&path);
        let config = Config::from_sources(None, None, None, file);
        assert_eq!(config.base_url, "https://file.example");
        assert_eq!(config.api_key, "anon-1");
        assert!(config.is_configured());
    }
}
