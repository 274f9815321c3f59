use std::env;
use std::path::PathBuf;

use tracing::debug;

use crate::gateway::Lang;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-3.0-generate-002";
pub const DEFAULT_HISTORY_LIMIT: usize = 10;
const APP_DIR: &str = "scholar";

#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SCHOLAR_HISTORY_LIMIT must be a positive integer, got '{0}'")]
    InvalidHistoryLimit(String),

    #[error("SCHOLAR_LANG must be 'pt' or 'en', got '{0}'")]
    InvalidLang(String),

    #[error("no platform data directory found; set SCHOLAR_DATA_DIR or pass --data-dir")]
    NoDataDir,
}

/// Values supplied on the command line. They win over the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub lang: Option<Lang>,
    pub history_limit: Option<usize>,
}

/// Runtime configuration.
///
/// Environment variables:
/// - `GEMINI_API_KEY`: required by `search` and `article`
/// - `GEMINI_MODEL` / `GEMINI_IMAGE_MODEL`: model overrides
/// - `SCHOLAR_DATA_DIR`: where `history.json` lives
/// - `SCHOLAR_HISTORY_LIMIT`: number of sessions kept (default 10)
/// - `SCHOLAR_LANG`: `pt` (default) or `en`
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<ApiKey>,
    pub model: String,
    pub image_model: String,
    pub data_dir: PathBuf,
    pub history_limit: usize,
    pub lang: Lang,
}

impl Config {
    pub fn load(overrides: Overrides) -> Result<Self, ConfigError> {
        Self::from_lookup(overrides, |key| env::var(key).ok(), dirs::data_dir())
    }

    fn from_lookup(
        overrides: Overrides,
        lookup: impl Fn(&str) -> Option<String>,
        platform_data_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let history_limit = match overrides.history_limit {
            Some(limit) => limit,
            None => match var("SCHOLAR_HISTORY_LIMIT") {
                Some(raw) => raw
                    .parse::<usize>()
                    .map_err(|_| ConfigError::InvalidHistoryLimit(raw.clone()))?,
                None => DEFAULT_HISTORY_LIMIT,
            },
        };
        if history_limit == 0 {
            return Err(ConfigError::InvalidHistoryLimit("0".to_string()));
        }

        let lang = match overrides.lang {
            Some(lang) => lang,
            None => match var("SCHOLAR_LANG") {
                Some(raw) => Lang::parse(&raw).ok_or(ConfigError::InvalidLang(raw))?,
                None => Lang::default(),
            },
        };

        let data_dir = overrides
            .data_dir
            .or_else(|| var("SCHOLAR_DATA_DIR").map(PathBuf::from))
            .or_else(|| platform_data_dir.map(|d| d.join(APP_DIR)))
            .ok_or(ConfigError::NoDataDir)?;

        let config = Self {
            api_key: var("GEMINI_API_KEY").map(ApiKey),
            model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            image_model: var("GEMINI_IMAGE_MODEL")
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            data_dir,
            history_limit,
            lang,
        };
        debug!(?config, "configuration loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)], overrides: Overrides) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(
            overrides,
            |key| map.get(key).cloned(),
            Some(PathBuf::from("/data")),
        )
    }

    #[test]
    fn defaults_without_environment() {
        let config = load(&[], Overrides::default()).unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.data_dir, PathBuf::from("/data/scholar"));
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
        assert_eq!(config.lang, Lang::Pt);
    }

    #[test]
    fn reads_environment() {
        let config = load(
            &[
                ("GEMINI_API_KEY", " secret "),
                ("GEMINI_MODEL", "gemini-2.5-pro"),
                ("SCHOLAR_DATA_DIR", "/tmp/scholar"),
                ("SCHOLAR_HISTORY_LIMIT", "25"),
                ("SCHOLAR_LANG", "EN"),
            ],
            Overrides::default(),
        )
        .unwrap();
        assert_eq!(config.api_key.as_ref().map(ApiKey::expose), Some("secret"));
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/scholar"));
        assert_eq!(config.history_limit, 25);
        assert_eq!(config.lang, Lang::En);
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = load(&[("GEMINI_API_KEY", "   ")], Overrides::default()).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn overrides_win_over_environment() {
        let overrides = Overrides {
            data_dir: Some(PathBuf::from("/override")),
            lang: Some(Lang::Pt),
            history_limit: Some(3),
        };
        let config = load(
            &[
                ("SCHOLAR_DATA_DIR", "/env"),
                ("SCHOLAR_LANG", "en"),
                ("SCHOLAR_HISTORY_LIMIT", "50"),
            ],
            overrides,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/override"));
        assert_eq!(config.lang, Lang::Pt);
        assert_eq!(config.history_limit, 3);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            load(&[("SCHOLAR_HISTORY_LIMIT", "many")], Overrides::default()),
            Err(ConfigError::InvalidHistoryLimit(_))
        ));
        assert!(matches!(
            load(&[("SCHOLAR_HISTORY_LIMIT", "0")], Overrides::default()),
            Err(ConfigError::InvalidHistoryLimit(_))
        ));
        assert!(matches!(
            load(&[("SCHOLAR_LANG", "fr")], Overrides::default()),
            Err(ConfigError::InvalidLang(_))
        ));
    }

    #[test]
    fn missing_data_dir_is_an_error() {
        let result = Config::from_lookup(Overrides::default(), |_| None, None);
        assert!(matches!(result, Err(ConfigError::NoDataDir)));
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("super-secret");
        assert_eq!(format!("{key:?}"), "[REDACTED]");
    }
}
