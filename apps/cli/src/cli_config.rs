use std::env;
use std::path::PathBuf;
use std::time::Duration;

use seva_core::{AppError, AppResult};
use tracing_subscriber::EnvFilter;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_SESSION_FILE: &str = ".seva-session.json";

#[derive(Debug, Clone)]
pub struct FormClientConfig {
    pub api_url: Url,
    pub http_timeout: Duration,
    pub session_file: PathBuf,
}

impl FormClientConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let raw_api_url = lookup("SEVA_API_URL")
            .map(|value| value.trim().trim_end_matches('/').to_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::Validation("SEVA_API_URL is required".to_owned()))?;
        let api_url = Url::parse(&raw_api_url).map_err(|error| {
            AppError::Validation(format!("invalid SEVA_API_URL value '{raw_api_url}': {error}"))
        })?;

        let timeout_secs = match lookup("SEVA_HTTP_TIMEOUT_SECS") {
            Some(value) => value.trim().parse::<u64>().map_err(|error| {
                AppError::Validation(format!(
                    "invalid SEVA_HTTP_TIMEOUT_SECS value '{value}': {error}"
                ))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(AppError::Validation(
                "SEVA_HTTP_TIMEOUT_SECS must be greater than zero".to_owned(),
            ));
        }

        let session_file = lookup("SEVA_SESSION_FILE")
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_FILE.to_owned());

        Ok(Self {
            api_url,
            http_timeout: Duration::from_secs(timeout_secs),
            session_file: PathBuf::from(session_file),
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use seva_core::AppError;

    use super::FormClientConfig;

    fn load(pairs: &[(&str, &str)]) -> Result<FormClientConfig, AppError> {
        let values = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect::<HashMap<_, _>>();
        FormClientConfig::from_lookup(|name| values.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_api_url_is_set() {
        let Ok(config) = load(&[("SEVA_API_URL", "https://seva.example/api/")]) else {
            panic!("config should load");
        };

        assert_eq!(config.api_url.as_str(), "https://seva.example/api");
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert_eq!(config.session_file.to_str(), Some(".seva-session.json"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(load(&[]), Err(AppError::Validation(_))));
        assert!(matches!(
            load(&[("SEVA_API_URL", "not a url")]),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            load(&[
                ("SEVA_API_URL", "https://seva.example"),
                ("SEVA_HTTP_TIMEOUT_SECS", "0")
            ]),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            load(&[
                ("SEVA_API_URL", "https://seva.example"),
                ("SEVA_HTTP_TIMEOUT_SECS", "soon")
            ]),
            Err(AppError::Validation(_))
        ));
    }
}
