// src/config.rs
use crate::errors::TryOnError;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Model listings name models as `models/<id>`; request URLs want the bare id.
pub fn bare_model_name(model: &str) -> &str {
    let model = model.trim();
    model.strip_prefix("models/").unwrap_or(model)
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub bind_addr: String,
    pub max_retries: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, TryOnError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, TryOnError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = non_empty("GEMINI_API_KEY").ok_or_else(|| {
            TryOnError::Configuration(
                "GEMINI_API_KEY is not set. Get a key from https://aistudio.google.com/app/apikey"
                    .to_string(),
            )
        })?;

        let max_retries = match non_empty("TRYON_MAX_RETRIES") {
            Some(raw) => {
                let parsed = raw.trim().parse::<usize>().map_err(|e| {
                    TryOnError::Configuration(format!("TRYON_MAX_RETRIES={}: {}", raw, e))
                })?;
                if parsed == 0 {
                    return Err(TryOnError::Configuration(
                        "TRYON_MAX_RETRIES must be at least 1".to_string(),
                    ));
                }
                parsed
            }
            None => DEFAULT_MAX_RETRIES,
        };

        Ok(Self {
            api_key,
            model: non_empty("GEMINI_MODEL")
                .map(|model| bare_model_name(&model).to_string())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base: non_empty("GEMINI_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            bind_addr: non_empty("TRYON_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            max_retries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, TryOnError::Configuration(_)));

        let err = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "   ")])).unwrap_err();
        assert!(matches!(err, TryOnError::Configuration(_)));
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "secret")])).unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn overrides_are_read() {
        let config = Config::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-test"),
            ("GEMINI_API_BASE", "http://localhost:9000/v1beta/"),
            ("TRYON_BIND_ADDR", "127.0.0.1:3000"),
            ("TRYON_MAX_RETRIES", "5"),
        ]))
        .unwrap();
        assert_eq!(config.model, "gemini-test");
        assert_eq!(config.api_base, "http://localhost:9000/v1beta");
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn listed_model_name_is_accepted() {
        let config = Config::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "models/gemini-2.5-flash"),
        ]))
        .unwrap();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(bare_model_name(" gemini-x "), "gemini-x");
    }

    #[test]
    fn bad_retry_count_is_rejected() {
        for raw in ["zero", "0", "-1"] {
            let err = Config::from_lookup(lookup(&[
                ("GEMINI_API_KEY", "secret"),
                ("TRYON_MAX_RETRIES", raw),
            ]))
            .unwrap_err();
            assert!(matches!(err, TryOnError::Configuration(_)), "{raw}");
        }
    }
}
