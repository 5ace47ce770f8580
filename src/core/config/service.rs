use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::Settings;
use super::validation::validate_config;
use crate::core::errors::ApiError;

const REDACTED: &str = "****";

const SECRET_KEY_MARKERS: [&str; 8] = [
    "api_key",
    "password",
    "secret",
    "_token",
    "token_",
    "credential",
    "private_key",
    "bearer",
];

/// Keys that look secret by marker but only carry counts.
const NON_SECRET_KEYS: [&str; 3] = ["max_tokens", "num_tokens", "token_count"];

/// Loads `config.yml` + `secrets.yaml`, merged, and writes them back split.
#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("DOCSEEK_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    fn config_write_path(&self) -> PathBuf {
        if let Ok(path) = env::var("DOCSEEK_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        self.paths.user_data_dir.join("config.yml")
    }

    pub fn load_config(&self) -> Value {
        let public_config = read_yaml_object(&self.config_path());
        let secrets_config = read_yaml_object(&self.paths.secrets_path);
        deep_merge(&public_config, &secrets_config)
    }

    pub fn settings(&self) -> Settings {
        Settings::from_value(&self.load_config())
    }

    /// Merges `patch` into the stored config, validates, and persists it.
    ///
    /// Values still carrying the redaction placeholder keep their stored value.
    pub fn update_config(&self, patch: &Value) -> Result<Value, ApiError> {
        let current = self.load_config();
        let restored = restore_redacted(patch, &current);
        let merged = deep_merge(&current, &restored);

        validate_config(&merged)?;
        self.save(&merged)?;
        Ok(merged)
    }

    pub fn redacted(&self, value: &Value) -> Value {
        redact(value)
    }

    fn save(&self, config: &Value) -> Result<(), ApiError> {
        let (public_config, secret_config) = split_secrets(config);
        write_yaml(&self.config_write_path(), &public_config)?;
        write_yaml(&self.paths.secrets_path, &secret_config)?;
        tracing::info!(path = %self.config_write_path().display(), "Configuration saved");
        Ok(())
    }
}

fn read_yaml_object(path: &Path) -> Value {
    let Ok(contents) = fs::read_to_string(path) else {
        return Value::Object(Map::new());
    };

    match serde_yaml::from_str::<Value>(&contents) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) => Value::Object(Map::new()),
        Err(err) => {
            tracing::warn!("Ignoring unreadable config {}: {}", path.display(), err);
            Value::Object(Map::new())
        }
    }
}

fn write_yaml(path: &Path, value: &Value) -> Result<(), ApiError> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let yaml = serde_yaml::to_string(value).map_err(ApiError::internal)?;
    fs::write(path, yaml).map_err(ApiError::internal)
}

fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in overlay_map {
                let next = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        _ => overlay.clone(),
    }
}

fn split_secrets(config: &Value) -> (Value, Value) {
    let Value::Object(map) = config else {
        return (config.clone(), Value::Object(Map::new()));
    };

    let mut public_map = Map::new();
    let mut secret_map = Map::new();

    for (key, value) in map {
        if value.is_object() {
            let (public_sub, secret_sub) = split_secrets(value);
            if !is_empty_object(&public_sub) {
                public_map.insert(key.clone(), public_sub);
            }
            if !is_empty_object(&secret_sub) {
                secret_map.insert(key.clone(), secret_sub);
            }
        } else if is_secret_key(key) && !value.is_null() {
            secret_map.insert(key.clone(), value.clone());
        } else {
            public_map.insert(key.clone(), value.clone());
        }
    }

    (Value::Object(public_map), Value::Object(secret_map))
}

fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, val)| {
                    let shown = if is_secret_key(key) && !val.is_null() {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact(val)
                    };
                    (key.clone(), shown)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        _ => value.clone(),
    }
}

fn restore_redacted(incoming: &Value, stored: &Value) -> Value {
    let Value::Object(map) = incoming else {
        return incoming.clone();
    };

    let mut restored = Map::new();
    for (key, value) in map {
        let previous = stored.get(key);
        if value.as_str() == Some(REDACTED) {
            if let Some(previous) = previous {
                restored.insert(key.clone(), previous.clone());
            }
            continue;
        }
        let next = if value.is_object() {
            restore_redacted(value, previous.unwrap_or(&Value::Null))
        } else {
            value.clone()
        };
        restored.insert(key.clone(), next);
    }
    Value::Object(restored)
}

fn is_secret_key(key: &str) -> bool {
    let key = key.to_lowercase();
    if NON_SECRET_KEYS.contains(&key.as_str()) {
        return false;
    }
    SECRET_KEY_MARKERS.iter().any(|marker| key.contains(marker))
}

fn is_empty_object(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service_in(dir: &Path) -> ConfigService {
        ConfigService::new(Arc::new(AppPaths::from_data_dir(dir)))
    }

    #[test]
    fn deep_merge_overrides_scalars_and_keeps_siblings() {
        let base = json!({ "llm": { "chat_model": "a", "temperature": 0.1 }, "search": { "top_k": 10 } });
        let overlay = json!({ "llm": { "chat_model": "b" } });

        assert_eq!(
            deep_merge(&base, &overlay),
            json!({ "llm": { "chat_model": "b", "temperature": 0.1 }, "search": { "top_k": 10 } })
        );
    }

    #[test]
    fn split_secrets_moves_api_key_out() {
        let (public_config, secret_config) = split_secrets(&json!({
            "llm": { "api_key": "sk-1", "max_tokens": 256, "base_url": "http://x" }
        }));

        assert_eq!(
            public_config,
            json!({ "llm": { "max_tokens": 256, "base_url": "http://x" } })
        );
        assert_eq!(secret_config, json!({ "llm": { "api_key": "sk-1" } }));
    }

    #[test]
    fn redact_masks_only_secret_values() {
        let redacted = redact(&json!({ "llm": { "api_key": "sk-1", "chat_model": "m" } }));
        assert_eq!(redacted, json!({ "llm": { "api_key": "****", "chat_model": "m" } }));
    }

    #[test]
    fn update_round_trips_through_split_files() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path());

        service
            .update_config(&json!({ "llm": { "api_key": "sk-1", "chat_model": "m1" } }))
            .unwrap();
        // Placeholder from a redacted view must not clobber the stored key.
        service
            .update_config(&json!({ "llm": { "api_key": "****", "chat_model": "m2" } }))
            .unwrap();

        let loaded = service.load_config();
        assert_eq!(loaded["llm"]["api_key"], "sk-1");
        assert_eq!(loaded["llm"]["chat_model"], "m2");

        let public_text = fs::read_to_string(tmp.path().join("config.yml")).unwrap();
        assert!(!public_text.contains("sk-1"));
    }

    #[test]
    fn update_rejects_invalid_values() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path());

        let err = service
            .update_config(&json!({ "search": { "top_k": 0 } }))
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
