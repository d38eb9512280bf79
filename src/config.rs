//! Startup configuration: environment first, optional JSON file underneath.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::app::DEFAULT_SYSTEM_PROMPT;
use crate::client::{GenerationSettings, DEFAULT_MODEL};
use crate::flow::AdmissionPolicy;
use crate::providers::ProviderKind;

pub const PROVIDER_ENV_VAR: &str = "CODE_ASSISTANT_PROVIDER";
pub const ENDPOINT_ENV_VAR: &str = "CODE_ASSISTANT_ENDPOINT";
pub const API_KEY_ENV_VAR: &str = "CODE_ASSISTANT_API_KEY";
pub const MODEL_ENV_VAR: &str = "CODE_ASSISTANT_MODEL";
pub const SYSTEM_PROMPT_ENV_VAR: &str = "CODE_ASSISTANT_SYSTEM_PROMPT";
pub const ADMISSION_ENV_VAR: &str = "CODE_ASSISTANT_ADMISSION";
pub const CONFIG_PATH_ENV_VAR: &str = "CODE_ASSISTANT_CONFIG_PATH";
pub const LOG_ENV_VAR: &str = "CODE_ASSISTANT_LOG";
pub const LOG_FILE_ENV_VAR: &str = "CODE_ASSISTANT_LOG_FILE";

/// Local relay; the client holds no credential by default.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8787/v1/chat/completions";
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported provider '{0}'. Available providers: http, mock")]
    UnsupportedProvider(String),

    #[error("unsupported admission policy '{0}'. Expected serialized or independent")]
    UnsupportedAdmission(String),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Clone, PartialEq)]
pub struct AssistantConfig {
    pub provider: ProviderKind,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub system_prompt: String,
    pub admission: AdmissionPolicy,
    pub timeout: Option<Duration>,
    pub chat: GenerationSettings,
    pub image: GenerationSettings,
    pub log_filter: String,
    pub log_file: Option<PathBuf>,
}

impl std::fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("provider", &self.provider)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .field("admission", &self.admission)
            .field("timeout", &self.timeout)
            .field("chat", &self.chat)
            .field("image", &self.image)
            .field("log_filter", &self.log_filter)
            .field("log_file", &self.log_file)
            .finish()
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            admission: AdmissionPolicy::default(),
            timeout: None,
            chat: GenerationSettings::CHAT,
            image: GenerationSettings::IMAGE,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_file: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    endpoint: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    system_prompt: Option<String>,
    admission: Option<String>,
    timeout_sec: Option<u64>,
    chat: Option<FileGenerationSettings>,
    image: Option<FileGenerationSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileGenerationSettings {
    temperature: Option<f64>,
    max_tokens: Option<u32>,
}

impl AssistantConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration from `lookup`, reading the JSON file it names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| sanitize(lookup(key));
        let mut config = Self::default();

        if let Some(path) = var(CONFIG_PATH_ENV_VAR) {
            config.apply_file(&load_file(Path::new(&path))?)?;
        }

        if let Some(provider) = var(PROVIDER_ENV_VAR) {
            config.provider = ProviderKind::parse(&provider)
                .ok_or(ConfigError::UnsupportedProvider(provider))?;
        }
        if let Some(endpoint) = var(ENDPOINT_ENV_VAR) {
            config.endpoint = endpoint;
        }
        if let Some(api_key) = var(API_KEY_ENV_VAR) {
            config.api_key = Some(api_key);
        }
        if let Some(model) = var(MODEL_ENV_VAR) {
            config.model = model;
        }
        if let Some(system_prompt) = var(SYSTEM_PROMPT_ENV_VAR) {
            config.system_prompt = system_prompt;
        }
        if let Some(admission) = var(ADMISSION_ENV_VAR) {
            config.admission = parse_admission(admission)?;
        }
        if let Some(filter) = var(LOG_ENV_VAR) {
            config.log_filter = filter;
        }
        config.log_file = var(LOG_FILE_ENV_VAR).map(PathBuf::from);

        Ok(config)
    }

    fn apply_file(&mut self, file: &FileConfig) -> Result<(), ConfigError> {
        if let Some(endpoint) = sanitize(file.endpoint.clone()) {
            self.endpoint = endpoint;
        }
        if let Some(api_key) = sanitize(file.api_key.clone()) {
            self.api_key = Some(api_key);
        }
        if let Some(model) = sanitize(file.model.clone()) {
            self.model = model;
        }
        if let Some(system_prompt) = sanitize(file.system_prompt.clone()) {
            self.system_prompt = system_prompt;
        }
        if let Some(admission) = sanitize(file.admission.clone()) {
            self.admission = parse_admission(admission)?;
        }
        if let Some(timeout_sec) = file.timeout_sec {
            if timeout_sec == 0 {
                return Err(ConfigError::Invalid {
                    field: "timeout_sec",
                    reason: "must be > 0".to_string(),
                });
            }
            self.timeout = Some(Duration::from_secs(timeout_sec));
        }
        if let Some(chat) = &file.chat {
            self.chat = merge_settings("chat", self.chat, chat)?;
        }
        if let Some(image) = &file.image {
            self.image = merge_settings("image", self.image, image)?;
        }

        Ok(())
    }
}

fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn merge_settings(
    field: &'static str,
    base: GenerationSettings,
    overrides: &FileGenerationSettings,
) -> Result<GenerationSettings, ConfigError> {
    let temperature = overrides.temperature.unwrap_or(base.temperature);
    if !(0.0..=2.0).contains(&temperature) {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("temperature {temperature} is outside 0.0..=2.0"),
        });
    }

    let max_tokens = overrides.max_tokens.unwrap_or(base.max_tokens);
    if max_tokens == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "max_tokens must be > 0".to_string(),
        });
    }

    Ok(GenerationSettings {
        temperature,
        max_tokens,
    })
}

fn parse_admission(value: String) -> Result<AdmissionPolicy, ConfigError> {
    AdmissionPolicy::parse(&value).ok_or(ConfigError::UnsupportedAdmission(value))
}

fn sanitize(raw: Option<String>) -> Option<String> {
    raw.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp config");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn defaults_target_local_relay_without_credentials() {
        let config = AssistantConfig::from_lookup(lookup(&[])).expect("defaults");

        assert_eq!(config, AssistantConfig::default());
        assert_eq!(config.provider, ProviderKind::Http);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.api_key, None);
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = AssistantConfig::from_lookup(lookup(&[
            (SYSTEM_PROMPT_ENV_VAR, "   \n\t"),
            (MODEL_ENV_VAR, ""),
            (API_KEY_ENV_VAR, " "),
        ]))
        .expect("config");

        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn env_values_are_trimmed_and_applied() {
        let config = AssistantConfig::from_lookup(lookup(&[
            (PROVIDER_ENV_VAR, "mock"),
            (ADMISSION_ENV_VAR, "independent"),
            (SYSTEM_PROMPT_ENV_VAR, "  Be terse.  "),
            (LOG_FILE_ENV_VAR, "/tmp/assistant.log"),
        ]))
        .expect("config");

        assert_eq!(config.provider, ProviderKind::Mock);
        assert_eq!(config.admission, AdmissionPolicy::Independent);
        assert_eq!(config.system_prompt, "Be terse.");
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/assistant.log")));
    }

    #[test]
    fn unknown_provider_and_admission_are_rejected() {
        let provider = AssistantConfig::from_lookup(lookup(&[(PROVIDER_ENV_VAR, "gemini")]))
            .expect_err("unknown provider");
        assert!(provider.to_string().contains("unsupported provider 'gemini'"));

        let admission = AssistantConfig::from_lookup(lookup(&[(ADMISSION_ENV_VAR, "parallel")]))
            .expect_err("unknown admission");
        assert!(matches!(admission, ConfigError::UnsupportedAdmission(value) if value == "parallel"));
    }

    #[test]
    fn file_values_apply_and_env_overrides_them() {
        let file = config_file(
            r#"{
                "endpoint": "https://relay.internal/v1",
                "model": "file-model",
                "timeout_sec": 30,
                "chat": {"max_tokens": 2048},
                "image": {"temperature": 0.1}
            }"#,
        );
        let path = file.path().display().to_string();

        let config = AssistantConfig::from_lookup(lookup(&[
            (CONFIG_PATH_ENV_VAR, path.as_str()),
            (MODEL_ENV_VAR, "env-model"),
        ]))
        .expect("config");

        assert_eq!(config.endpoint, "https://relay.internal/v1");
        assert_eq!(config.model, "env-model");
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.chat.max_tokens, 2048);
        assert_eq!(config.chat.temperature, 0.5);
        assert_eq!(config.image.temperature, 0.1);
        assert_eq!(config.image.max_tokens, 1500);
    }

    #[test]
    fn file_rejects_unknown_fields() {
        let file = config_file(r#"{"endpoint": "x", "stream": true}"#);
        let path = file.path().display().to_string();

        let error = AssistantConfig::from_lookup(lookup(&[(CONFIG_PATH_ENV_VAR, path.as_str())]))
            .expect_err("unknown field");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn file_rejects_zero_timeout_and_tokens() {
        for contents in [r#"{"timeout_sec": 0}"#, r#"{"chat": {"max_tokens": 0}}"#] {
            let file = config_file(contents);
            let path = file.path().display().to_string();

            let error =
                AssistantConfig::from_lookup(lookup(&[(CONFIG_PATH_ENV_VAR, path.as_str())]))
                    .expect_err("invalid value");
            assert!(matches!(error, ConfigError::Invalid { .. }), "{contents}");
        }
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let error = AssistantConfig::from_lookup(lookup(&[(
            CONFIG_PATH_ENV_VAR,
            "/definitely/missing/config.json",
        )]))
        .expect_err("missing file");
        assert!(matches!(error, ConfigError::Read { .. }));
    }
}
