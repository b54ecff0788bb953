use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Settings for the Ollama text-completion endpoint.
#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub repeat_penalty: f64,
    pub timeout_secs: u64,
    pub api_key: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://carlot.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                base_url: "http://localhost:11434".to_string(),
                model: "llama3.1".to_string(),
                temperature: 0.7,
                repeat_penalty: 1.1,
                timeout_secs: 120,
                api_key: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Load precedence: defaults, then optional `carlot.toml`, then
    /// `CARLOT_*` environment, then programmatic overrides.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("carlot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(repeat_penalty) = llm.repeat_penalty {
                self.llm.repeat_penalty = repeat_penalty;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(api_key_value) = llm.api_key {
                self.llm.api_key = Some(api_key_value.into());
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CARLOT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CARLOT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("CARLOT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CARLOT_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("CARLOT_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CARLOT_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("CARLOT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("CARLOT_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f64("CARLOT_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("CARLOT_LLM_REPEAT_PENALTY") {
            self.llm.repeat_penalty = parse_f64("CARLOT_LLM_REPEAT_PENALTY", &value)?;
        }
        if let Some(value) = read_env("CARLOT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("CARLOT_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CARLOT_LLM_API_KEY") {
            self.llm.api_key = Some(value.into());
        }

        if let Some(value) = read_env("CARLOT_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("CARLOT_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("llm.base_url must not be empty".to_string()));
        }
        if !self.llm.base_url.starts_with("http://") && !self.llm.base_url.starts_with("https://")
        {
            return Err(ConfigError::Validation(format!(
                "llm.base_url must be an http(s) URL, got `{}`",
                self.llm.base_url
            )));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "llm.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("carlot.toml"), PathBuf::from("config/carlot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f64>,
    repeat_penalty: Option<f64>,
    timeout_secs: Option<u64>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::io::Write;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    // The environment is process-global; every test that calls `load`
    // serializes on this lock.
    fn env_guard() -> MutexGuard<'static, ()> {
        ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.model, "llama3.1");
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn file_patch_overrides_defaults() {
        let _guard = env_guard();

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[database]\nurl = \"sqlite::memory:\"\n\n[llm]\nmodel = \"mistral\"\ntimeout_secs = 15\n\n[logging]\nformat = \"json\"\n"
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect("load config");

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.llm.model, "mistral");
        assert_eq!(config.llm.timeout_secs, 15);
        assert_eq!(config.logging.format, LogFormat::Json);
        // untouched sections keep defaults
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn programmatic_overrides_win_over_file() {
        let _guard = env_guard();

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[database]\nurl = \"sqlite://from-file.db\"\n").expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides {
                database_url: Some("sqlite://from-override.db".to_string()),
                ..ConfigOverrides::default()
            },
        })
        .expect("load config");

        assert_eq!(config.database.url, "sqlite://from-override.db");
    }

    #[test]
    fn env_override_wins_over_file_value() -> Result<(), String> {
        let _guard = env_guard();

        env::set_var("CARLOT_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("CARLOT_DATABASE_MAX_CONNECTIONS", "9");

        let result = (|| -> Result<(), String> {
            let mut file = tempfile::NamedTempFile::new().map_err(|err| err.to_string())?;
            writeln!(file, "[database]\nurl = \"sqlite://from-file.db\"\nmax_connections = 3\n")
                .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(file.path().to_path_buf()),
                require_file: true,
                overrides: ConfigOverrides::default(),
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-env.db",
                "env database url should win over the file value",
            )?;
            ensure(
                config.database.max_connections == 9,
                "env max_connections should win over the file value",
            )?;
            Ok(())
        })();

        clear_vars(&["CARLOT_DATABASE_URL", "CARLOT_DATABASE_MAX_CONNECTIONS"]);
        result
    }

    #[test]
    fn non_numeric_env_max_connections_is_rejected() -> Result<(), String> {
        let _guard = env_guard();

        env::set_var("CARLOT_DATABASE_MAX_CONNECTIONS", "many");

        let result = (|| -> Result<(), String> {
            match AppConfig::load(LoadOptions::default()) {
                Err(ConfigError::InvalidEnvOverride { key, value }) => {
                    ensure(
                        key == "CARLOT_DATABASE_MAX_CONNECTIONS",
                        "error should name the offending variable",
                    )?;
                    ensure(value == "many", "error should echo the rejected value")?;
                    Ok(())
                }
                Ok(_) => Err("non-numeric max_connections should not load".to_string()),
                Err(other) => Err(format!("unexpected error: {other}")),
            }
        })();

        clear_vars(&["CARLOT_DATABASE_MAX_CONNECTIONS"]);
        result
    }

    #[test]
    fn missing_required_file_is_reported() {
        let _guard = env_guard();

        let result = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });

        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn validation_rejects_non_http_llm_base_url() {
        let mut config = AppConfig::default();
        config.llm.base_url = "localhost:11434".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().expect("parse"), LogFormat::Json);
        assert!("fancy".parse::<LogFormat>().is_err());
    }
}
