use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use carlot_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields: &[(&str, String, Option<&str>)] = &[
        ("database.url", config.database.url.clone(), Some("CARLOT_DATABASE_URL")),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            Some("CARLOT_DATABASE_MAX_CONNECTIONS"),
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            Some("CARLOT_DATABASE_TIMEOUT_SECS"),
        ),
        ("llm.base_url", config.llm.base_url.clone(), Some("CARLOT_LLM_BASE_URL")),
        ("llm.model", config.llm.model.clone(), Some("CARLOT_LLM_MODEL")),
        ("llm.temperature", config.llm.temperature.to_string(), Some("CARLOT_LLM_TEMPERATURE")),
        (
            "llm.repeat_penalty",
            config.llm.repeat_penalty.to_string(),
            Some("CARLOT_LLM_REPEAT_PENALTY"),
        ),
        ("llm.timeout_secs", config.llm.timeout_secs.to_string(), Some("CARLOT_LLM_TIMEOUT_SECS")),
        (
            "llm.api_key",
            if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" }.to_string(),
            Some("CARLOT_LLM_API_KEY"),
        ),
        ("logging.level", config.logging.level.clone(), Some("CARLOT_LOG_LEVEL")),
        ("logging.format", format!("{:?}", config.logging.format), Some("CARLOT_LOG_FORMAT")),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in fields {
        lines.push(render_line(
            key,
            value,
            field_source(key, *env_key, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("carlot.toml"), PathBuf::from("config/carlot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::contains_path;

    #[test]
    fn contains_path_walks_nested_tables() {
        let doc: toml::Value =
            "[llm]\nmodel = \"mistral\"\n".parse().expect("parse toml");

        assert!(contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "llm.base_url"));
        assert!(!contains_path(&doc, "database.url"));
    }
}
