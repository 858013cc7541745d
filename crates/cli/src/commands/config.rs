use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use toml::Value;

use crate::commands::{load_config, CommandResult};

const COMMAND: &str = "config";

struct Field<'a> {
    key: &'a str,
    value: String,
    env_keys: &'a [&'a str],
}

pub fn run() -> CommandResult {
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let auth_token = if config.api.auth_token.is_some() { "<redacted>" } else { "<unset>" };
    let fields = [
        Field {
            key: "api.base_url",
            value: config.api.base_url.clone(),
            env_keys: &["PESTPRO_API_BASE_URL", "PESTPRO_API_URL"],
        },
        Field {
            key: "api.bulk_upload_path",
            value: config.api.bulk_upload_path.clone(),
            env_keys: &["PESTPRO_API_BULK_UPLOAD_PATH"],
        },
        Field {
            key: "api.login_path",
            value: config.api.login_path.clone(),
            env_keys: &["PESTPRO_API_LOGIN_PATH"],
        },
        Field {
            key: "api.timeout_secs",
            value: config.api.timeout_secs.to_string(),
            env_keys: &["PESTPRO_API_TIMEOUT_SECS"],
        },
        Field {
            key: "api.auth_token",
            value: auth_token.to_string(),
            env_keys: &["PESTPRO_API_AUTH_TOKEN"],
        },
        Field {
            key: "import.delimiter",
            value: format!("{:?}", config.import.delimiter),
            env_keys: &["PESTPRO_IMPORT_DELIMITER"],
        },
        Field {
            key: "import.max_rows",
            value: config.import.max_rows.to_string(),
            env_keys: &["PESTPRO_IMPORT_MAX_ROWS"],
        },
        Field {
            key: "import.max_file_bytes",
            value: config.import.max_file_bytes.to_string(),
            env_keys: &["PESTPRO_IMPORT_MAX_FILE_BYTES"],
        },
        Field {
            key: "store.path",
            value: config.store.path.display().to_string(),
            env_keys: &["PESTPRO_STORE_PATH"],
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["PESTPRO_LOGGING_LEVEL", "PESTPRO_LOG_LEVEL"],
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["PESTPRO_LOGGING_FORMAT", "PESTPRO_LOG_FORMAT"],
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    let mut entries = Vec::with_capacity(fields.len());
    for field in &fields {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, &source));
        entries.push(json!({ "key": field.key, "value": field.value, "source": source }));
    }

    CommandResult::success_with_details(
        COMMAND,
        lines.join("\n"),
        Some(json!({ "fields": entries })),
    )
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("pestpro.toml"), PathBuf::from("config/pestpro.toml")]
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
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
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

fn render_line(key: &str, value: &str, source: &str) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::contains_path;

    #[test]
    fn dotted_paths_resolve_against_nested_tables() {
        let doc: toml::Value = "[api]\nbase_url = \"http://x\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "api.base_url"));
        assert!(!contains_path(&doc, "api.login_path"));
        assert!(!contains_path(&doc, "store.path"));
    }
}
