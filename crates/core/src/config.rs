use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::import::parser::{ParseOptions, DEFAULT_MAX_FILE_BYTES, DEFAULT_MAX_ROWS};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub import: ImportConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub bulk_upload_path: String,
    pub login_path: String,
    pub timeout_secs: u64,
    pub auth_token: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct ImportConfig {
    pub delimiter: char,
    pub max_rows: usize,
    pub max_file_bytes: usize,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub path: PathBuf,
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
    pub api_base_url: Option<String>,
    pub api_auth_token: Option<String>,
    pub import_delimiter: Option<char>,
    pub store_path: Option<PathBuf>,
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
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_API_BASE_URL.to_string(),
                bulk_upload_path: "/api/customers/bulk-upload".to_string(),
                login_path: "/api/auth/login".to_string(),
                timeout_secs: 30,
                auth_token: None,
            },
            import: ImportConfig {
                delimiter: ',',
                max_rows: DEFAULT_MAX_ROWS,
                max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            },
            store: StoreConfig { path: PathBuf::from(".pestpro/store.json") },
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

impl ImportConfig {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            delimiter: self.delimiter as u8,
            max_rows: self.max_rows,
            max_file_bytes: self.max_file_bytes,
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("pestpro.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.api.base_url = normalize_base_url(&config.api.base_url);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(api) = patch.api {
            if let Some(base_url) = api.base_url {
                self.api.base_url = base_url;
            }
            if let Some(bulk_upload_path) = api.bulk_upload_path {
                self.api.bulk_upload_path = bulk_upload_path;
            }
            if let Some(login_path) = api.login_path {
                self.api.login_path = login_path;
            }
            if let Some(timeout_secs) = api.timeout_secs {
                self.api.timeout_secs = timeout_secs;
            }
            if let Some(auth_token) = api.auth_token {
                self.api.auth_token = Some(auth_token.into());
            }
        }

        if let Some(import) = patch.import {
            if let Some(delimiter) = import.delimiter {
                self.import.delimiter = delimiter;
            }
            if let Some(max_rows) = import.max_rows {
                self.import.max_rows = max_rows;
            }
            if let Some(max_file_bytes) = import.max_file_bytes {
                self.import.max_file_bytes = max_file_bytes;
            }
        }

        if let Some(store) = patch.store {
            if let Some(path) = store.path {
                self.store.path = path;
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
        let base_url = read_env("PESTPRO_API_BASE_URL").or_else(|| read_env("PESTPRO_API_URL"));
        if let Some(value) = base_url {
            self.api.base_url = value;
        }
        if let Some(value) = read_env("PESTPRO_API_BULK_UPLOAD_PATH") {
            self.api.bulk_upload_path = value;
        }
        if let Some(value) = read_env("PESTPRO_API_LOGIN_PATH") {
            self.api.login_path = value;
        }
        if let Some(value) = read_env("PESTPRO_API_TIMEOUT_SECS") {
            self.api.timeout_secs = parse_number("PESTPRO_API_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("PESTPRO_API_AUTH_TOKEN") {
            self.api.auth_token = Some(value.into());
        }

        if let Some(value) = read_env("PESTPRO_IMPORT_DELIMITER") {
            self.import.delimiter = parse_delimiter("PESTPRO_IMPORT_DELIMITER", &value)?;
        }
        if let Some(value) = read_env("PESTPRO_IMPORT_MAX_ROWS") {
            self.import.max_rows = parse_number("PESTPRO_IMPORT_MAX_ROWS", &value)?;
        }
        if let Some(value) = read_env("PESTPRO_IMPORT_MAX_FILE_BYTES") {
            self.import.max_file_bytes = parse_number("PESTPRO_IMPORT_MAX_FILE_BYTES", &value)?;
        }

        if let Some(value) = read_env("PESTPRO_STORE_PATH") {
            self.store.path = PathBuf::from(value);
        }

        let log_level =
            read_env("PESTPRO_LOGGING_LEVEL").or_else(|| read_env("PESTPRO_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PESTPRO_LOGGING_FORMAT").or_else(|| read_env("PESTPRO_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.api_base_url {
            self.api.base_url = base_url;
        }
        if let Some(auth_token) = overrides.api_auth_token {
            self.api.auth_token = Some(auth_token.into());
        }
        if let Some(delimiter) = overrides.import_delimiter {
            self.import.delimiter = delimiter;
        }
        if let Some(store_path) = overrides.store_path {
            self.store.path = store_path;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_api(&self.api)?;
        validate_import(&self.import)?;
        validate_store(&self.store)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Repairs the shorthand base URLs operators tend to paste (`:5000`,
/// `//:5000`, `//host`) and drops a trailing slash.
pub fn normalize_base_url(raw: &str) -> String {
    let url = raw.trim();
    let repaired = if starts_with_port(url) {
        format!("http://localhost{url}")
    } else if let Some(rest) = url.strip_prefix("//").filter(|rest| starts_with_port(rest)) {
        format!("http://localhost{rest}")
    } else if let Some(rest) = url.strip_prefix("//") {
        format!("http://{rest}")
    } else {
        url.to_string()
    };
    repaired.trim_end_matches('/').to_string()
}

fn starts_with_port(value: &str) -> bool {
    let Some(rest) = value.strip_prefix(':') else {
        return false;
    };
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    (2..=5).contains(&digits)
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("pestpro.toml"), PathBuf::from("config/pestpro.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_api(api: &ApiConfig) -> Result<(), ConfigError> {
    if !api.base_url.starts_with("http://") && !api.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "api.base_url must start with http:// or https:// (got `{}`)",
            api.base_url
        )));
    }

    for (key, path) in
        [("api.bulk_upload_path", &api.bulk_upload_path), ("api.login_path", &api.login_path)]
    {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!("{key} must start with `/`")));
        }
    }

    if api.timeout_secs == 0 || api.timeout_secs > 300 {
        return Err(ConfigError::Validation("api.timeout_secs must be in range 1..=300".to_string()));
    }

    let blank_token =
        api.auth_token.as_ref().map(|token| token.expose_secret().trim().is_empty()).unwrap_or(false);
    if blank_token {
        return Err(ConfigError::Validation(
            "api.auth_token is set but empty; remove it or provide a token".to_string(),
        ));
    }

    Ok(())
}

fn validate_import(import: &ImportConfig) -> Result<(), ConfigError> {
    let delimiter = import.delimiter;
    if !delimiter.is_ascii() || delimiter == '"' || delimiter == '\n' || delimiter == '\r' {
        return Err(ConfigError::Validation(
            "import.delimiter must be a single ASCII character other than a quote or newline"
                .to_string(),
        ));
    }

    if import.max_rows == 0 {
        return Err(ConfigError::Validation(
            "import.max_rows must be greater than zero".to_string(),
        ));
    }

    if import.max_file_bytes == 0 {
        return Err(ConfigError::Validation(
            "import.max_file_bytes must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_store(store: &StoreConfig) -> Result<(), ConfigError> {
    if store.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("store.path must not be empty".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_delimiter(key: &str, value: &str) -> Result<char, ConfigError> {
    if value == "\\t" || value == "tab" {
        return Ok('\t');
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(delimiter), None) => Ok(delimiter),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    api: Option<ApiPatch>,
    import: Option<ImportPatch>,
    store: Option<StorePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiPatch {
    base_url: Option<String>,
    bulk_upload_path: Option<String>,
    login_path: Option<String>,
    timeout_secs: Option<u64>,
    auth_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ImportPatch {
    delimiter: Option<char>,
    max_rows: Option<usize>,
    max_file_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{normalize_base_url, AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const PESTPRO_VARS: [&str; 6] = [
        "PESTPRO_API_BASE_URL",
        "PESTPRO_API_URL",
        "PESTPRO_API_AUTH_TOKEN",
        "PESTPRO_IMPORT_DELIMITER",
        "PESTPRO_LOG_LEVEL",
        "PESTPRO_LOG_FORMAT",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
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
    fn defaults_validate_without_any_file_or_env() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&PESTPRO_VARS);

        let config = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("does-not-exist.toml")),
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.api.base_url == "http://localhost:5000", "default base url")?;
        ensure(
            config.api.bulk_upload_path == "/api/customers/bulk-upload",
            "default bulk upload path",
        )?;
        ensure(config.import.delimiter == ',', "default delimiter is a comma")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "default format is compact")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&PESTPRO_VARS);
        env::set_var("TEST_PESTPRO_TOKEN", "token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("pestpro.toml");
            fs::write(
                &path,
                r#"
[api]
base_url = "https://pestpro.example.com/"
auth_token = "${TEST_PESTPRO_TOKEN}"

[import]
delimiter = ";"
max_rows = 50
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.api.auth_token.as_ref().map(|token| token.expose_secret())
                    == Some("token-from-env"),
                "auth token should be interpolated from environment",
            )?;
            ensure(
                config.api.base_url == "https://pestpro.example.com",
                "trailing slash should be trimmed",
            )?;
            ensure(config.import.parse_options().delimiter == b';', "delimiter from file")?;
            ensure(config.import.max_rows == 50, "max rows from file")
        })();

        clear_vars(&["TEST_PESTPRO_TOKEN"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&PESTPRO_VARS);
        env::set_var("PESTPRO_API_BASE_URL", "http://from-env:5000");
        env::set_var("PESTPRO_LOG_LEVEL", "warn");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("pestpro.toml");
            fs::write(
                &path,
                r#"
[api]
base_url = "http://from-file:5000"

[store]
path = "from-file.json"

[logging]
level = "debug"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    store_path: Some(PathBuf::from("from-override.json")),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.api.base_url == "http://from-env:5000", "env base url should win")?;
            ensure(config.logging.level == "warn", "env log level should win over file")?;
            ensure(
                config.store.path == PathBuf::from("from-override.json"),
                "override store path should win",
            )
        })();

        clear_vars(&PESTPRO_VARS);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&PESTPRO_VARS);
        env::set_var("PESTPRO_API_BASE_URL", "ftp://nope");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("api.base_url")
            );
            ensure(has_message, "validation failure should mention api.base_url")
        })();

        clear_vars(&PESTPRO_VARS);
        result
    }

    #[test]
    fn invalid_delimiter_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&PESTPRO_VARS);
        env::set_var("PESTPRO_IMPORT_DELIMITER", ";;");

        let result = AppConfig::load(LoadOptions::default());
        clear_vars(&PESTPRO_VARS);

        ensure(
            matches!(result, Err(ConfigError::InvalidEnvOverride { ref key, .. }) if key == "PESTPRO_IMPORT_DELIMITER"),
            "two-character delimiter should be rejected",
        )
    }

    #[test]
    fn auth_token_is_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&PESTPRO_VARS);
        env::set_var("PESTPRO_API_AUTH_TOKEN", "super-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");
            ensure(!debug.contains("super-secret-value"), "debug output should not contain token")
        })();

        clear_vars(&PESTPRO_VARS);
        result
    }

    #[test]
    fn shorthand_base_urls_are_repaired() {
        assert_eq!(normalize_base_url(":5000"), "http://localhost:5000");
        assert_eq!(normalize_base_url("//:5000"), "http://localhost:5000");
        assert_eq!(normalize_base_url("//api.pestpro.test"), "http://api.pestpro.test");
        assert_eq!(normalize_base_url("https://api.pestpro.test/"), "https://api.pestpro.test");
        assert_eq!(normalize_base_url("http://localhost:5000"), "http://localhost:5000");
    }
}
