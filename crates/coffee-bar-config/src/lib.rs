use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_COFFEE_BAR_CONFIG: &str = "COFFEE_BAR_CONFIG";
pub const ENV_AUTH_DOMAIN: &str = "COFFEE_BAR_AUTH_DOMAIN";
pub const ENV_AUTH_CLIENT_ID: &str = "COFFEE_BAR_AUTH_CLIENT_ID";
pub const ENV_AUTH_AUDIENCE: &str = "COFFEE_BAR_AUTH_AUDIENCE";
pub const ENV_AUTH_SCOPE: &str = "COFFEE_BAR_AUTH_SCOPE";
pub const ENV_GATEWAY_URL: &str = "COFFEE_BAR_GATEWAY_URL";

const DEFAULT_GATEWAY_URL: &str = "http://localhost:4000/graphql";
const DEFAULT_AUTH_SCOPE: &str = "openid profile email";
const DEFAULT_AUTH_CONNECTION: &str = "google-oauth2";
const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/callback";
const DEFAULT_LOGOUT_RETURN_TO: &str = "http://localhost:3000";
const DEFAULT_SUPPORT_EMAIL: &str = "support@coffee.ai";
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
const DEFAULT_USER_PICKER_PAGE_SIZE: u32 = 20;
const DEFAULT_PREFERENCES_PICKER_PAGE_SIZE: u32 = 50;
const DEFAULT_USERS_PAGE_SIZE: u32 = 50;
const DEFAULT_SCROLL_THRESHOLD_ROWS: u16 = 2;
const MAX_PAGE_SIZE: u32 = 100;
const MAX_SEARCH_DEBOUNCE_MS: u64 = 5_000;
const MAX_SCROLL_THRESHOLD_ROWS: u16 = 20;
const TOKEN_FILE_NAME: &str = "token.json";
const LOG_FILE_NAME: &str = "coffee-bar.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Message(String),
}

impl ConfigError {
    fn configuration(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoffeeBarConfig {
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub identity: IdentityConfigToml,
    #[serde(default)]
    pub ui: UiConfigToml,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityConfigToml {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub audience: String,
    #[serde(default = "default_auth_scope")]
    pub scope: String,
    #[serde(default = "default_auth_connection")]
    pub connection: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_logout_return_to")]
    pub logout_return_to: String,
    #[serde(default = "default_support_email")]
    pub support_email: String,
}

impl Default for IdentityConfigToml {
    fn default() -> Self {
        Self {
            domain: String::new(),
            client_id: String::new(),
            audience: String::new(),
            scope: default_auth_scope(),
            connection: default_auth_connection(),
            redirect_uri: default_redirect_uri(),
            logout_return_to: default_logout_return_to(),
            support_email: default_support_email(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UiConfigToml {
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    #[serde(default = "default_user_picker_page_size")]
    pub user_picker_page_size: u32,
    #[serde(default = "default_preferences_picker_page_size")]
    pub preferences_picker_page_size: u32,
    #[serde(default = "default_users_page_size")]
    pub users_page_size: u32,
    #[serde(default = "default_scroll_threshold_rows")]
    pub scroll_threshold_rows: u16,
}

impl Default for UiConfigToml {
    fn default() -> Self {
        Self {
            search_debounce_ms: default_search_debounce_ms(),
            user_picker_page_size: default_user_picker_page_size(),
            preferences_picker_page_size: default_preferences_picker_page_size(),
            users_page_size: default_users_page_size(),
            scroll_threshold_rows: default_scroll_threshold_rows(),
        }
    }
}

impl Default for CoffeeBarConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            data_dir: default_data_dir(),
            identity: IdentityConfigToml::default(),
            ui: UiConfigToml::default(),
        }
    }
}

/// Identity provider settings that must be present before any sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRuntimeConfig {
    pub domain: String,
    pub client_id: String,
    pub audience: String,
    pub scope: String,
    pub connection: String,
    pub redirect_uri: String,
    pub logout_return_to: String,
}

impl CoffeeBarConfig {
    pub fn identity_runtime(&self) -> Result<IdentityRuntimeConfig, ConfigError> {
        let domain = self.identity.domain.trim();
        if domain.is_empty() {
            return Err(ConfigError::configuration(format!(
                "identity.domain is not configured; set {ENV_AUTH_DOMAIN} or edit the config file"
            )));
        }
        let client_id = self.identity.client_id.trim();
        if client_id.is_empty() {
            return Err(ConfigError::configuration(format!(
                "identity.client_id is not configured; set {ENV_AUTH_CLIENT_ID} or edit the config file"
            )));
        }

        Ok(IdentityRuntimeConfig {
            domain: domain.to_owned(),
            client_id: client_id.to_owned(),
            audience: self.identity.audience.trim().to_owned(),
            scope: self.identity.scope.clone(),
            connection: self.identity.connection.clone(),
            redirect_uri: self.identity.redirect_uri.clone(),
            logout_return_to: self.identity.logout_return_to.clone(),
        })
    }

    pub fn token_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(TOKEN_FILE_NAME)
    }

    pub fn log_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(LOG_FILE_NAME)
    }

    /// Applies `COFFEE_BAR_*` overrides. Overrides are never persisted.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        for (name, slot) in [
            (ENV_AUTH_DOMAIN, &mut self.identity.domain),
            (ENV_AUTH_CLIENT_ID, &mut self.identity.client_id),
            (ENV_AUTH_AUDIENCE, &mut self.identity.audience),
            (ENV_AUTH_SCOPE, &mut self.identity.scope),
            (ENV_GATEWAY_URL, &mut self.gateway_url),
        ] {
            if let Some(value) = read_env_override(name)? {
                *slot = value;
            }
        }
        Ok(())
    }
}

pub fn load_from_env() -> Result<CoffeeBarConfig, ConfigError> {
    let path = config_path_from_env()?;
    let mut config = load_from_path(path)?;
    config.apply_env_overrides()?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<CoffeeBarConfig, ConfigError> {
    load_or_create_config(path.as_ref())
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = resolve_home_dir().ok_or_else(|| {
        ConfigError::configuration("Unable to resolve home directory from HOME or USERPROFILE")
    })?;

    Ok(home.join(".config").join("coffee-bar").join("config.toml"))
}

fn config_path_from_env() -> Result<PathBuf, ConfigError> {
    match std::env::var(ENV_COFFEE_BAR_CONFIG) {
        Ok(raw) => {
            if raw.trim().is_empty() {
                default_config_path()
            } else {
                Ok(raw.into())
            }
        }
        Err(std::env::VarError::NotPresent) => default_config_path(),
        Err(_) => Err(ConfigError::configuration(
            "COFFEE_BAR_CONFIG contained invalid UTF-8",
        )),
    }
}

fn read_env_override(name: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => {
            let trimmed = raw.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_owned()))
        }
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(_) => Err(ConfigError::configuration(format!(
            "{name} contained invalid UTF-8"
        ))),
    }
}

/// `$XDG_DATA_HOME` when absolute, else `~/.local/share`, else the temp dir.
fn resolve_data_local_dir() -> PathBuf {
    non_blank_env("XDG_DATA_HOME")
        .map(PathBuf::from)
        .filter(|path| path.is_absolute())
        .or_else(|| resolve_home_dir().map(|home| home.join(".local").join("share")))
        .unwrap_or_else(std::env::temp_dir)
}

fn resolve_home_dir() -> Option<PathBuf> {
    non_blank_env("HOME")
        .or_else(|| non_blank_env("USERPROFILE"))
        .map(PathBuf::from)
}

fn non_blank_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_owned()
}

fn default_data_dir() -> String {
    resolve_data_local_dir()
        .join("coffee-bar")
        .to_string_lossy()
        .to_string()
}

fn default_auth_scope() -> String {
    DEFAULT_AUTH_SCOPE.to_owned()
}

fn default_auth_connection() -> String {
    DEFAULT_AUTH_CONNECTION.to_owned()
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_owned()
}

fn default_logout_return_to() -> String {
    DEFAULT_LOGOUT_RETURN_TO.to_owned()
}

fn default_support_email() -> String {
    DEFAULT_SUPPORT_EMAIL.to_owned()
}

fn default_search_debounce_ms() -> u64 {
    DEFAULT_SEARCH_DEBOUNCE_MS
}

fn default_user_picker_page_size() -> u32 {
    DEFAULT_USER_PICKER_PAGE_SIZE
}

fn default_preferences_picker_page_size() -> u32 {
    DEFAULT_PREFERENCES_PICKER_PAGE_SIZE
}

fn default_users_page_size() -> u32 {
    DEFAULT_USERS_PAGE_SIZE
}

fn default_scroll_threshold_rows() -> u16 {
    DEFAULT_SCROLL_THRESHOLD_ROWS
}

fn persist_config(path: &Path, config: &CoffeeBarConfig) -> Result<(), ConfigError> {
    let rendered = toml::to_string_pretty(config).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to serialize COFFEE_BAR_CONFIG for {}: {err}",
            path.display()
        ))
    })?;

    std::fs::write(path, rendered.as_bytes()).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to write COFFEE_BAR_CONFIG to {}: {err}",
            path.display()
        ))
    })
}

fn load_or_create_config(path: &Path) -> Result<CoffeeBarConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|err| {
                        ConfigError::configuration(format!(
                            "Failed to create parent directory {} for COFFEE_BAR_CONFIG: {err}",
                            parent.display()
                        ))
                    })?;
                }
            }

            let default_config = CoffeeBarConfig::default();
            persist_config(path, &default_config)?;
            return Ok(default_config);
        }
        Err(err) => {
            return Err(ConfigError::configuration(format!(
                "Failed to read COFFEE_BAR_CONFIG from {}: {err}",
                path.display()
            )));
        }
    };

    let mut config: CoffeeBarConfig = toml::from_str(&raw).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to parse COFFEE_BAR_CONFIG from {}: {err}",
            path.display()
        ))
    })?;

    if normalize_config(&mut config) {
        persist_config(path, &config)?;
    }

    Ok(config)
}

fn normalize_config(config: &mut CoffeeBarConfig) -> bool {
    let mut changed = false;
    changed |= normalize_non_empty_string(&mut config.gateway_url, default_gateway_url());
    changed |= normalize_non_empty_string(&mut config.data_dir, default_data_dir());
    changed |= normalize_identity_config(&mut config.identity);
    changed |= normalize_ui_config(&mut config.ui);
    changed
}

pub fn normalize_identity_config(config: &mut IdentityConfigToml) -> bool {
    let mut changed = false;
    changed |= normalize_trimmed(&mut config.domain);
    changed |= normalize_trimmed(&mut config.client_id);
    changed |= normalize_trimmed(&mut config.audience);
    changed |= normalize_non_empty_string(&mut config.scope, default_auth_scope());
    changed |= normalize_non_empty_string(&mut config.connection, default_auth_connection());
    changed |= normalize_non_empty_string(&mut config.redirect_uri, default_redirect_uri());
    changed |= normalize_non_empty_string(
        &mut config.logout_return_to,
        default_logout_return_to(),
    );
    changed |= normalize_non_empty_string(&mut config.support_email, default_support_email());
    changed
}

pub fn normalize_ui_config(config: &mut UiConfigToml) -> bool {
    let before = config.clone();
    config.search_debounce_ms = config.search_debounce_ms.min(MAX_SEARCH_DEBOUNCE_MS);
    config.user_picker_page_size = config.user_picker_page_size.clamp(1, MAX_PAGE_SIZE);
    config.preferences_picker_page_size =
        config.preferences_picker_page_size.clamp(1, MAX_PAGE_SIZE);
    config.users_page_size = config.users_page_size.clamp(1, MAX_PAGE_SIZE);
    config.scroll_threshold_rows = config
        .scroll_threshold_rows
        .clamp(1, MAX_SCROLL_THRESHOLD_ROWS);
    *config != before
}

fn normalize_trimmed(value: &mut String) -> bool {
    let trimmed = value.trim();
    if trimmed != value {
        *value = trimmed.to_owned();
        return true;
    }
    false
}

fn normalize_non_empty_string(value: &mut String, default: String) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        if *value != default {
            *value = default;
            return true;
        }
        return false;
    }

    if trimmed != value {
        *value = trimmed.to_owned();
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::{Mutex, MutexGuard};
    use std::time::{SystemTime, UNIX_EPOCH};

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Sets process env vars for one test and restores the previous values on drop.
    struct ScopedEnv {
        saved: Vec<(String, Option<String>)>,
        _lock: MutexGuard<'static, ()>,
    }

    impl ScopedEnv {
        fn set(vars: &[(&str, Option<&str>)]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let saved = vars
                .iter()
                .map(|(name, value)| {
                    let previous = std::env::var(name).ok();
                    apply_env(name, *value);
                    ((*name).to_owned(), previous)
                })
                .collect();
            Self { saved, _lock: lock }
        }
    }

    impl Drop for ScopedEnv {
        fn drop(&mut self) {
            for (name, previous) in self.saved.drain(..) {
                apply_env(&name, previous.as_deref());
            }
        }
    }

    fn apply_env(name: &str, value: Option<&str>) {
        match value {
            Some(value) => std::env::set_var(name, value),
            None => std::env::remove_var(name),
        }
    }

    fn scratch_dir(label: &str) -> PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let dir = std::env::temp_dir().join(format!(
            "coffee-bar-config-{label}-{}-{stamp}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    fn write_fixture(path: &Path, raw: &str) {
        std::fs::write(path, raw).expect("write fixture config");
    }

    const NO_OVERRIDES: [(&str, Option<&str>); 5] = [
        (ENV_AUTH_DOMAIN, None),
        (ENV_AUTH_CLIENT_ID, None),
        (ENV_AUTH_AUDIENCE, None),
        (ENV_AUTH_SCOPE, None),
        (ENV_GATEWAY_URL, None),
    ];

    #[test]
    fn load_from_env_creates_default_config_when_missing() {
        let home = scratch_dir("home-defaults");
        let expected = home.join(".config").join("coffee-bar").join("config.toml");
        let home_str = home.to_str().expect("home path").to_owned();

        let mut vars = vec![
            ("HOME", Some(home_str.as_str())),
            ("USERPROFILE", None),
            (ENV_COFFEE_BAR_CONFIG, None),
            ("XDG_DATA_HOME", None),
        ];
        vars.extend(NO_OVERRIDES);

        {
            let _env = ScopedEnv::set(&vars);
            let config = load_from_env().expect("load defaults");
            assert_eq!(config.gateway_url, DEFAULT_GATEWAY_URL);
            assert_eq!(config.identity.scope, "openid profile email");
            assert_eq!(config.identity.connection, "google-oauth2");
            assert_eq!(config.ui.search_debounce_ms, 300);
            assert_eq!(config.ui.user_picker_page_size, 20);
            assert_eq!(config.ui.preferences_picker_page_size, 50);
            assert_eq!(
                PathBuf::from(&config.data_dir),
                home.join(".local").join("share").join("coffee-bar")
            );
            assert!(expected.exists());
        }

        let _ = std::fs::remove_dir_all(&home);
    }

    #[test]
    fn load_from_env_honors_explicit_config_path_and_overrides() {
        let root = scratch_dir("explicit-path");
        let explicit = root.join("nested").join("custom.toml");
        let explicit_str = explicit.to_str().expect("config path").to_owned();

        {
            let _env = ScopedEnv::set(&[
                (ENV_COFFEE_BAR_CONFIG, Some(explicit_str.as_str())),
                (ENV_AUTH_DOMAIN, Some("  coffee.eu.auth0.com ")),
                (ENV_AUTH_CLIENT_ID, Some("client-123")),
                (ENV_AUTH_AUDIENCE, Some("https://api.coffee.ai")),
                (ENV_AUTH_SCOPE, Some("   ")),
                (ENV_GATEWAY_URL, Some("https://api.coffee.ai/graphql")),
            ]);
            let config = load_from_env().expect("load explicit path config");
            assert!(explicit.exists());
            assert_eq!(config.identity.domain, "coffee.eu.auth0.com");
            assert_eq!(config.identity.scope, "openid profile email");
            assert_eq!(config.gateway_url, "https://api.coffee.ai/graphql");

            let persisted = std::fs::read_to_string(&explicit).expect("read persisted");
            assert!(!persisted.contains("client-123"));
        }

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn load_from_path_returns_parse_error_for_invalid_toml() {
        let root = scratch_dir("invalid");
        let path = root.join("config.toml");
        write_fixture(&path, "gateway_url = [\n");

        let error = load_from_path(&path).expect_err("expected parse failure");
        assert!(error
            .to_string()
            .contains("Failed to parse COFFEE_BAR_CONFIG"));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn load_from_path_normalizes_and_persists_blank_and_out_of_range_values() {
        let root = scratch_dir("normalization");
        let path = root.join("config.toml");
        write_fixture(
            &path,
            r#"
gateway_url = "   "
data_dir = "/tmp/coffee"

[identity]
domain = "  coffee.us.auth0.com  "
client_id = "abc"
scope = ""

[ui]
search_debounce_ms = 999999
user_picker_page_size = 0
preferences_picker_page_size = 500
scroll_threshold_rows = 0
"#,
        );

        let config = load_from_path(&path).expect("load and normalize config");
        assert_eq!(config.gateway_url, DEFAULT_GATEWAY_URL);
        assert_eq!(config.identity.domain, "coffee.us.auth0.com");
        assert_eq!(config.identity.scope, DEFAULT_AUTH_SCOPE);
        assert_eq!(config.ui.search_debounce_ms, MAX_SEARCH_DEBOUNCE_MS);
        assert_eq!(config.ui.user_picker_page_size, 1);
        assert_eq!(config.ui.preferences_picker_page_size, MAX_PAGE_SIZE);
        assert_eq!(config.ui.users_page_size, DEFAULT_USERS_PAGE_SIZE);
        assert_eq!(config.ui.scroll_threshold_rows, 1);
        assert_eq!(config.token_path(), Path::new("/tmp/coffee").join("token.json"));

        let persisted = std::fs::read_to_string(&path).expect("read persisted config");
        let parsed: CoffeeBarConfig =
            toml::from_str(&persisted).expect("parse persisted normalized config");
        assert_eq!(parsed, config);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn identity_runtime_requires_domain_and_client_id() {
        let mut config = CoffeeBarConfig::default();
        let error = config.identity_runtime().expect_err("missing domain");
        assert!(error.to_string().contains(ENV_AUTH_DOMAIN));

        config.identity.domain = "coffee.auth0.com".to_owned();
        let error = config.identity_runtime().expect_err("missing client id");
        assert!(error.to_string().contains(ENV_AUTH_CLIENT_ID));

        config.identity.client_id = "abc".to_owned();
        let runtime = config.identity_runtime().expect("complete identity config");
        assert_eq!(runtime.domain, "coffee.auth0.com");
        assert_eq!(runtime.scope, "openid profile email");
    }
}
