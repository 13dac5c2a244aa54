// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use lupa_search::Credentials;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:9200";
const DEFAULT_INDEX_PATTERN: &str = "logs-*";
const DEFAULT_PAGE_SIZE: usize = 100;
const DEFAULT_LLM_BASE_URL: &str = "http://localhost:11434/v1";
const DEFAULT_LLM_MODEL: &str = "qwen3";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub llm: Llm,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            backend: Backend::default(),
            ui: Ui::default(),
            llm: Llm::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Backend {
    pub base_url: Option<String>,
    pub index_pattern: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            index_pattern: Some(DEFAULT_INDEX_PATTERN.to_owned()),
            username: None,
            password: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub page_size: Option<usize>,
    pub auto_range: Option<bool>,
    pub auto_refresh: Option<bool>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            page_size: Some(DEFAULT_PAGE_SIZE),
            auto_range: Some(true),
            auto_refresh: Some(false),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Llm {
    pub enabled: Option<bool>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Llm {
    fn default() -> Self {
        Self {
            enabled: Some(false),
            base_url: Some(DEFAULT_LLM_BASE_URL.to_owned()),
            model: Some(DEFAULT_LLM_MODEL.to_owned()),
            timeout: Some("30s".to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("LUPA_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set LUPA_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join("lupa");
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and place values under [backend], [ui], and [llm]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.backend.base_url
            && base_url.trim().is_empty()
        {
            bail!("backend.base_url in {} must not be empty", path.display());
        }

        if let Some(index_pattern) = &self.backend.index_pattern
            && index_pattern.trim().is_empty()
        {
            bail!(
                "backend.index_pattern in {} must not be empty",
                path.display()
            );
        }

        if self.backend.api_key.is_some()
            && (self.backend.username.is_some() || self.backend.password.is_some())
        {
            bail!(
                "backend credentials in {} must be either username/password or api_key, not both",
                path.display()
            );
        }

        if self.backend.username.is_some() != self.backend.password.is_some() {
            bail!(
                "backend.username and backend.password in {} must be set together",
                path.display()
            );
        }

        if let Some(page_size) = self.ui.page_size
            && page_size == 0
        {
            bail!("ui.page_size in {} must be positive", path.display());
        }

        if let Some(timeout) = &self.llm.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "llm.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.backend
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn index_pattern(&self) -> &str {
        self.backend
            .index_pattern
            .as_deref()
            .unwrap_or(DEFAULT_INDEX_PATTERN)
    }

    pub fn credentials(&self) -> Credentials {
        if let Some(api_key) = &self.backend.api_key {
            return Credentials::ApiKey(api_key.clone());
        }
        if let (Some(username), Some(password)) = (&self.backend.username, &self.backend.password)
        {
            return Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            };
        }
        Credentials::None
    }

    pub fn page_size(&self) -> usize {
        self.ui.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn auto_range(&self) -> bool {
        self.ui.auto_range.unwrap_or(true)
    }

    pub fn auto_refresh(&self) -> bool {
        self.ui.auto_refresh.unwrap_or(false)
    }

    pub fn llm_enabled(&self) -> bool {
        self.llm.enabled.unwrap_or(false)
    }

    pub fn llm_base_url(&self) -> &str {
        self.llm
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_LLM_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn llm_model(&self) -> &str {
        self.llm.model.as_deref().unwrap_or(DEFAULT_LLM_MODEL)
    }

    pub fn llm_timeout(&self) -> Result<Duration> {
        parse_duration(self.llm.timeout.as_deref().unwrap_or("30s"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# lupa config\n# Place this file at: {}\n\nversion = 1\n\n[backend]\nbase_url = \"{}\"\nindex_pattern = \"{}\"\n# username = \"elastic\"\n# password = \"changeme\"\n# api_key = \"base64key\"\n\n[ui]\npage_size = {}\nauto_range = true\nauto_refresh = false\n\n[llm]\nenabled = false\nbase_url = \"{}\"\nmodel = \"{}\"\ntimeout = \"30s\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_INDEX_PATTERN,
            DEFAULT_PAGE_SIZE,
            DEFAULT_LLM_BASE_URL,
            DEFAULT_LLM_MODEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 30s)")
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_duration};
    use anyhow::Result;
    use lupa_search::Credentials;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.base_url(), "http://localhost:9200");
        assert_eq!(config.index_pattern(), "logs-*");
        assert!(config.auto_range());
        assert!(!config.llm_enabled());
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[backend]\nbase_url=\"http://localhost:9200\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[backend], [ui], and [llm]"));
        Ok(())
    }

    #[test]
    fn unsupported_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 9\n")?;
        let error = Config::load(&path).expect_err("future version should fail");
        assert!(error.to_string().contains("unsupported config version 9"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[backend]\nbase_url = \"https://search.internal:9200/\"\nindex_pattern = \"apm-*\"\nusername = \"elastic\"\npassword = \"secret\"\n[ui]\npage_size = 250\nauto_range = false\n[llm]\nenabled = true\nmodel = \"qwen3:32b\"\ntimeout = \"10s\"\n",
        )?;
        let config = Config::load(&path)?;
        assert_eq!(config.base_url(), "https://search.internal:9200");
        assert_eq!(config.index_pattern(), "apm-*");
        assert_eq!(config.page_size(), 250);
        assert!(!config.auto_range());
        assert!(config.llm_enabled());
        assert_eq!(config.llm_model(), "qwen3:32b");
        assert_eq!(config.llm_timeout()?, Duration::from_secs(10));
        assert!(matches!(config.credentials(), Credentials::Basic { .. }));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn mixed_credential_styles_are_rejected() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[backend]\nusername = \"elastic\"\npassword = \"x\"\napi_key = \"k\"\n",
        )?;
        let error = Config::load(&path).expect_err("mixed credentials should fail");
        assert!(error.to_string().contains("not both"));
        Ok(())
    }

    #[test]
    fn half_configured_basic_auth_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[backend]\nusername = \"elastic\"\n")?;
        let error = Config::load(&path).expect_err("half-configured auth should fail");
        assert!(error.to_string().contains("set together"));
        Ok(())
    }

    #[test]
    fn api_key_credentials_resolve() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[backend]\napi_key = \"abc123\"\n")?;
        let config = Config::load(&path)?;
        assert!(matches!(config.credentials(), Credentials::ApiKey(key) if key == "abc123"));
        Ok(())
    }

    #[test]
    fn zero_page_size_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\npage_size = 0\n")?;
        let error = Config::load(&path).expect_err("zero page size should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("LUPA_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("LUPA_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn default_path_uses_config_toml_suffix_when_no_env_override() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var("LUPA_CONFIG_PATH");
        }
        let path = Config::default_path()?;
        assert!(path.ends_with("config.toml"));
        Ok(())
    }

    #[test]
    fn llm_timeout_parses_suffixes_and_rejects_garbage() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("30s")?, Duration::from_secs(30));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("oops").is_err());
        Ok(())
    }

    #[test]
    fn zero_llm_timeout_is_rejected_in_config() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[llm]\ntimeout = \"0s\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn example_config_includes_required_sections() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        assert!(example.contains("[backend]"));
        assert!(example.contains("[ui]"));
        assert!(example.contains("[llm]"));
        Ok(())
    }
}
