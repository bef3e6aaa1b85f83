//! Configuration for the coordinator.
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML
//! file, then environment variables. The binary applies CLI flags last.
//!
//! Config files are checked on Unix: world-writable files are rejected, and
//! so are world-readable files that carry an API key.

use std::path::Path;

use conclave_common::{ConclaveError, Result};
use conclave_llm::LlmConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::pipeline::FanOutMode;

pub const FAN_OUT_ENV: &str = "CONCLAVE_FAN_OUT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub fan_out: FanOutMode,
}

impl CoordinatorConfig {
    /// Load configuration from a TOML file after checking its permissions.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        #[cfg(unix)]
        validate_config_file_permissions(path)?;

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;

        if config.llm.api_key.is_some() {
            warn!(
                "API key found in config file '{}'. Prefer the {} environment variable.",
                path.display(),
                conclave_llm::config::API_KEY_ENV
            );
        }

        Ok(config)
    }

    /// Defaults, then the file at `path` if given, then the environment.
    pub fn load<F>(path: Option<&Path>, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(FAN_OUT_ENV).filter(|v| !v.trim().is_empty()) {
            self.pipeline.fan_out = raw.parse()?;
        }
        self.llm.apply_env(lookup)
    }

    /// Startup checks. A missing API key is fatal.
    pub fn validate(&self) -> Result<()> {
        self.llm.require_api_key()?;
        if self.llm.fast_model.trim().is_empty() || self.llm.smart_model.trim().is_empty() {
            return Err(ConclaveError::Config(
                "Both fast and smart model ids must be set".to_string(),
            ));
        }
        if self.llm.max_concurrent_requests == 0 {
            return Err(ConclaveError::Config(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(unix)]
fn validate_config_file_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

    if !metadata.is_file() {
        anyhow::bail!("Config path '{}' is not a regular file", path.display());
    }

    let permission_bits = metadata.permissions().mode() & 0o777;

    if permission_bits & 0o002 != 0 {
        anyhow::bail!(
            "Config file '{}' is world-writable (mode {:04o}). Fix with: chmod o-w {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    let content = std::fs::read_to_string(path)?;
    let has_api_key = content
        .lines()
        .any(|line| line.trim_start().starts_with("api_key"));

    if has_api_key && permission_bits & 0o004 != 0 {
        anyhow::bail!(
            "Config file '{}' contains an API key but is world-readable (mode {:04o}). Fix with: chmod 600 {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    if has_api_key && permission_bits & 0o040 != 0 {
        warn!(
            "Config file '{}' contains an API key and is group-readable (mode {:04o})",
            path.display(),
            permission_bits
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[cfg(unix)]
    fn set_mode(file: &tempfile::NamedTempFile, mode: u32) {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    fn parses_full_file() {
        let file = write_config(
            r#"
[llm]
fast_model = "gemini-2.5-flash-lite"
timeout_ms = 30000

[pipeline]
fan_out = "concurrent"
"#,
        );
        let config = CoordinatorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.llm.fast_model, "gemini-2.5-flash-lite");
        assert_eq!(config.llm.smart_model, "gemini-2.5-pro");
        assert_eq!(config.llm.timeout_ms, 30000);
        assert_eq!(config.pipeline.fan_out, FanOutMode::Concurrent);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let file = write_config("");
        let config = CoordinatorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.pipeline.fan_out, FanOutMode::Sequential);
        assert_eq!(config.llm.fast_model, "gemini-2.5-flash");
    }

    #[test]
    fn env_overrides_file() {
        let file = write_config("[pipeline]\nfan_out = \"sequential\"\n");
        let config = CoordinatorConfig::load(
            Some(file.path()),
            env(&[
                (FAN_OUT_ENV, "concurrent"),
                ("GEMINI_API_KEY", "k"),
                ("GEMINI_MODEL_SMART", "gemini-x-pro"),
            ]),
        )
        .unwrap();
        assert_eq!(config.pipeline.fan_out, FanOutMode::Concurrent);
        assert_eq!(config.llm.api_key.as_deref(), Some("k"));
        assert_eq!(config.llm.smart_model, "gemini-x-pro");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_fan_out_env_is_rejected() {
        let mut config = CoordinatorConfig::default();
        let err = config.apply_env(env(&[(FAN_OUT_ENV, "parallel")])).unwrap_err();
        assert!(matches!(err, ConclaveError::Config(_)));
    }

    #[test]
    fn missing_api_key_fails_validation() {
        let config = CoordinatorConfig::load(None, env(&[])).unwrap();
        assert!(matches!(config.validate(), Err(ConclaveError::Config(_))));
    }

    #[test]
    fn zero_concurrency_fails_validation() {
        let mut config = CoordinatorConfig::default();
        config.llm.api_key = Some("k".to_string());
        config.llm.max_concurrent_requests = 0;
        assert!(config.validate().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn world_writable_file_is_rejected() {
        let file = write_config("");
        set_mode(&file, 0o666);
        let err = CoordinatorConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("world-writable"));
    }

    #[cfg(unix)]
    #[test]
    fn world_readable_key_is_rejected() {
        let file = write_config("[llm]\napi_key = \"secret\"\n");
        set_mode(&file, 0o644);
        let err = CoordinatorConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("world-readable"));

        set_mode(&file, 0o600);
        let config = CoordinatorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("secret"));
    }
}
