//! Configuration loading for the rewrite engine.
//!
//! Sources are merged in ascending precedence: baked-in defaults, then a
//! TOML file, then `PRESTO_`-prefixed environment variables. The file is
//! optional; the defaults alone are a working single-process setup.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// One year, in seconds. Both the extension threshold and the TTL granted
/// to rewritten artifacts default to this.
pub const ONE_YEAR_SECS: u64 = 31536000;

/// Settings for the rewrite engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewriteConfig {
    /// Base URL rewritten references point at; the serving surface answers
    /// requests under this prefix.
    pub base_url: String,
    /// Origin TTLs at or above this threshold are already good enough and
    /// are left alone.
    pub min_cache_ttl_secs: u64,
    /// TTL granted to rewritten artifacts in the content store.
    pub output_ttl_secs: u64,
    /// Per-fetch deadline for origin resources.
    pub fetch_timeout_ms: u64,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            min_cache_ttl_secs: ONE_YEAR_SECS,
            output_ttl_secs: ONE_YEAR_SECS,
            fetch_timeout_ms: 5000,
        }
    }
}

impl RewriteConfig {
    /// Load configuration from the default file location (if the file
    /// exists) and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load configuration from an explicit TOML file path plus the
    /// environment. A missing file is fine; defaults fill the gaps.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading configuration");
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("PRESTO_"))
            .extract()
            .or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.base_url.trim_end_matches('/').is_empty() {
            exn::bail!(ErrorKind::Invalid("base_url must not be empty".to_string()));
        }
        if self.output_ttl_secs == 0 {
            exn::bail!(ErrorKind::Invalid(
                "output_ttl_secs of zero would expire artifacts on write".to_string(),
            ));
        }
        Ok(())
    }

    pub fn min_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.min_cache_ttl_secs)
    }

    pub fn output_ttl(&self) -> Duration {
        Duration::from_secs(self.output_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

/// Platform-appropriate default location of the config file.
pub fn default_config_path() -> PathBuf {
    ProjectDirs::from("", "", "presto")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("presto.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = RewriteConfig::default();
        config.validate().unwrap();
        assert_eq!(config.min_cache_ttl_secs, ONE_YEAR_SECS);
        assert_eq!(config.min_cache_ttl(), Duration::from_secs(ONE_YEAR_SECS));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RewriteConfig::load_from(dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, RewriteConfig::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "base_url = \"http://cdn.test\"").unwrap();
        writeln!(file, "min_cache_ttl_secs = 600").unwrap();
        drop(file);

        let config = RewriteConfig::load_from(&path).unwrap();
        assert_eq!(config.base_url, "http://cdn.test");
        assert_eq!(config.min_cache_ttl_secs, 600);
        // Untouched fields keep their defaults.
        assert_eq!(config.output_ttl_secs, ONE_YEAR_SECS);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not_a_real_key = true\n").unwrap();
        let err = RewriteConfig::load_from(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load));
    }

    #[rstest]
    // Slashes alone are no base URL.
    #[case("base_url = \"///\"\n")]
    #[case("base_url = \"\"\n")]
    // A zero output TTL would expire artifacts the moment they are written.
    #[case("output_ttl_secs = 0\n")]
    fn invalid_settings_are_rejected(#[case] toml: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, toml).unwrap();
        let err = RewriteConfig::load_from(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }
}
