//! Session configuration.
//!
//! Sources, lowest priority first: built-in defaults, a JSON file, then
//! `PRAATFAN_BRIDGE_*` environment variables.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::diagnostics::WarningPolicy;
use crate::error::{Error, Result};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "PRAATFAN_BRIDGE_";

/// Settings for a [`Praat`](crate::Praat) session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// What happens to engine warnings.
    pub warnings: WarningPolicy,
    /// Seed for the session's random generator; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Base directory of fixture files (see [`Resources`](crate::Resources)).
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            warnings: WarningPolicy::Collect,
            seed: None,
            data_dir: PathBuf::from("tests"),
        }
    }
}

impl Config {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Read a JSON file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.apply_overrides(|key| env::var(key).ok())?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply overrides looked up by full variable name.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        if let Some(policy) = var("WARNINGS") {
            self.warnings = policy.parse()?;
        }
        if let Some(seed) = var("SEED") {
            let seed = seed.trim();
            self.seed = if seed.is_empty() {
                None
            } else {
                Some(seed.parse().map_err(|_| {
                    Error::Config(format!("{}SEED must be an unsigned integer, not \"{}\"", ENV_PREFIX, seed))
                })?)
            };
        }
        if let Some(dir) = var("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn overrides_take_precedence() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("PRAATFAN_BRIDGE_WARNINGS", "error"),
                ("PRAATFAN_BRIDGE_SEED", "5489"),
                ("PRAATFAN_BRIDGE_DATA_DIR", "/data"),
            ]))
            .unwrap();
        assert_eq!(config.warnings, WarningPolicy::Error);
        assert_eq!(config.seed, Some(5489));
        assert_eq!(config.data_dir, PathBuf::from("/data"));
    }

    #[test]
    fn bad_overrides_are_config_errors() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup(&[("PRAATFAN_BRIDGE_SEED", "soon")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = config
            .apply_overrides(lookup(&[("PRAATFAN_BRIDGE_WARNINGS", "loud")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn json_file_with_partial_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.json");
        fs::write(&path, r#"{ "warnings": "ignore" }"#).unwrap();
        let mut config: Config = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        config.apply_overrides(lookup(&[])).unwrap();
        assert_eq!(config.warnings, WarningPolicy::Ignore);
        assert_eq!(config.seed, None);
        assert_eq!(config.data_dir, PathBuf::from("tests"));
    }
}
