//! Fixture file lookup.

use std::path::{Path, PathBuf};

use crate::config::Config;

/// Resolves fixture names to `<base>/data/<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resources {
    base: PathBuf,
}

impl Resources {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Resources under the configured data directory.
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.data_dir)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Path of fixture `name`; the file need not exist.
    pub fn path(&self, name: &str) -> PathBuf {
        self.base.join("data").join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_under_data() {
        let resources = Resources::new("/srv/tests");
        assert_eq!(
            resources.path("the_north_wind_and_the_sun.wav"),
            PathBuf::from("/srv/tests/data/the_north_wind_and_the_sun.wav")
        );
    }
}
