//! `design-kit.toml`: where generated code goes and which targets run.
//!
//! ```toml
//! output = "gen"
//! targets = ["http-server", "openapi"]
//! stamp = false
//! parallel = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::codegen::GenerateOptions;
use crate::error::{Error, Result};

pub const FILE_NAME: &str = "design-kit.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Output root. A relative path is taken relative to the file.
    pub output: PathBuf,
    /// Targets run when none are named explicitly. Empty means every
    /// registered target.
    pub targets: Vec<String>,
    /// Prepend a generation timestamp to generated sources.
    pub stamp: bool,
    /// Run targets, and the files of a target, in parallel.
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: PathBuf::from("gen"),
            targets: Vec::new(),
            stamp: false,
            parallel: true,
        }
    }
}

impl Config {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut config: Config = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        if config.output.is_relative() {
            if let Some(dir) = path.parent() {
                config.output = dir.join(&config.output);
            }
        }
        debug!(path = %path.display(), output = %config.output.display(), "loaded configuration");
        Ok(config)
    }

    /// Loads `design-kit.toml` from `dir`, or the defaults (rooted at `dir`)
    /// when there is none.
    pub fn discover(dir: &Path) -> Result<Self> {
        let path = dir.join(FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            let mut config = Self::default();
            config.output = dir.join(&config.output);
            Ok(config)
        }
    }

    pub fn options(&self) -> GenerateOptions {
        GenerateOptions {
            stamp: self.stamp,
            parallel: self.parallel,
        }
    }
}
