//! `topicgen.toml`: optional project configuration.
//!
//! Every key is optional; command-line flags override the file.
//!
//! ```toml
//! package = "tidy"
//! marker = "#'"
//! output = "build"
//! alias_policy = "prefer-symbol"
//! ```

use crate::error::{Error, Result};
use crate::index::AliasPolicy;
use crate::pipeline::Options;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "topicgen.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub package: Option<String>,
    pub marker: Option<String>,
    pub output: Option<PathBuf>,
    pub alias_policy: Option<AliasPolicy>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| Error::Config {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load `path` if given, else `topicgen.toml` in `dir` when present.
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let candidate = dir.join(CONFIG_FILE);
                if candidate.is_file() {
                    tracing::debug!(path = %candidate.display(), "using config file");
                    Self::load(&candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Pipeline options with defaults filled in.
    pub fn options(&self) -> Options {
        let defaults = Options::default();
        Options {
            marker: self.marker.clone().unwrap_or(defaults.marker),
            package: self.package.clone(),
            alias_policy: self.alias_policy.unwrap_or(defaults.alias_policy),
        }
    }
}
