//! Externally supplied paths and templates.
//!
//! The run-directory root, run naming template and observation directory
//! used to be site-specific literals; they are read from a TOML file so the
//! tool is not tied to one institution's filesystem layout.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Placeholder in `run_template` replaced by the run identifier.
const RUN_PLACEHOLDER: &str = "{run}";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding one subdirectory per model run.
    pub model_root: PathBuf,
    /// Run-directory naming template, e.g. `geosfp_025x03125_tropchem_au.{run}`.
    pub run_template: String,
    /// Directory holding the MUMBA `.tab` files.
    pub obs_dir: PathBuf,
    /// Archive URL the `fetch-obs` command downloads the `.tab` files from.
    pub obs_url: String,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        Config {
            model_root: home.join("geos-chem"),
            run_template: "geosfp_025x03125_tropchem_au.{run}".to_string(),
            obs_dir: home.join("MUMBA"),
            obs_url: "https://doi.pangaea.de/10.1594/PANGAEA.871982".to_string(),
        }
    }
}

impl Config {
    /// Loads the configuration. An explicit path must exist; without one,
    /// `~/.mumba.toml` is used if present, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".mumba.toml");
                if !default.exists() {
                    return Ok(Config::default());
                }
                default
            }
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading config file `{}`", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("parsing config file `{}`", path.display()))?;

        Ok(config)
    }

    /// Resolves a run identifier to its output directory.
    pub fn run_dir(&self, run: &str) -> PathBuf {
        self.model_root
            .join(self.run_template.replace(RUN_PLACEHOLDER, run))
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn should_resolve_run_dir_from_template() {
        let config = Config {
            model_root: PathBuf::from("/data/gc"),
            run_template: "geosfp_025x03125_tropchem_au.{run}".to_string(),
            ..Config::default()
        };

        assert_eq!(
            config.run_dir("base"),
            PathBuf::from("/data/gc/geosfp_025x03125_tropchem_au.base")
        );
    }

    #[test]
    fn should_parse_partial_config() {
        let config: Config = toml::from_str(r#"model_root = "/scratch/runs""#).unwrap();

        assert_eq!(config.model_root, PathBuf::from("/scratch/runs"));
        // Unset keys keep their defaults
        assert!(config.run_template.contains("{run}"));
    }

    #[test]
    fn should_reject_unknown_keys() {
        let parsed: std::result::Result<Config, _> = toml::from_str(r#"model_dir = "/x""#);
        assert!(parsed.is_err());
    }

    #[test]
    fn should_error_on_missing_explicit_config() {
        let loaded = Config::load(Some(Path::new("/nonexistent/mumba.toml")));
        assert!(loaded.is_err());
    }
}
