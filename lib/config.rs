//! Assembly settings.
//!
//! Settings come from built-in defaults, optionally overridden by a TOML
//! document and then by `KRONSIM_*` environment variables.

use std::{ env, path::Path };
use serde::{ Deserialize, Serialize };
use crate::error::{ ConfigError, Result };

const ENV_WORKERS: &str = "KRONSIM_WORKERS";
const ENV_MAX_DENSE_DIM: &str = "KRONSIM_MAX_DENSE_DIM";
const ENV_SKIP_ZERO_TERMS: &str = "KRONSIM_SKIP_ZERO_TERMS";

fn parse_count(key: &str, val: &str) -> Result<usize> {
    val.trim().parse()
        .map_err(|_| {
            ConfigError::Parse(
                format!("{}: expected a count, got {:?}", key, val)
            ).into()
        })
}

fn parse_flag(key: &str, val: &str) -> Result<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::Parse(
            format!("{}: expected true/false/1/0, got {:?}", key, val)
        ).into()),
    }
}

/// Settings consumed by [`Assembler`][crate::dynamics::Assembler].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Number of row-partitioned workers used by the `*_all` assembly
    /// methods.
    pub workers: usize,
    /// Largest dimension the dense diagnostic path will build.
    pub max_dense_dim: usize,
    /// Skip terms whose coefficient (or rate) is exactly zero.
    pub skip_zero_terms: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { workers: 1, max_dense_dim: 1024, skip_zero_terms: true }
    }
}

impl Config {
    /// Parse settings from a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)
            .map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read settings from a TOML file, then apply environment overrides.
    pub fn from_file<P>(path: P) -> Result<Self>
    where P: AsRef<Path>
    {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `KRONSIM_WORKERS`, `KRONSIM_MAX_DENSE_DIM` and
    /// `KRONSIM_SKIP_ZERO_TERMS` where set.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides read through `lookup`; a value that is present but
    /// does not parse is an error.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where F: Fn(&str) -> Option<String>
    {
        if let Some(val) = lookup(ENV_WORKERS) {
            self.workers = parse_count(ENV_WORKERS, &val)?;
        }
        if let Some(val) = lookup(ENV_MAX_DENSE_DIM) {
            self.max_dense_dim = parse_count(ENV_MAX_DENSE_DIM, &val)?;
        }
        if let Some(val) = lookup(ENV_SKIP_ZERO_TERMS) {
            self.skip_zero_terms = parse_flag(ENV_SKIP_ZERO_TERMS, &val)?;
        }
        Ok(())
    }

    /// Check that the settings describe a usable worker layout.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkers { rank: 0, size: 0 }.into());
        }
        Ok(())
    }

    /// Set the number of workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the dense size limit.
    pub fn with_max_dense_dim(mut self, max_dense_dim: usize) -> Self {
        self.max_dense_dim = max_dense_dim;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml_str("workers = 4\n").unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.max_dense_dim, Config::default().max_dense_dim);
        assert!(config.skip_zero_terms);
    }

    #[test]
    fn full_toml() {
        let src = "workers = 3\nmax_dense_dim = 16\nskip_zero_terms = false\n";
        let config = Config::from_toml_str(src).unwrap();
        assert_eq!(
            config,
            Config { workers: 3, max_dense_dim: 16, skip_zero_terms: false },
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            Config::from_toml_str("workers = 0\n"),
            Err(Error::Config(ConfigError::InvalidWorkers { .. })),
        ));
        assert!(matches!(
            Config::from_toml_str("threads = 2\n"),
            Err(Error::Config(ConfigError::Parse(_))),
        ));
    }

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)])
        -> impl Fn(&str) -> Option<String> + 'a
    {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn overrides_apply() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("KRONSIM_WORKERS", " 6"),
            ("KRONSIM_SKIP_ZERO_TERMS", "FALSE "),
        ])).unwrap();
        assert_eq!(config.workers, 6);
        assert_eq!(config.max_dense_dim, 1024);
        assert!(!config.skip_zero_terms);
        config.apply_overrides(lookup(&[("KRONSIM_SKIP_ZERO_TERMS", "1")]))
            .unwrap();
        assert!(config.skip_zero_terms);
    }

    #[test]
    fn malformed_overrides_rejected() {
        let mut config = Config::default();
        assert!(matches!(
            config.apply_overrides(lookup(&[("KRONSIM_WORKERS", "four")])),
            Err(Error::Config(ConfigError::Parse(_))),
        ));
        assert!(matches!(
            config.apply_overrides(lookup(&[("KRONSIM_MAX_DENSE_DIM", "-3")])),
            Err(Error::Config(ConfigError::Parse(_))),
        ));
        assert!(matches!(
            config.apply_overrides(lookup(&[("KRONSIM_SKIP_ZERO_TERMS", "yes")])),
            Err(Error::Config(ConfigError::Parse(_))),
        ));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn reads_file() {
        let path = std::env::temp_dir()
            .join(format!("kronsim-config-{}.toml", std::process::id()));
        std::fs::write(&path, "max_dense_dim = 64\n").unwrap();
        let config = Config::from_file(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.unwrap().max_dense_dim, 64);
        let missing = Config::from_file(path);
        assert!(matches!(missing, Err(Error::Io(_))));
        let err = missing.unwrap_err();
        assert!(std::error::Error::source(&err).is_some());
    }
}
