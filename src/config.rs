use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-stage configuration, built once in `main` and passed by reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Exchange the chunk-size handshake with neighbouring stages
    pub dynamic_bufsize: bool,
    /// Chunk length used when no handshake is exchanged
    pub fixed_bufsize: usize,
    /// Chunk length for Kernels that prefer big chunks
    pub fixed_big_bufsize: usize,
    /// Log negotiated and proposed chunk sizes
    pub print_bufsizes: bool,
    /// Sleep between control channel polls while waiting for the first line
    pub control_poll_interval_ms: u64,
    /// Default slot count for tee side outputs
    pub tee_slots: usize,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            dynamic_bufsize: false,
            fixed_bufsize: 1024,
            fixed_big_bufsize: 1024 * 16,
            print_bufsizes: false,
            control_poll_interval_ms: 10,
            tee_slots: 100,
        }
    }
}

pub const ENV_DYNAMIC_BUFSIZE: &str = "CSDR_DYNAMIC_BUFSIZE_ON";
pub const ENV_FIXED_BUFSIZE: &str = "CSDR_FIXED_BUFSIZE";
pub const ENV_PRINT_BUFSIZES: &str = "CSDR_PRINT_BUFSIZES";

impl StageConfig {
    /// Read the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_DYNAMIC_BUFSIZE) {
            config.dynamic_bufsize = parse_int(&value) != 0;
        } else if let Some(value) = lookup(ENV_FIXED_BUFSIZE) {
            let size = parse_int(&value).max(0) as usize;
            config.fixed_bufsize = size;
            config.fixed_big_bufsize = size;
        }

        if let Some(value) = lookup(ENV_PRINT_BUFSIZES) {
            config.print_bufsizes = parse_int(&value) != 0;
        }

        config
    }

    /// Load a JSON config file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON {}", path.display()))?;
        Ok(config)
    }

    /// Default chunk length before any minimum is applied
    pub fn default_chunk_len(&self, big: bool) -> usize {
        if big {
            self.fixed_big_bufsize
        } else {
            self.fixed_bufsize
        }
    }
}

// atoi semantics: leading integer, anything unparsable is 0
fn parse_int(value: &str) -> i64 {
    let trimmed = value.trim();
    let end = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = StageConfig::from_lookup(|_| None);
        assert_eq!(config, StageConfig::default());
    }

    #[test]
    fn test_dynamic_overrides_fixed() {
        let config = StageConfig::from_lookup(lookup_from(&[
            (ENV_DYNAMIC_BUFSIZE, "1"),
            (ENV_FIXED_BUFSIZE, "64"),
        ]));
        assert!(config.dynamic_bufsize);
        assert_eq!(config.fixed_bufsize, 1024);
    }

    #[test]
    fn test_fixed_sets_both_sizes() {
        let config = StageConfig::from_lookup(lookup_from(&[(ENV_FIXED_BUFSIZE, "2048")]));
        assert!(!config.dynamic_bufsize);
        assert_eq!(config.fixed_bufsize, 2048);
        assert_eq!(config.fixed_big_bufsize, 2048);
    }

    #[test]
    fn test_parse_int_is_lenient() {
        assert_eq!(parse_int("12abc"), 12);
        assert_eq!(parse_int(" -3"), -3);
        assert_eq!(parse_int("on"), 0);
    }
}
