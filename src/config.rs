//! Binary configuration from the environment

use crate::attachment::DEFAULT_MAX_ATTACHMENT_BYTES;
use crate::session::DEFAULT_GREETING;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_CHUNK_DELAY_MS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LisaConfig {
    /// Transcript to replay; the built-in demo transcript when unset
    pub replay_file: Option<PathBuf>,
    /// Overrides the provider's model id in logs and context
    pub model: Option<String>,
    pub chunk_delay: Duration,
    pub max_attachment_bytes: u64,
    /// `None` starts with an empty history
    pub greeting: Option<String>,
}

impl Default for LisaConfig {
    fn default() -> Self {
        Self {
            replay_file: None,
            model: None,
            chunk_delay: Duration::from_millis(DEFAULT_CHUNK_DELAY_MS),
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
            greeting: Some(DEFAULT_GREETING.to_string()),
        }
    }
}

impl LisaConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let chunk_delay = match parse_number(&lookup, "LISA_CHUNK_DELAY_MS")? {
            Some(ms) => Duration::from_millis(ms),
            None => defaults.chunk_delay,
        };

        let max_attachment_bytes = parse_number(&lookup, "LISA_MAX_ATTACHMENT_BYTES")?
            .unwrap_or(defaults.max_attachment_bytes);

        // Set but empty disables the greeting
        let greeting = match lookup("LISA_GREETING") {
            Some(g) if g.trim().is_empty() => None,
            Some(g) => Some(g),
            None => defaults.greeting,
        };

        Ok(Self {
            replay_file: lookup("LISA_REPLAY_FILE")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            model: lookup("LISA_MODEL").filter(|m| !m.is_empty()),
            chunk_delay,
            max_attachment_bytes,
            greeting,
        })
    }
}

fn parse_number(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u64>, ConfigError> {
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidNumber { var, value })
}
