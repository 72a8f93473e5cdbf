// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Agent tracing configuration

use crate::{ConfigError, ConfigResult};
use ordermap::OrderMap;
use serde::Deserialize;
use std::str::FromStr;
use tracectl::DEFAULT_DEFAULT_LOGLEVEL;
use tracectl::{LevelFilter, get_trace_ctl};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "RawTracingConfig")]
pub struct TracingConfig {
    pub default: LevelFilter,
    pub tags: OrderMap<String, LevelFilter>,
}

/// Tracing configuration as written in the configuration file, levels as strings
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTracingConfig {
    #[serde(default)]
    default: Option<String>,
    #[serde(default)]
    tags: OrderMap<String, String>,
}

fn parse_level(level: &str) -> Result<LevelFilter, String> {
    LevelFilter::from_str(level).map_err(|_| format!("bad tracing level '{level}'"))
}

impl TryFrom<RawTracingConfig> for TracingConfig {
    type Error = String;
    fn try_from(raw: RawTracingConfig) -> Result<Self, Self::Error> {
        let mut config = match raw.default {
            Some(level) => TracingConfig::new(parse_level(&level)?),
            None => TracingConfig::default(),
        };
        for (tag, level) in &raw.tags {
            config.add_tag(tag, parse_level(level)?);
        }
        Ok(config)
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default: DEFAULT_DEFAULT_LOGLEVEL,
            tags: OrderMap::new(),
        }
    }
}
impl TracingConfig {
    #[must_use]
    pub fn new(default: LevelFilter) -> Self {
        Self {
            default,
            tags: OrderMap::new(),
        }
    }
    pub fn add_tag(&mut self, tag: &str, level: LevelFilter) {
        let _ = self.tags.insert(tag.to_string(), level);
    }
    pub fn validate(&self) -> ConfigResult {
        debug!("Validating tracing configuration..");
        let tags: Vec<&str> = self.tags.keys().map(String::as_str).collect();
        get_trace_ctl()
            .check_tags(&tags)
            .map_err(ConfigError::from)
    }
    /// Set the levels of the tracing control to those of this configuration
    pub fn apply(&self) -> ConfigResult {
        self.validate()?;
        let ctl = get_trace_ctl();
        ctl.set_default_level(self.default);
        for (tag, level) in &self.tags {
            ctl.set_tag_level(tag, *level);
        }
        Ok(())
    }
}
