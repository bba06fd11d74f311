//! Bridge configuration.
//!
//! Loaded from an optional YAML file, then overridden by command-line flags
//! (which also carry their environment fallbacks).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::discovery::{DEFAULT_TTL, DiscoveryCache};
use crate::dispatch::Dispatcher;
use crate::runner::ProcessRunner;
use crate::schema::ToolNaming;
use crate::target::{TargetSpec, parse_target};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Command line of the wrapped CLI, e.g. `glab` or `docker compose`.
    #[serde(default = "default_program")]
    pub program: String,

    /// Tool-name prefix. Defaults to the program's file name.
    #[serde(default)]
    pub tool_prefix: Option<String>,

    #[serde(default = "default_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Server name shown to MCP clients.
    #[serde(default = "default_server_name")]
    pub server_name: String,
}

fn default_program() -> String {
    "glab".to_string()
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL.as_secs()
}

fn default_server_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            tool_prefix: None,
            cache_ttl_secs: default_ttl_secs(),
            server_name: default_server_name(),
        }
    }
}

/// Values supplied on the command line; `None` leaves the file/default value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub program: Option<String>,
    pub tool_prefix: Option<String>,
    pub cache_ttl_secs: Option<u64>,
}

impl BridgeConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("invalid configuration")
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// File (if any) first, then overrides on top.
    pub fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::default(),
        };
        if let Some(program) = overrides.program {
            config.program = program;
        }
        if let Some(prefix) = overrides.tool_prefix {
            config.tool_prefix = Some(prefix);
        }
        if let Some(ttl) = overrides.cache_ttl_secs {
            config.cache_ttl_secs = ttl;
        }
        tracing::debug!(?config, "configuration resolved");
        Ok(config)
    }

    pub fn target(&self) -> Result<TargetSpec> {
        parse_target(&self.program)
            .with_context(|| format!("invalid program '{}'", self.program))
    }

    pub fn naming(&self, target: &TargetSpec) -> ToolNaming {
        match self.tool_prefix.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(prefix) => ToolNaming::new(prefix.trim()),
            None => ToolNaming::new(target.display_name()),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Wire runner, cache and naming together for this configuration.
    pub fn build_dispatcher(&self) -> Result<Dispatcher> {
        let target = self.target()?;
        let naming = self.naming(&target);
        let runner = Arc::new(ProcessRunner::new(target));
        let cache = Arc::new(DiscoveryCache::new(runner.clone(), self.cache_ttl()));
        Ok(Dispatcher::new(runner, cache, naming))
    }
}
