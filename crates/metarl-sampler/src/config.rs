//! Sampler configuration

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use metarl_core::{EnvConfig, RLError, Result};

fn default_num_workers() -> usize {
    1
}

/// Everything a sampler needs besides the policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplerConfig {
    /// Registered environment id
    pub env_name: String,
    /// Keyword arguments forwarded to the environment constructor
    #[serde(default)]
    pub env_kwargs: EnvConfig,
    /// Trajectories per sampled batch
    pub batch_size: usize,
    /// Seed for the template environment and the worker seed stream
    #[serde(default)]
    pub seed: Option<u64>,
    /// Hard cap on episode length, on top of any environment time limit
    #[serde(default)]
    pub max_episode_steps: Option<usize>,
    /// Concurrent worker environments
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
}

impl SamplerConfig {
    /// Config for `env_name` with default keyword arguments and one worker
    pub fn new(env_name: impl Into<String>, batch_size: usize) -> Self {
        Self {
            env_name: env_name.into(),
            env_kwargs: EnvConfig::default(),
            batch_size,
            seed: None,
            max_episode_steps: None,
            num_workers: default_num_workers(),
        }
    }

    /// Set the environment keyword arguments
    #[must_use]
    pub fn with_env_kwargs(mut self, env_kwargs: EnvConfig) -> Self {
        self.env_kwargs = env_kwargs;
        self
    }

    /// Set the seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the episode length cap
    #[must_use]
    pub fn with_max_episode_steps(mut self, max_episode_steps: usize) -> Self {
        self.max_episode_steps = Some(max_episode_steps);
        self
    }

    /// Set the number of workers
    #[must_use]
    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    /// Check the numeric fields
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(RLError::InvalidConfig("batch_size must be at least 1".to_string()));
        }
        if self.num_workers == 0 {
            return Err(RLError::InvalidConfig("num_workers must be at least 1".to_string()));
        }
        if self.max_episode_steps == Some(0) {
            return Err(RLError::InvalidConfig(
                "max_episode_steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| RLError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read sampler config {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse sampler config {}", path.display()))
    }
}
