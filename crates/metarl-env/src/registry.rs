//! Environment registry for creating environments by name

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, info};

use metarl_core::{BoxedTaskEnv, EnvConfig, RLError, Result};

use crate::bandit::{BernoulliBandit, GaussianBandit};
use crate::locomotion::{DirectionLocomotion, VelocityLocomotion};
use crate::wrappers::TimeLimit;

type BuildFn = dyn Fn(&EnvConfig) -> Result<BoxedTaskEnv> + Send + Sync;

/// Default episode length of the registered locomotion environments
pub const LOCOMOTION_MAX_EPISODE_STEPS: usize = 200;

lazy_static::lazy_static! {
    static ref REGISTRY: RwLock<EnvRegistry> = RwLock::new(EnvRegistry::with_defaults());
}

/// Registered recipe for one environment id.
///
/// Cheap to clone; samplers hold one to build worker environments.
#[derive(Clone)]
pub struct EnvConstructor {
    id: String,
    max_episode_steps: Option<usize>,
    build: Arc<BuildFn>,
}

impl EnvConstructor {
    /// Registered id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Time limit applied when the config does not set one
    #[must_use]
    pub fn max_episode_steps(&self) -> Option<usize> {
        self.max_episode_steps
    }

    /// Build and seed an environment, wrapping it in a [`TimeLimit`] when a limit applies
    pub fn make(&self, config: &EnvConfig) -> Result<BoxedTaskEnv> {
        let env = (self.build)(config)?;
        let env = match config.max_steps.or(self.max_episode_steps) {
            Some(limit) => Box::new(TimeLimit::new(env, limit)?) as BoxedTaskEnv,
            None => env,
        };
        debug!(
            env = %self.id,
            seed = ?config.seed,
            max_steps = ?config.max_steps.or(self.max_episode_steps),
            "made environment"
        );
        Ok(env)
    }
}

impl fmt::Debug for EnvConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvConstructor")
            .field("id", &self.id)
            .field("max_episode_steps", &self.max_episode_steps)
            .finish_non_exhaustive()
    }
}

/// Mapping from environment ids to constructors
pub struct EnvRegistry {
    envs: HashMap<String, EnvConstructor>,
}

impl EnvRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            envs: HashMap::new(),
        }
    }

    /// Registry holding the bundled bandit and locomotion environments
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        for k in [5_u64, 10, 50] {
            registry.register(format!("Bandit-K{k}-v0"), None, move |config| {
                let config = with_default_param(config, "k", Value::from(k));
                Ok(Box::new(BernoulliBandit::from_config(&config)?) as BoxedTaskEnv)
            });
        }
        registry.register("BernoulliBandit-v0", None, |config| {
            Ok(Box::new(BernoulliBandit::from_config(config)?) as BoxedTaskEnv)
        });
        registry.register("GaussianBandit-v0", None, |config| {
            Ok(Box::new(GaussianBandit::from_config(config)?) as BoxedTaskEnv)
        });
        registry.register(
            "HalfCheetahVel-v2",
            Some(LOCOMOTION_MAX_EPISODE_STEPS),
            |config| Ok(Box::new(VelocityLocomotion::from_config(config)?) as BoxedTaskEnv),
        );
        registry.register(
            "HalfCheetahDir-v2",
            Some(LOCOMOTION_MAX_EPISODE_STEPS),
            |config| Ok(Box::new(DirectionLocomotion::from_config(config)?) as BoxedTaskEnv),
        );

        registry
    }

    /// Register an environment, replacing any previous registration under `name`.
    ///
    /// The constructor receives the full config, seed included, and is
    /// expected to apply the seed itself.
    pub fn register<F>(&mut self, name: impl Into<String>, max_episode_steps: Option<usize>, build: F)
    where
        F: Fn(&EnvConfig) -> Result<BoxedTaskEnv> + Send + Sync + 'static,
    {
        let id = name.into();
        let constructor = EnvConstructor {
            id: id.clone(),
            max_episode_steps,
            build: Arc::new(build),
        };
        if self.envs.insert(id.clone(), constructor).is_some() {
            debug!(env = %id, "replaced environment registration");
        }
    }

    /// Look up the constructor for `name`
    pub fn constructor(&self, name: &str) -> Result<EnvConstructor> {
        self.envs
            .get(name)
            .cloned()
            .ok_or_else(|| RLError::UnknownEnvironment(name.to_string()))
    }

    /// Create an environment by name
    pub fn make(&self, name: &str, config: &EnvConfig) -> Result<BoxedTaskEnv> {
        self.constructor(name)?.make(config)
    }

    /// Registered ids, sorted
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.envs.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for EnvRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn with_default_param(config: &EnvConfig, key: &str, value: Value) -> EnvConfig {
    let mut config = config.clone();
    config.params.entry(key).or_insert(value);
    config
}

/// Register an environment globally.
///
/// Locomotion environments never end an episode themselves, so samplers
/// refuse them unless `max_episode_steps` or a per-run limit is set.
pub fn register_env<F>(name: impl Into<String>, max_episode_steps: Option<usize>, build: F)
where
    F: Fn(&EnvConfig) -> Result<BoxedTaskEnv> + Send + Sync + 'static,
{
    let name = name.into();
    info!(env = %name, "registering environment");
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(name, max_episode_steps, build);
}

/// Look up a globally registered constructor
pub fn constructor(name: &str) -> Result<EnvConstructor> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .constructor(name)
}

/// Create a globally registered environment by name
pub fn make_env(name: &str, config: &EnvConfig) -> Result<BoxedTaskEnv> {
    // Clone the constructor out so building never holds the lock
    constructor(name)?.make(config)
}

/// List all registered environments
#[must_use]
pub fn list_envs() -> Vec<String> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .list()
}
