//! Environment traits and types

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Action, ActionSpace, BoxObservationSpace, RLError, Reward, Task, VectorObservation};

/// Info key under which every step echoes the active task
pub const TASK_KEY: &str = "task";

/// Result of a single environment step
#[derive(Debug, Clone)]
pub struct Step {
    /// Observation from the environment
    pub observation: VectorObservation,
    /// Reward signal
    pub reward: Reward,
    /// Whether the episode is done
    pub done: bool,
    /// Whether the episode was truncated (e.g., time limit).
    ///
    /// Always `false` for the bandit family, whose steps carry no truncation.
    pub truncated: bool,
    /// Additional info from the environment
    pub info: StepInfo,
}

impl Step {
    /// Whether this step ends the episode for any reason
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.done || self.truncated
    }
}

/// Additional information from a step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Custom fields
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl StepInfo {
    /// Info holding only the active task
    pub fn with_task(task: &Task) -> crate::Result<Self> {
        let mut info = Self::default();
        info.insert(TASK_KEY, task)?;
        Ok(info)
    }

    /// Insert a serializable value
    pub fn insert<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> crate::Result<()> {
        self.fields
            .insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Raw field lookup
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }

    /// Numeric field lookup
    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(serde_json::Value::as_f64)
    }

    /// The task echoed by the environment, if any
    pub fn task(&self) -> crate::Result<Option<Task>> {
        self.fields
            .get(TASK_KEY)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(RLError::from)
    }
}

/// Environment sub-family; the two differ in step semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvFamily {
    /// Single-step discrete-action bandits (4-tuple steps)
    Bandit,
    /// Multi-step physics-backed locomotion (5-tuple steps)
    Locomotion,
}

/// Episode state machine shared by all environments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EpisodePhase {
    /// Never reset
    #[default]
    Uninitialized,
    /// Reset, no step taken yet
    Ready,
    /// At least one non-terminal step taken
    Running,
    /// Episode ended
    Terminal,
}

impl EpisodePhase {
    /// Fail unless a step may be taken from this phase
    pub fn ensure_steppable(self, env: &str) -> crate::Result<()> {
        match self {
            Self::Ready | Self::Running => Ok(()),
            Self::Uninitialized => Err(RLError::InvalidState(format!(
                "{env}: step called before reset"
            ))),
            Self::Terminal => Err(RLError::InvalidState(format!(
                "{env}: step called on a finished episode; call reset first"
            ))),
        }
    }
}

/// Construction parameters for environments (`env_kwargs`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Random seed
    #[serde(default)]
    pub seed: Option<u64>,
    /// Maximum episode steps; overrides a registration's time limit
    #[serde(default)]
    pub max_steps: Option<usize>,
    /// Variant-specific keyword arguments
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl EnvConfig {
    /// Empty configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a keyword argument
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Set the seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the time limit
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Deserialize the keyword arguments into a typed variant config
    pub fn parse<T: DeserializeOwned>(&self) -> crate::Result<T> {
        serde_json::from_value(serde_json::Value::Object(self.params.clone()))
            .map_err(|e| RLError::InvalidConfig(e.to_string()))
    }
}

/// Core environment trait: the classic reset/step protocol
#[async_trait]
pub trait Environment: Send + Sync {
    /// Variant name, used in diagnostics
    fn name(&self) -> &'static str;

    /// Sub-family, for callers that dispatch on step semantics
    fn family(&self) -> EnvFamily;

    /// Get the observation space
    fn observation_space(&self) -> BoxObservationSpace;

    /// Get the action space
    fn action_space(&self) -> ActionSpace;

    /// Reseed the environment-owned random source; returns the seed used
    fn seed(&mut self, seed: Option<u64>) -> u64;

    /// Start a new episode under the active task
    async fn reset(&mut self) -> crate::Result<(VectorObservation, StepInfo)>;

    /// Take a step in the environment
    async fn step(&mut self, action: &Action) -> crate::Result<Step>;

    /// Release simulator resources
    async fn close(&mut self) -> crate::Result<()> {
        Ok(())
    }
}

/// Environment whose reward/transition law is parameterized by a [`Task`]
pub trait TaskEnvironment: Environment {
    /// Draw tasks from this variant's prior using the environment's own random source
    fn sample_tasks(&mut self, num_tasks: usize) -> Vec<Task>;

    /// Replace the active task wholesale.
    ///
    /// Legal in any episode phase and does not change it.
    fn reset_task(&mut self, task: &Task) -> crate::Result<()>;

    /// The active task
    fn task(&self) -> Arc<Task>;
}

/// Type-erased task-conditioned environment
pub type BoxedTaskEnv = Box<dyn TaskEnvironment>;

#[async_trait]
impl<E: Environment + ?Sized> Environment for Box<E> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn family(&self) -> EnvFamily {
        (**self).family()
    }

    fn observation_space(&self) -> BoxObservationSpace {
        (**self).observation_space()
    }

    fn action_space(&self) -> ActionSpace {
        (**self).action_space()
    }

    fn seed(&mut self, seed: Option<u64>) -> u64 {
        (**self).seed(seed)
    }

    async fn reset(&mut self) -> crate::Result<(VectorObservation, StepInfo)> {
        (**self).reset().await
    }

    async fn step(&mut self, action: &Action) -> crate::Result<Step> {
        (**self).step(action).await
    }

    async fn close(&mut self) -> crate::Result<()> {
        (**self).close().await
    }
}

impl<E: TaskEnvironment + ?Sized> TaskEnvironment for Box<E> {
    fn sample_tasks(&mut self, num_tasks: usize) -> Vec<Task> {
        (**self).sample_tasks(num_tasks)
    }

    fn reset_task(&mut self, task: &Task) -> crate::Result<()> {
        (**self).reset_task(task)
    }

    fn task(&self) -> Arc<Task> {
        (**self).task()
    }
}
