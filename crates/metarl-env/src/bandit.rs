//! Multi-armed bandit environments
//!
//! Single-step "contextual" bandits: the observation is always the zero
//! vector and every episode ends after one pull, so all task information is
//! latent in the reward distribution and must be inferred from reward history.

use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand_distr::{Bernoulli, Distribution, Normal};
use serde::Deserialize;
use tracing::debug;

use metarl_core::seeding::rng_from_seed;
use metarl_core::task::MEAN;
use metarl_core::{
    Action, ActionSpace, BoxObservationSpace, DiscreteSpace, EnvConfig, EnvFamily, Environment,
    EpisodePhase, RLError, Result, Reward, Step, StepInfo, Task, TaskDistribution,
    TaskEnvironment, UniformMeans, VectorObservation,
};

/// Keyword arguments for [`BernoulliBandit`]
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BernoulliBanditConfig {
    /// Number of arms
    pub k: usize,
}

/// Keyword arguments for [`GaussianBandit`]
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GaussianBanditConfig {
    /// Number of arms
    pub k: usize,
    /// Reward standard deviation, shared by all arms and tasks
    #[serde(default = "default_std")]
    pub std: f64,
}

fn default_std() -> f64 {
    1.0
}

fn check_arms(k: usize) -> Result<()> {
    if k == 0 {
        return Err(RLError::InvalidConfig("a bandit needs at least one arm".to_string()));
    }
    Ok(())
}

/// Extract and validate the `mean` vector of a bandit task
fn task_means(env: &str, task: &Task, k: usize, probabilities: bool) -> Result<Vec<f64>> {
    let means = task.vector(env, MEAN)?;
    if means.len() != k {
        return Err(RLError::InvalidTask(format!(
            "{env} has {k} arms but the task provides {} means",
            means.len()
        )));
    }
    if let Some(bad) = means.iter().find(|m| !m.is_finite()) {
        return Err(RLError::InvalidTask(format!("{env}: non-finite mean {bad}")));
    }
    if probabilities {
        if let Some(bad) = means.iter().find(|m| !(0.0..=1.0).contains(*m)) {
            return Err(RLError::InvalidTask(format!(
                "{env}: mean {bad} is not a probability"
            )));
        }
    }
    Ok(means.to_vec())
}

/// Resolve the pulled arm, rejecting anything outside `Discrete(k)`
fn pulled_arm(env: &str, action: &Action, k: usize) -> Result<usize> {
    match action.as_discrete() {
        Some(arm) if arm < k => Ok(arm),
        Some(arm) => Err(RLError::InvalidAction(format!(
            "{env}: arm {arm} outside Discrete({k})"
        ))),
        None => Err(RLError::InvalidAction(format!(
            "{env}: expected a discrete action, got {action:?}"
        ))),
    }
}

/// Multi-armed bandit with Bernoulli rewards.
///
/// Pulling arm `i` yields reward 1 with probability `mean[i]` and 0
/// otherwise. Tasks draw every `mean[i]` from Uniform\[0, 1).
pub struct BernoulliBandit {
    k: usize,
    task: Arc<Task>,
    means: Vec<f64>,
    rng: StdRng,
    phase: EpisodePhase,
}

impl BernoulliBandit {
    const NAME: &'static str = "BernoulliBandit";

    /// Create a bandit with `k` arms, all at mean 0.5, seeded from the OS
    pub fn new(k: usize) -> Result<Self> {
        check_arms(k)?;
        let (rng, _) = rng_from_seed(None);
        let means = vec![0.5; k];
        Ok(Self {
            k,
            task: Arc::new(Task::means(means.clone())),
            means,
            rng,
            phase: EpisodePhase::Uninitialized,
        })
    }

    /// Create a bandit from keyword arguments, applying the config seed
    pub fn from_config(config: &EnvConfig) -> Result<Self> {
        let kwargs: BernoulliBanditConfig = config.parse()?;
        let mut env = Self::new(kwargs.k)?;
        env.seed(config.seed);
        Ok(env)
    }

    /// Number of arms
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }
}

#[async_trait]
impl Environment for BernoulliBandit {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn family(&self) -> EnvFamily {
        EnvFamily::Bandit
    }

    fn observation_space(&self) -> BoxObservationSpace {
        BoxObservationSpace::zero_point()
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::Discrete(DiscreteSpace::new(self.k))
    }

    fn seed(&mut self, seed: Option<u64>) -> u64 {
        let (rng, seed) = rng_from_seed(seed);
        self.rng = rng;
        debug!(env = Self::NAME, seed, "seeded environment");
        seed
    }

    async fn reset(&mut self) -> Result<(VectorObservation, StepInfo)> {
        self.phase = EpisodePhase::Ready;
        Ok((VectorObservation::zeros(1), StepInfo::with_task(&self.task)?))
    }

    async fn step(&mut self, action: &Action) -> Result<Step> {
        let arm = pulled_arm(Self::NAME, action, self.k)?;
        self.phase.ensure_steppable(Self::NAME)?;

        let law = Bernoulli::new(self.means[arm])
            .map_err(|e| RLError::InvalidTask(format!("{}: {e}", Self::NAME)))?;
        let reward = if law.sample(&mut self.rng) { 1.0 } else { 0.0 };
        self.phase = EpisodePhase::Terminal;

        Ok(Step {
            observation: VectorObservation::zeros(1),
            reward: Reward::from(reward),
            done: true,
            truncated: false,
            info: StepInfo::with_task(&self.task)?,
        })
    }
}

impl TaskEnvironment for BernoulliBandit {
    fn sample_tasks(&mut self, num_tasks: usize) -> Vec<Task> {
        UniformMeans { k: self.k }.sample_tasks(&mut self.rng, num_tasks)
    }

    fn reset_task(&mut self, task: &Task) -> Result<()> {
        self.means = task_means(Self::NAME, task, self.k, true)?;
        self.task = Arc::new(task.clone());
        Ok(())
    }

    fn task(&self) -> Arc<Task> {
        Arc::clone(&self.task)
    }
}

/// Multi-armed bandit with Gaussian rewards.
///
/// Pulling arm `i` yields a reward drawn from Normal(`mean[i]`, `std`), with
/// `std` fixed across all tasks. Tasks draw every `mean[i]` from Uniform\[0, 1).
pub struct GaussianBandit {
    k: usize,
    std: f64,
    task: Arc<Task>,
    means: Vec<f64>,
    rng: StdRng,
    phase: EpisodePhase,
}

impl GaussianBandit {
    const NAME: &'static str = "GaussianBandit";

    /// Create a bandit with `k` arms and reward deviation `std`, seeded from the OS
    pub fn new(k: usize, std: f64) -> Result<Self> {
        check_arms(k)?;
        if !(std.is_finite() && std >= 0.0) {
            return Err(RLError::InvalidConfig(format!(
                "reward std must be finite and non-negative, got {std}"
            )));
        }
        let (rng, _) = rng_from_seed(None);
        let means = vec![0.5; k];
        Ok(Self {
            k,
            std,
            task: Arc::new(Task::means(means.clone())),
            means,
            rng,
            phase: EpisodePhase::Uninitialized,
        })
    }

    /// Create a bandit from keyword arguments, applying the config seed
    pub fn from_config(config: &EnvConfig) -> Result<Self> {
        let kwargs: GaussianBanditConfig = config.parse()?;
        let mut env = Self::new(kwargs.k, kwargs.std)?;
        env.seed(config.seed);
        Ok(env)
    }

    /// Number of arms
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Reward standard deviation
    #[must_use]
    pub fn std(&self) -> f64 {
        self.std
    }
}

#[async_trait]
impl Environment for GaussianBandit {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn family(&self) -> EnvFamily {
        EnvFamily::Bandit
    }

    fn observation_space(&self) -> BoxObservationSpace {
        BoxObservationSpace::zero_point()
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::Discrete(DiscreteSpace::new(self.k))
    }

    fn seed(&mut self, seed: Option<u64>) -> u64 {
        let (rng, seed) = rng_from_seed(seed);
        self.rng = rng;
        debug!(env = Self::NAME, seed, "seeded environment");
        seed
    }

    async fn reset(&mut self) -> Result<(VectorObservation, StepInfo)> {
        self.phase = EpisodePhase::Ready;
        Ok((VectorObservation::zeros(1), StepInfo::with_task(&self.task)?))
    }

    async fn step(&mut self, action: &Action) -> Result<Step> {
        let arm = pulled_arm(Self::NAME, action, self.k)?;
        self.phase.ensure_steppable(Self::NAME)?;

        let law = Normal::new(self.means[arm], self.std)
            .map_err(|e| RLError::InvalidTask(format!("{}: {e}", Self::NAME)))?;
        let reward = law.sample(&mut self.rng);
        self.phase = EpisodePhase::Terminal;

        Ok(Step {
            observation: VectorObservation::zeros(1),
            reward: Reward::from(reward),
            done: true,
            truncated: false,
            info: StepInfo::with_task(&self.task)?,
        })
    }
}

impl TaskEnvironment for GaussianBandit {
    fn sample_tasks(&mut self, num_tasks: usize) -> Vec<Task> {
        UniformMeans { k: self.k }.sample_tasks(&mut self.rng, num_tasks)
    }

    fn reset_task(&mut self, task: &Task) -> Result<()> {
        self.means = task_means(Self::NAME, task, self.k, false)?;
        self.task = Arc::new(task.clone());
        Ok(())
    }

    fn task(&self) -> Arc<Task> {
        Arc::clone(&self.task)
    }
}
