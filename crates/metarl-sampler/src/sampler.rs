//! Sampler contract and shared sampler state

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use metarl_core::{
    ActionSpace, BoxObservationSpace, BoxedTaskEnv, EnvFamily, Environment, RLError, Result,
    SharedPolicy, Task, TaskEnvironment, Trajectory, TrajectoryBatch,
};
use metarl_env::EnvConstructor;

use crate::config::SamplerConfig;

// Keeps worker seeds apart from the template environment's task stream
const WORKER_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Construction-time state shared by every sampler.
///
/// Holds a template environment that is closed right after its spaces are
/// read; it stays around only as a task source. Rollouts run on fresh worker
/// environments from [`acquire_env`](Self::acquire_env).
pub struct SamplerBase {
    config: SamplerConfig,
    policy: SharedPolicy,
    constructor: EnvConstructor,
    template: Mutex<BoxedTaskEnv>,
    observation_space: BoxObservationSpace,
    action_space: ActionSpace,
    family: EnvFamily,
    seed: u64,
    worker_seeds: Mutex<StdRng>,
}

impl SamplerBase {
    /// Resolve, build, seed and close the template environment.
    ///
    /// Fails immediately for unknown environment names or bad keyword
    /// arguments, and for locomotion environments with no step limit from
    /// the sampler, the keyword arguments or the registration. When `env` is given it is used as the template instead of
    /// building one, but `config.env_name` must still be registered since
    /// worker environments are built from it.
    pub async fn new(
        config: SamplerConfig,
        policy: SharedPolicy,
        env: Option<BoxedTaskEnv>,
    ) -> Result<Self> {
        config.validate()?;
        let constructor = metarl_env::constructor(&config.env_name)?;
        let mut env = match env {
            Some(env) => env,
            None => constructor.make(&config.env_kwargs)?,
        };

        let seed = env.seed(config.seed);
        let observation_space = env.observation_space();
        let action_space = env.action_space();
        let family = env.family();
        env.close().await?;

        let step_limit = config
            .max_episode_steps
            .or(config.env_kwargs.max_steps)
            .or(constructor.max_episode_steps());
        if family == EnvFamily::Locomotion && step_limit.is_none() {
            return Err(RLError::InvalidConfig(format!(
                "{}: locomotion episodes never end on their own; set max_episode_steps",
                config.env_name
            )));
        }

        info!(
            env = %config.env_name,
            batch_size = config.batch_size,
            num_workers = config.num_workers,
            seed,
            "sampler ready"
        );

        Ok(Self {
            constructor,
            template: Mutex::new(env),
            observation_space,
            action_space,
            family,
            seed,
            worker_seeds: Mutex::new(StdRng::seed_from_u64(seed ^ WORKER_SEED_SALT)),
            config,
            policy,
        })
    }

    /// Sampler configuration
    #[must_use]
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Shared handle to the policy
    #[must_use]
    pub fn policy(&self) -> SharedPolicy {
        Arc::clone(&self.policy)
    }

    /// Observation space of the environment
    #[must_use]
    pub fn observation_space(&self) -> &BoxObservationSpace {
        &self.observation_space
    }

    /// Action space of the environment
    #[must_use]
    pub fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }

    /// Environment family
    #[must_use]
    pub fn family(&self) -> EnvFamily {
        self.family
    }

    /// Seed actually applied to the template environment
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draw tasks from the environment's task distribution
    pub fn sample_tasks(&self, num_tasks: usize) -> Vec<Task> {
        self.template
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sample_tasks(num_tasks)
    }

    /// Build a fresh worker environment with the next seed of the worker stream
    pub fn acquire_env(&self) -> Result<BoxedTaskEnv> {
        let seed = self
            .worker_seeds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen::<u64>();
        let mut env = self.constructor.make(&self.config.env_kwargs)?;
        env.seed(Some(seed));
        debug!(env = %self.config.env_name, seed, "acquired worker environment");
        Ok(env)
    }
}

/// Produces batches of trajectories for a given task.
///
/// Implementors provide [`sample_async`](Self::sample_async); the blocking
/// forms are built on it.
#[async_trait]
pub trait Sampler: Send + Sync {
    /// Shared sampler state
    fn base(&self) -> &SamplerBase;

    /// Start sampling `batch_size` trajectories under `task`
    async fn sample_async(&self, task: &Task) -> Result<PendingBatch>;

    /// Sample `batch_size` trajectories under `task` and wait for them
    async fn sample(&self, task: &Task) -> Result<TrajectoryBatch> {
        self.sample_async(task).await?.join().await
    }

    /// Sample one batch per task; all batches are started before any is awaited
    async fn sample_many(&self, tasks: &[Task]) -> Result<Vec<TrajectoryBatch>> {
        let mut pending = Vec::with_capacity(tasks.len());
        for task in tasks {
            pending.push(self.sample_async(task).await?);
        }
        let mut batches = Vec::with_capacity(pending.len());
        for batch in pending {
            batches.push(batch.join().await?);
        }
        Ok(batches)
    }
}

#[async_trait]
impl Sampler for SamplerBase {
    fn base(&self) -> &SamplerBase {
        self
    }

    async fn sample_async(&self, _task: &Task) -> Result<PendingBatch> {
        Err(RLError::NotImplemented("sample_async"))
    }
}

/// A batch whose trajectories are still being collected.
///
/// Workers each produce a contiguous run of batch indices and are stored in
/// index order. Dropping an unjoined batch aborts its workers.
pub struct PendingBatch {
    task: Arc<Task>,
    batch_size: usize,
    workers: Vec<JoinHandle<Result<Vec<Trajectory>>>>,
}

impl PendingBatch {
    /// Wrap ordered worker handles for a batch of `batch_size` under `task`
    #[must_use]
    pub fn new(
        task: Arc<Task>,
        batch_size: usize,
        workers: Vec<JoinHandle<Result<Vec<Trajectory>>>>,
    ) -> Self {
        Self {
            task,
            batch_size,
            workers,
        }
    }

    /// Task the batch is sampled under
    #[must_use]
    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    /// Whether every worker has finished
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.workers.iter().all(JoinHandle::is_finished)
    }

    /// Wait for all workers and assemble the batch in index order.
    ///
    /// The first failing worker aborts the rest and its error is returned.
    pub async fn join(mut self) -> Result<TrajectoryBatch> {
        let mut workers = std::mem::take(&mut self.workers).into_iter();
        let mut batch = TrajectoryBatch::new(Arc::clone(&self.task));

        while let Some(worker) = workers.next() {
            let outcome = match worker.await {
                Ok(outcome) => outcome,
                Err(e) => Err(RLError::Worker(e.to_string())),
            };
            match outcome {
                Ok(chunk) => batch.trajectories.extend(chunk),
                Err(err) => {
                    for sibling in workers.by_ref() {
                        sibling.abort();
                    }
                    warn!(task = %self.task, error = %err, "sampling worker failed");
                    return Err(err);
                }
            }
        }

        let ordered = batch
            .trajectories
            .iter()
            .enumerate()
            .all(|(i, t)| t.index == i);
        if batch.len() != self.batch_size || !ordered {
            return Err(RLError::Worker(format!(
                "expected trajectories 0..{} in order, got {}",
                self.batch_size,
                batch.len()
            )));
        }

        info!(
            task = %self.task,
            trajectories = batch.len(),
            avg_reward = batch.avg_reward(),
            "batch complete"
        );
        Ok(batch)
    }
}

impl Drop for PendingBatch {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}
