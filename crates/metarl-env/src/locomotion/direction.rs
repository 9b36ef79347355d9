//! Goal-direction locomotion

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use metarl_core::task::DIRECTION;
use metarl_core::{
    Action, ActionSpace, BoxObservationSpace, Direction, EnvConfig, EnvFamily, Environment,
    RandomDirection, Result, Step, StepInfo, Task, TaskDistribution, TaskEnvironment,
    VectorObservation,
};

use super::{
    default_ctrl_cost_weight, default_forward_reward_weight, default_reset_noise_scale,
    direction_reward, LocomotionBase, LocomotionWeights,
};
use crate::physics::{PlanarCheetah, Simulator};

/// Keyword arguments for [`DirectionLocomotion`]
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectionConfig {
    /// Scale of the velocity term
    #[serde(default = "default_forward_reward_weight")]
    pub forward_reward_weight: f64,
    /// Scale of the squared-action penalty
    #[serde(default = "default_ctrl_cost_weight")]
    pub ctrl_cost_weight: f64,
    /// Half-width of the reset perturbation
    #[serde(default = "default_reset_noise_scale")]
    pub reset_noise_scale: f64,
}

impl Default for DirectionConfig {
    fn default() -> Self {
        Self {
            forward_reward_weight: default_forward_reward_weight(),
            ctrl_cost_weight: default_ctrl_cost_weight(),
            reset_noise_scale: default_reset_noise_scale(),
        }
    }
}

/// Locomotion rewarded for moving in a goal direction.
///
/// `reward = direction * v - ctrl_cost` with `direction` drawn uniformly
/// from {-1, +1}.
pub struct DirectionLocomotion<S> {
    base: LocomotionBase<S>,
    task: Arc<Task>,
    goal_direction: Direction,
}

impl<S: Simulator> DirectionLocomotion<S> {
    const NAME: &'static str = "HalfCheetahDir";

    /// Wrap a simulator; the initial task runs forward
    pub fn new(sim: S, config: &DirectionConfig) -> Result<Self> {
        let weights = LocomotionWeights {
            forward_reward_weight: config.forward_reward_weight,
            ctrl_cost_weight: config.ctrl_cost_weight,
            reset_noise_scale: config.reset_noise_scale,
        };
        Ok(Self {
            base: LocomotionBase::new(Self::NAME, sim, weights)?,
            task: Arc::new(Task::direction(Direction::Forward)),
            goal_direction: Direction::Forward,
        })
    }

    /// Active goal direction
    #[must_use]
    pub fn goal_direction(&self) -> Direction {
        self.goal_direction
    }

    /// Shared locomotion state
    #[must_use]
    pub fn base(&self) -> &LocomotionBase<S> {
        &self.base
    }
}

impl DirectionLocomotion<PlanarCheetah> {
    /// Planar half-cheetah built from keyword arguments, applying the config seed
    pub fn from_config(config: &EnvConfig) -> Result<Self> {
        let kwargs: DirectionConfig = config.parse()?;
        let mut env = Self::new(PlanarCheetah::new(), &kwargs)?;
        env.seed(config.seed);
        Ok(env)
    }
}

#[async_trait]
impl<S: Simulator> Environment for DirectionLocomotion<S> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn family(&self) -> EnvFamily {
        EnvFamily::Locomotion
    }

    fn observation_space(&self) -> BoxObservationSpace {
        self.base.observation_space()
    }

    fn action_space(&self) -> ActionSpace {
        self.base.action_space()
    }

    fn seed(&mut self, seed: Option<u64>) -> u64 {
        self.base.seed(seed)
    }

    async fn reset(&mut self) -> Result<(VectorObservation, StepInfo)> {
        let observation = self.base.reset()?;
        Ok((observation, StepInfo::with_task(&self.task)?))
    }

    async fn step(&mut self, action: &Action) -> Result<Step> {
        let motion = self.base.advance(action)?;
        let reward_forward = direction_reward(
            motion.forward_velocity,
            self.goal_direction.sign(),
            self.base.weights().forward_reward_weight,
        );
        self.base.finish(motion, reward_forward, &self.task)
    }

    async fn close(&mut self) -> Result<()> {
        self.base.close();
        Ok(())
    }
}

impl<S: Simulator> TaskEnvironment for DirectionLocomotion<S> {
    fn sample_tasks(&mut self, num_tasks: usize) -> Vec<Task> {
        RandomDirection.sample_tasks(self.base.rng(), num_tasks)
    }

    fn reset_task(&mut self, task: &Task) -> Result<()> {
        let direction = task.scalar(Self::NAME, DIRECTION)?;
        self.goal_direction = Direction::try_from(direction)?;
        self.task = Arc::new(task.clone());
        Ok(())
    }

    fn task(&self) -> Arc<Task> {
        Arc::clone(&self.task)
    }
}
