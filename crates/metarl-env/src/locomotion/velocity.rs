//! Goal-velocity locomotion

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use metarl_core::task::VELOCITY;
use metarl_core::{
    Action, ActionSpace, BoxObservationSpace, EnvConfig, EnvFamily, Environment, RLError, Result,
    Step, StepInfo, Task, TaskDistribution, TaskEnvironment, UniformVelocity, VectorObservation,
};

use super::{
    default_ctrl_cost_weight, default_forward_reward_weight, default_reset_noise_scale,
    velocity_reward, LocomotionBase, LocomotionWeights,
};
use crate::physics::{PlanarCheetah, Simulator};

/// Keyword arguments for [`VelocityLocomotion`]
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VelocityConfig {
    /// Lower bound of the goal-velocity prior
    #[serde(default)]
    pub low: f64,
    /// Upper bound of the goal-velocity prior
    #[serde(default = "default_high")]
    pub high: f64,
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

/// Goal velocity of a freshly constructed environment
pub const DEFAULT_GOAL_VELOCITY: f64 = 1.0;

fn default_high() -> f64 {
    2.0
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            low: 0.0,
            high: default_high(),
            forward_reward_weight: default_forward_reward_weight(),
            ctrl_cost_weight: default_ctrl_cost_weight(),
            reset_noise_scale: default_reset_noise_scale(),
        }
    }
}

impl VelocityConfig {
    fn weights(&self) -> LocomotionWeights {
        LocomotionWeights {
            forward_reward_weight: self.forward_reward_weight,
            ctrl_cost_weight: self.ctrl_cost_weight,
            reset_noise_scale: self.reset_noise_scale,
        }
    }
}

/// Locomotion rewarded for matching a goal forward velocity.
///
/// `reward = -|v - goal_velocity| - ctrl_cost`, with goals drawn from
/// Uniform\[low, high).
pub struct VelocityLocomotion<S> {
    base: LocomotionBase<S>,
    distribution: UniformVelocity,
    task: Arc<Task>,
    goal_velocity: f64,
}

impl<S: Simulator> VelocityLocomotion<S> {
    const NAME: &'static str = "HalfCheetahVel";

    /// Wrap a simulator; the initial task has goal velocity 1
    pub fn new(sim: S, config: &VelocityConfig) -> Result<Self> {
        Ok(Self {
            base: LocomotionBase::new(Self::NAME, sim, config.weights())?,
            distribution: UniformVelocity::new(config.low, config.high)?,
            task: Arc::new(Task::velocity(DEFAULT_GOAL_VELOCITY)),
            goal_velocity: DEFAULT_GOAL_VELOCITY,
        })
    }

    /// Active goal velocity
    #[must_use]
    pub fn goal_velocity(&self) -> f64 {
        self.goal_velocity
    }

    /// Shared locomotion state
    #[must_use]
    pub fn base(&self) -> &LocomotionBase<S> {
        &self.base
    }
}

impl VelocityLocomotion<PlanarCheetah> {
    /// Planar half-cheetah built from keyword arguments, applying the config seed
    pub fn from_config(config: &EnvConfig) -> Result<Self> {
        let kwargs: VelocityConfig = config.parse()?;
        let mut env = Self::new(PlanarCheetah::new(), &kwargs)?;
        env.seed(config.seed);
        Ok(env)
    }
}

#[async_trait]
impl<S: Simulator> Environment for VelocityLocomotion<S> {
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
        let reward_forward = velocity_reward(
            motion.forward_velocity,
            self.goal_velocity,
            self.base.weights().forward_reward_weight,
        );
        self.base.finish(motion, reward_forward, &self.task)
    }

    async fn close(&mut self) -> Result<()> {
        self.base.close();
        Ok(())
    }
}

impl<S: Simulator> TaskEnvironment for VelocityLocomotion<S> {
    fn sample_tasks(&mut self, num_tasks: usize) -> Vec<Task> {
        self.distribution.sample_tasks(self.base.rng(), num_tasks)
    }

    fn reset_task(&mut self, task: &Task) -> Result<()> {
        let goal = task.scalar(Self::NAME, VELOCITY)?;
        if !goal.is_finite() {
            return Err(RLError::InvalidTask(format!(
                "{}: goal velocity must be finite, got {goal}",
                Self::NAME
            )));
        }
        self.goal_velocity = goal;
        self.task = Arc::new(task.clone());
        Ok(())
    }

    fn task(&self) -> Arc<Task> {
        Arc::clone(&self.task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locomotion::testing::ScriptedSimulator;
    use crate::locomotion::{REWARD_CTRL_KEY, REWARD_FORWARD_KEY};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn scripted(velocity: f64, goal: f64) -> VelocityLocomotion<ScriptedSimulator> {
        let config = VelocityConfig {
            reset_noise_scale: 0.0,
            ..VelocityConfig::default()
        };
        let mut env = VelocityLocomotion::new(ScriptedSimulator::new(velocity), &config).unwrap();
        env.reset_task(&Task::velocity(goal)).unwrap();
        env
    }

    async fn step_reward(velocity: f64, goal: f64) -> f64 {
        let mut env = scripted(velocity, goal);
        env.reset().await.unwrap();
        env.step(&Action::from(vec![0.0, 0.0])).await.unwrap().reward.0
    }

    #[tokio::test]
    async fn test_zero_reward_at_goal() {
        assert_relative_eq!(step_reward(1.25, 1.25).await, 0.0, epsilon = 1e-9);
    }

    #[tokio::test]
    async fn test_reward_components() {
        let mut env = scripted(1.0, 1.5);
        env.reset().await.unwrap();
        let step = env.step(&Action::from(vec![1.0, -1.0])).await.unwrap();

        // forward = -|1.0 - 1.5|, ctrl = 0.5 * 0.1 * 2
        assert_relative_eq!(step.reward.0, -0.5 - 0.1, epsilon = 1e-9);
        assert_relative_eq!(step.info.get_f64(REWARD_FORWARD_KEY).unwrap(), -0.5, epsilon = 1e-9);
        assert_relative_eq!(step.info.get_f64(REWARD_CTRL_KEY).unwrap(), -0.1, epsilon = 1e-9);
        assert_eq!(step.info.task().unwrap(), Some(Task::velocity(1.5)));
        assert!(!step.done);
        assert!(!step.truncated);
    }

    #[tokio::test]
    async fn test_planar_cheetah_episode() {
        let mut env = VelocityLocomotion::from_config(&EnvConfig::new().with_seed(3)).unwrap();
        let task = env.sample_tasks(1).remove(0);
        env.reset_task(&task).unwrap();
        let (obs, _) = env.reset().await.unwrap();
        assert_eq!(obs.len(), 20);
        for _ in 0..10 {
            let step = env.step(&Action::from(vec![0.3; 6])).await.unwrap();
            assert!(step.reward.0.is_finite());
            assert_eq!(step.observation.len(), 20);
        }
    }

    #[tokio::test]
    async fn test_invalid_actions() {
        let mut env = scripted(0.0, 0.0);
        env.reset().await.unwrap();
        for bad in [
            Action::from(0usize),
            Action::from(vec![0.0]),
            Action::from(vec![f64::NAN, 0.0]),
        ] {
            assert!(matches!(env.step(&bad).await, Err(RLError::InvalidAction(_))));
        }
    }

    #[test]
    fn test_reset_task_requires_velocity() {
        let mut env = scripted(0.0, 0.7);
        let err = env.reset_task(&Task::means(vec![0.5])).unwrap_err();
        assert!(matches!(err, RLError::IncompleteTask { ref field, .. } if field == VELOCITY));
        assert_relative_eq!(env.goal_velocity(), 0.7);
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config: VelocityConfig = EnvConfig::new().parse().unwrap();
        assert_relative_eq!(config.low, 0.0);
        assert_relative_eq!(config.high, 2.0);
        assert_relative_eq!(config.ctrl_cost_weight, 0.1);

        let inverted = EnvConfig::new().with_param("low", 3.0).with_param("high", 1.0);
        assert!(VelocityLocomotion::from_config(&inverted).is_err());
        let unknown = EnvConfig::new().with_param("goal", 1.0);
        assert!(matches!(
            VelocityLocomotion::from_config(&unknown),
            Err(RLError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_default_task_targets_unit_velocity() {
        let env = VelocityLocomotion::from_config(&EnvConfig::new()).unwrap();
        assert_eq!(*env.task(), Task::velocity(1.0));
        assert_relative_eq!(env.goal_velocity(), 1.0);
    }

    #[tokio::test]
    async fn test_non_finite_goal_rejected() {
        let mut env = scripted(1.0, 0.5);
        for goal in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                env.reset_task(&Task::velocity(goal)),
                Err(RLError::InvalidTask(_))
            ));
        }
        assert_eq!(*env.task(), Task::velocity(0.5));
        assert_relative_eq!(env.goal_velocity(), 0.5);

        env.reset().await.unwrap();
        let step = env.step(&Action::from(vec![0.0, 0.0])).await.unwrap();
        assert!(step.reward.0.is_finite());
    }

    #[tokio::test]
    async fn test_close_keeps_task_operations() {
        let mut env = VelocityLocomotion::from_config(&EnvConfig::new()).unwrap();
        env.close().await.unwrap();
        assert!(matches!(env.reset().await, Err(RLError::InvalidState(_))));
        assert_eq!(env.sample_tasks(4).len(), 4);
        assert!(env.reset_task(&Task::velocity(1.0)).is_ok());
    }

    proptest! {
        #[test]
        fn prop_reward_decreases_away_from_goal(
            goal in 0.0f64..2.0,
            near in 0.01f64..1.0,
            extra in 0.01f64..1.0,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (at, above, far_above, below, far_below) = rt.block_on(async {
                (
                    step_reward(goal, goal).await,
                    step_reward(goal + near, goal).await,
                    step_reward(goal + near + extra, goal).await,
                    step_reward(goal - near, goal).await,
                    step_reward(goal - near - extra, goal).await,
                )
            });
            prop_assert!(at > above);
            prop_assert!(above > far_above);
            prop_assert!(at > below);
            prop_assert!(below > far_below);
        }
    }
}
