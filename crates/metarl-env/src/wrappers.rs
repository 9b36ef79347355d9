//! Environment wrappers

use std::sync::Arc;

use async_trait::async_trait;

use metarl_core::{
    Action, ActionSpace, BoxObservationSpace, EnvFamily, Environment, RLError, Result, Step,
    StepInfo, Task, TaskEnvironment, VectorObservation,
};

/// Wrapper that truncates episodes after a fixed number of steps.
///
/// Sets `truncated` on the step that reaches the limit unless the inner
/// environment already ended the episode there. `done` is passed through.
pub struct TimeLimit<E> {
    /// Inner environment
    pub env: E,
    /// Maximum steps per episode
    pub max_steps: usize,
    /// Steps taken since the last reset
    elapsed: usize,
}

impl<E: TaskEnvironment> TimeLimit<E> {
    /// Wrap `env` with a limit of `max_steps` (at least one)
    pub fn new(env: E, max_steps: usize) -> Result<Self> {
        if max_steps == 0 {
            return Err(RLError::InvalidConfig(
                "time limit must allow at least one step".to_string(),
            ));
        }
        Ok(Self {
            env,
            max_steps,
            elapsed: 0,
        })
    }

    /// Steps taken in the current episode
    #[must_use]
    pub fn elapsed(&self) -> usize {
        self.elapsed
    }

    /// Unwrap the inner environment
    pub fn into_inner(self) -> E {
        self.env
    }
}

#[async_trait]
impl<E: TaskEnvironment> Environment for TimeLimit<E> {
    fn name(&self) -> &'static str {
        self.env.name()
    }

    fn family(&self) -> EnvFamily {
        self.env.family()
    }

    fn observation_space(&self) -> BoxObservationSpace {
        self.env.observation_space()
    }

    fn action_space(&self) -> ActionSpace {
        self.env.action_space()
    }

    fn seed(&mut self, seed: Option<u64>) -> u64 {
        self.env.seed(seed)
    }

    async fn reset(&mut self) -> Result<(VectorObservation, StepInfo)> {
        let reset = self.env.reset().await?;
        self.elapsed = 0;
        Ok(reset)
    }

    async fn step(&mut self, action: &Action) -> Result<Step> {
        let mut step = self.env.step(action).await?;
        self.elapsed += 1;
        if self.elapsed >= self.max_steps && !step.done {
            step.truncated = true;
        }
        Ok(step)
    }

    async fn close(&mut self) -> Result<()> {
        self.env.close().await
    }
}

impl<E: TaskEnvironment> TaskEnvironment for TimeLimit<E> {
    fn sample_tasks(&mut self, num_tasks: usize) -> Vec<Task> {
        self.env.sample_tasks(num_tasks)
    }

    fn reset_task(&mut self, task: &Task) -> Result<()> {
        self.env.reset_task(task)
    }

    fn task(&self) -> Arc<Task> {
        self.env.task()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BernoulliBandit, VelocityLocomotion};
    use metarl_core::EnvConfig;

    #[tokio::test]
    async fn test_truncates_at_limit() {
        let env = VelocityLocomotion::from_config(&EnvConfig::new().with_seed(0)).unwrap();
        let mut env = TimeLimit::new(env, 3).unwrap();
        let action = Action::from(vec![0.0; 6]);

        for round in 0..2 {
            env.reset().await.unwrap();
            for i in 1..=3 {
                let step = env.step(&action).await.unwrap();
                assert!(!step.done);
                assert_eq!(step.truncated, i == 3, "round {round} step {i}");
            }
            assert_eq!(env.elapsed(), 3);
        }
    }

    #[tokio::test]
    async fn test_terminal_step_is_not_truncated() {
        let mut env = TimeLimit::new(BernoulliBandit::new(2).unwrap(), 1).unwrap();
        for _ in 0..3 {
            env.reset().await.unwrap();
            let step = env.step(&Action::from(0usize)).await.unwrap();
            assert!(step.done);
            assert!(!step.truncated);
        }
    }

    #[tokio::test]
    async fn test_forwards_task_operations() {
        let mut env = TimeLimit::new(BernoulliBandit::new(3).unwrap(), 5).unwrap();
        env.seed(Some(9));
        let task = env.sample_tasks(1).remove(0);
        env.reset_task(&task).unwrap();
        assert_eq!(*env.task(), task);
        assert_eq!(
            env.action_space(),
            metarl_core::ActionSpace::Discrete(metarl_core::DiscreteSpace::new(3))
        );
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert!(TimeLimit::new(BernoulliBandit::new(2).unwrap(), 0).is_err());
    }
}
