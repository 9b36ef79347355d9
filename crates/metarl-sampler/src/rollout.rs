//! Episode rollouts

use std::ops::Range;
use std::sync::Arc;

use metarl_core::{
    BoxedTaskEnv, Environment, Policy, Result, SharedPolicy, Task, TaskEnvironment, Trajectory,
    Transition,
};

/// Run one complete episode of `env` under `task`.
///
/// The episode ends when the environment reports `done` or `truncated`, or
/// after `max_steps` steps; hitting the cap marks the last transition as
/// truncated.
pub async fn rollout<E, P>(
    env: &mut E,
    policy: &P,
    task: &Arc<Task>,
    index: usize,
    max_steps: Option<usize>,
) -> Result<Trajectory>
where
    E: TaskEnvironment + ?Sized,
    P: Policy + ?Sized,
{
    env.reset_task(task)?;
    let (mut observation, _) = env.reset().await?;
    let mut trajectory = Trajectory::new(index, Arc::clone(task));

    loop {
        let action = policy.act(&observation).await?;
        let step = env.step(&action).await?;
        let capped = max_steps.is_some_and(|limit| trajectory.len() + 1 >= limit);
        let finished = step.is_last() || capped;

        let next_observation = step.observation;
        trajectory.push(Transition {
            observation: std::mem::replace(&mut observation, next_observation.clone()),
            action,
            reward: step.reward,
            next_observation,
            done: step.done,
            truncated: step.truncated || (capped && !step.done),
            info: step.info,
        });

        if finished {
            return Ok(trajectory);
        }
    }
}

/// Roll out the episodes `indices` of a batch on one worker environment, then close it
pub async fn run_chunk(
    mut env: BoxedTaskEnv,
    policy: SharedPolicy,
    task: Arc<Task>,
    indices: Range<usize>,
    max_steps: Option<usize>,
) -> Result<Vec<Trajectory>> {
    let mut trajectories = Vec::with_capacity(indices.len());
    for index in indices {
        trajectories.push(rollout(&mut env, &*policy, &task, index, max_steps).await?);
    }
    env.close().await?;
    Ok(trajectories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use metarl_core::{Action, ConstantPolicy, EnvConfig, FnPolicy, RLError};
    use metarl_env::make_env;

    #[tokio::test]
    async fn test_bandit_rollout_is_single_step() {
        let mut env = make_env("Bandit-K5-v0", &EnvConfig::new().with_seed(0)).unwrap();
        let task = Arc::new(env.sample_tasks(1).remove(0));
        let policy = ConstantPolicy::new(2usize);

        let trajectory = rollout(&mut env, &policy, &task, 7, None).await.unwrap();
        assert_eq!(trajectory.index, 7);
        assert_eq!(trajectory.len(), 1);
        assert!(trajectory.is_finished());
        assert_eq!(*trajectory.task, *task);
        assert_eq!(
            trajectory.transitions[0].info.task().unwrap().as_ref(),
            Some(task.as_ref())
        );
    }

    #[tokio::test]
    async fn test_locomotion_rollout_respects_time_limit() {
        let config = EnvConfig::new().with_seed(0).with_max_steps(15);
        let mut env = make_env("HalfCheetahVel-v2", &config).unwrap();
        let task = Arc::new(Task::velocity(1.0));
        let policy = ConstantPolicy::new(vec![0.1; 6]);

        let trajectory = rollout(&mut env, &policy, &task, 0, None).await.unwrap();
        assert_eq!(trajectory.len(), 15);
        let last = trajectory.transitions.last().unwrap();
        assert!(last.truncated);
        assert!(!last.done);
        assert!(trajectory.transitions[..14].iter().all(|t| !t.truncated));
    }

    #[tokio::test]
    async fn test_step_cap_truncates() {
        let mut env = make_env("HalfCheetahDir-v2", &EnvConfig::new().with_seed(0)).unwrap();
        let task = Arc::new(Task::direction(metarl_core::Direction::Forward));
        let policy = ConstantPolicy::new(vec![0.0; 6]);

        let trajectory = rollout(&mut env, &policy, &task, 0, Some(4)).await.unwrap();
        assert_eq!(trajectory.len(), 4);
        assert!(trajectory.is_finished());
    }

    #[tokio::test]
    async fn test_observations_chain() {
        let mut env = make_env("HalfCheetahVel-v2", &EnvConfig::new().with_seed(2)).unwrap();
        let task = Arc::new(Task::velocity(0.5));
        let policy = ConstantPolicy::new(vec![0.2; 6]);

        let trajectory = rollout(&mut env, &policy, &task, 0, Some(5)).await.unwrap();
        for pair in trajectory.transitions.windows(2) {
            assert_eq!(pair[0].next_observation, pair[1].observation);
        }
    }

    #[tokio::test]
    async fn test_policy_errors_propagate() {
        let mut env = make_env("Bandit-K5-v0", &EnvConfig::new()).unwrap();
        let task = Arc::new(env.sample_tasks(1).remove(0));
        let policy = FnPolicy(|_: &metarl_core::VectorObservation| -> metarl_core::Result<Action> {
            Err(RLError::InvalidState("policy not loaded".to_string()))
        });

        assert!(matches!(
            rollout(&mut env, &policy, &task, 0, None).await,
            Err(RLError::InvalidState(_))
        ));
    }
}
