//! End-to-end sampling across the registered environments

use std::sync::Arc;

use metarl_core::task::{DIRECTION, MEAN, VELOCITY};
use metarl_core::{ConstantPolicy, EnvConfig, RLError, SharedPolicy, Task};
use metarl_sampler::{ParallelSampler, RandomPolicy, Sampler, SamplerBase, SamplerConfig, SerialSampler};

fn random_policy(dim: usize) -> SharedPolicy {
    let space = metarl_core::ActionSpace::Continuous(
        metarl_core::ContinuousSpace::new(vec![-1.0; dim], vec![1.0; dim])
            .unwrap(),
    );
    Arc::new(RandomPolicy::new(space, Some(0)))
}

#[tokio::test]
async fn bandit_batches_for_every_registered_bandit() {
    for (id, kwargs, k) in [
        ("Bandit-K5-v0", EnvConfig::new(), 5usize),
        ("Bandit-K50-v0", EnvConfig::new(), 50),
        ("BernoulliBandit-v0", EnvConfig::new().with_param("k", 4), 4),
        (
            "GaussianBandit-v0",
            EnvConfig::new().with_param("k", 6).with_param("std", 0.5),
            6,
        ),
    ] {
        let config = SamplerConfig::new(id, 10).with_seed(1).with_env_kwargs(kwargs);
        let policy: SharedPolicy = Arc::new(ConstantPolicy::new(k - 1));
        let sampler = SerialSampler::new(config, policy, None).await.unwrap();

        let task = sampler.base().sample_tasks(1).remove(0);
        assert_eq!(task.vector(id, MEAN).unwrap().len(), k);

        let batch = sampler.sample(&task).await.unwrap();
        assert_eq!(batch.len(), 10, "{id}");
        for trajectory in &batch.trajectories {
            assert_eq!(trajectory.len(), 1);
            assert!(trajectory.transitions[0].done);
            assert_eq!(trajectory.transitions[0].observation.data, vec![0.0]);
        }
    }
}

#[tokio::test]
async fn locomotion_meta_batch() {
    let config = SamplerConfig::new("HalfCheetahVel-v2", 4)
        .with_seed(9)
        .with_num_workers(2)
        .with_max_episode_steps(30);
    let sampler = ParallelSampler::new(config, random_policy(6), None)
        .await
        .unwrap();

    let tasks = sampler.base().sample_tasks(3);
    for task in &tasks {
        let goal = task.scalar("HalfCheetahVel", VELOCITY).unwrap();
        assert!((0.0..2.0).contains(&goal));
    }

    let batches = sampler.sample_many(&tasks).await.unwrap();
    for (batch, task) in batches.iter().zip(&tasks) {
        assert_eq!(batch.len(), 4);
        assert_eq!(batch.total_transitions(), 4 * 30);
        for trajectory in &batch.trajectories {
            assert_eq!(*trajectory.task, *task);
            let info = &trajectory.transitions[0].info;
            assert_eq!(info.task().unwrap().as_ref(), Some(task));
            assert!(info.get_f64("reward_forward").unwrap() <= 0.0);
            assert!(info.get_f64("reward_ctrl").unwrap() <= 0.0);
        }
    }
}

#[tokio::test]
async fn direction_tasks_cover_both_signs() {
    let config = SamplerConfig::new("HalfCheetahDir-v2", 1).with_seed(3);
    let sampler = SerialSampler::new(config, random_policy(6), None)
        .await
        .unwrap();

    let signs: Vec<f64> = sampler
        .base()
        .sample_tasks(40)
        .iter()
        .map(|task| task.scalar("HalfCheetahDir", DIRECTION).unwrap())
        .collect();
    assert!(signs.contains(&1.0));
    assert!(signs.contains(&-1.0));
}

#[tokio::test]
async fn base_sampler_reports_not_implemented() {
    let config = SamplerConfig::new("HalfCheetahDir-v2", 2);
    let base = SamplerBase::new(config, random_policy(6), None).await.unwrap();
    let task = Task::direction(metarl_core::Direction::Forward);
    assert!(matches!(
        base.sample(&task).await,
        Err(RLError::NotImplemented("sample_async"))
    ));
}

#[tokio::test]
async fn sampler_from_toml() {
    let config = SamplerConfig::from_toml(
        r#"
        env_name = "GaussianBandit-v0"
        batch_size = 5
        seed = 11
        num_workers = 2

        [env_kwargs]
        k = 3
        std = 0.0
        "#,
    )
    .unwrap();
    let sampler = ParallelSampler::new(config, Arc::new(ConstantPolicy::new(1usize)), None)
        .await
        .unwrap();

    let batch = sampler.sample(&Task::means(vec![0.0, 2.5, 0.0])).await.unwrap();
    assert!(batch.trajectories.iter().all(|t| t.total_reward == 2.5));
}
