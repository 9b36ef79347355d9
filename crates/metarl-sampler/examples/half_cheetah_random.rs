//! Example: Random policy sampling goal-velocity half-cheetah tasks

use std::sync::Arc;

use metarl_core::{EnvConfig, Environment};
use metarl_env::make_env;
use metarl_sampler::{ParallelSampler, RandomPolicy, Sampler, SamplerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging, honouring RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = SamplerConfig::new("HalfCheetahVel-v2", 8)
        .with_seed(42)
        .with_num_workers(4)
        .with_env_kwargs(EnvConfig::new().with_max_steps(100));

    // Build the policy from the environment's action space
    let probe = make_env(&config.env_name, &config.env_kwargs)?;
    let policy = Arc::new(RandomPolicy::new(probe.action_space(), Some(7)));

    let sampler = ParallelSampler::new(config, policy, Some(probe)).await?;
    let tasks = sampler.base().sample_tasks(3);
    let batches = sampler.sample_many(&tasks).await?;

    for batch in &batches {
        println!(
            "Task {}: {} trajectories, {} transitions, average return {:.2}",
            batch.task,
            batch.len(),
            batch.total_transitions(),
            batch.avg_reward()
        );
    }

    Ok(())
}
