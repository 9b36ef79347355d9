//! Single-worker sampler

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use metarl_core::{BoxedTaskEnv, Result, SharedPolicy, Task};

use crate::config::SamplerConfig;
use crate::rollout::run_chunk;
use crate::sampler::{PendingBatch, Sampler, SamplerBase};

/// Runs every episode of a batch back to back on one worker environment
pub struct SerialSampler {
    base: SamplerBase,
}

impl SerialSampler {
    /// Create the sampler; see [`SamplerBase::new`]
    pub async fn new(
        config: SamplerConfig,
        policy: SharedPolicy,
        env: Option<BoxedTaskEnv>,
    ) -> Result<Self> {
        Ok(Self {
            base: SamplerBase::new(config, policy, env).await?,
        })
    }
}

#[async_trait]
impl Sampler for SerialSampler {
    fn base(&self) -> &SamplerBase {
        &self.base
    }

    async fn sample_async(&self, task: &Task) -> Result<PendingBatch> {
        let config = self.base.config();
        let task = Arc::new(task.clone());
        let env = self.base.acquire_env()?;
        info!(task = %task, batch_size = config.batch_size, "sampling batch");

        let worker = tokio::spawn(run_chunk(
            env,
            self.base.policy(),
            Arc::clone(&task),
            0..config.batch_size,
            config.max_episode_steps,
        ));
        Ok(PendingBatch::new(task, config.batch_size, vec![worker]))
    }
}
