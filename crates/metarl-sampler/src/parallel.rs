//! Multi-worker sampler

use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use metarl_core::{BoxedTaskEnv, Result, SharedPolicy, Task};

use crate::config::SamplerConfig;
use crate::rollout::run_chunk;
use crate::sampler::{PendingBatch, Sampler, SamplerBase};

/// Split `0..batch_size` into at most `num_workers` contiguous, non-empty ranges
/// whose sizes differ by at most one
#[must_use]
pub fn partition(batch_size: usize, num_workers: usize) -> Vec<Range<usize>> {
    let workers = num_workers.min(batch_size).max(1);
    let (share, extra) = (batch_size / workers, batch_size % workers);
    let mut start = 0;
    (0..workers)
        .map(|w| {
            let len = share + usize::from(w < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .filter(|range| !range.is_empty())
        .collect()
}

/// Runs a batch on `num_workers` independent environments concurrently.
///
/// Each worker owns its environment and seed and handles a contiguous slice
/// of batch indices, so results come back in index order.
pub struct ParallelSampler {
    base: SamplerBase,
}

impl ParallelSampler {
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

    /// Configured worker count
    #[must_use]
    pub fn num_workers(&self) -> usize {
        self.base.config().num_workers
    }
}

#[async_trait]
impl Sampler for ParallelSampler {
    fn base(&self) -> &SamplerBase {
        &self.base
    }

    async fn sample_async(&self, task: &Task) -> Result<PendingBatch> {
        let config = self.base.config();
        let task = Arc::new(task.clone());
        let chunks = partition(config.batch_size, config.num_workers);

        // Acquire in worker order so seeds do not depend on scheduling
        let envs = chunks
            .iter()
            .map(|_| self.base.acquire_env())
            .collect::<Result<Vec<_>>>()?;

        info!(
            task = %task,
            batch_size = config.batch_size,
            workers = chunks.len(),
            "sampling batch"
        );

        let workers = envs
            .into_iter()
            .zip(chunks)
            .map(|(env, indices)| {
                tokio::spawn(run_chunk(
                    env,
                    self.base.policy(),
                    Arc::clone(&task),
                    indices,
                    config.max_episode_steps,
                ))
            })
            .collect();
        Ok(PendingBatch::new(task, config.batch_size, workers))
    }
}
