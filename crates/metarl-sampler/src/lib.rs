//! Batched rollout sampling for meta reinforcement learning
//!
//! A sampler owns a registered environment id and a policy, and turns a
//! task into a batch of complete trajectories collected under that task.
//! This crate provides:
//! - The [`Sampler`] contract and shared [`SamplerBase`] state
//! - Serial and parallel implementations
//! - A seeded random policy for baselines

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod parallel;
pub mod random;
pub mod rollout;
pub mod sampler;
pub mod serial;

// Re-export samplers
pub use config::SamplerConfig;
pub use parallel::ParallelSampler;
pub use random::RandomPolicy;
pub use rollout::{rollout, run_chunk};
pub use sampler::{PendingBatch, Sampler, SamplerBase};
pub use serial::SerialSampler;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ParallelSampler, RandomPolicy, Sampler, SamplerBase, SamplerConfig, SerialSampler,
    };
    pub use metarl_core::prelude::*;
}
