//! Task-conditioned environments for meta reinforcement learning
//!
//! This crate provides:
//! - Bernoulli and Gaussian multi-armed bandits
//! - Goal-velocity and goal-direction locomotion over a pluggable simulator
//! - A reduced-order planar half-cheetah simulator
//! - A name-based registry and the `TimeLimit` wrapper

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bandit;
pub mod locomotion;
pub mod physics;
pub mod registry;
pub mod wrappers;

// Re-export environments
pub use bandit::{BernoulliBandit, BernoulliBanditConfig, GaussianBandit, GaussianBanditConfig};
pub use locomotion::{
    DirectionConfig, DirectionLocomotion, LocomotionBase, LocomotionWeights, VelocityConfig,
    VelocityLocomotion,
};
pub use physics::{ModelSpec, PlanarCheetah, Simulator};
pub use registry::{constructor, list_envs, make_env, register_env, EnvConstructor, EnvRegistry};
pub use wrappers::TimeLimit;

// Re-export core types
pub use metarl_core::{
    Action, ActionSpace, BoxedTaskEnv, EnvConfig, Environment, Step, Task, TaskEnvironment,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{make_env, EnvRegistry, TimeLimit};
    pub use metarl_core::prelude::*;
}
