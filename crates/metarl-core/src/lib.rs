//! Core traits and types for task-conditioned meta reinforcement learning
//!
//! This crate provides the foundational abstractions shared by the
//! environment and sampler crates: tasks and task distributions, the
//! reset/step environment protocol extended with task switching, spaces,
//! trajectories and the opaque policy interface.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod environment;
pub mod error;
pub mod observation;
pub mod policy;
pub mod reward;
pub mod seeding;
pub mod task;
pub mod trajectory;

// Re-export core traits and types
pub use action::{Action, ActionSpace, ContinuousAction, ContinuousSpace, DiscreteAction, DiscreteSpace};
pub use environment::{
    BoxedTaskEnv, EnvConfig, EnvFamily, Environment, EpisodePhase, Step, StepInfo,
    TaskEnvironment, TASK_KEY,
};
pub use error::{RLError, Result};
pub use observation::{BoxObservationSpace, VectorObservation};
pub use policy::{ConstantPolicy, FnPolicy, Policy, SharedPolicy};
pub use reward::Reward;
pub use task::{
    Direction, RandomDirection, Task, TaskDistribution, TaskParam, UniformMeans, UniformVelocity,
};
pub use trajectory::{Trajectory, TrajectoryBatch, Transition};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Action, ActionSpace, EnvConfig, Environment, Policy, Result, Step, Task,
        TaskEnvironment, Trajectory, TrajectoryBatch, VectorObservation,
    };
}
