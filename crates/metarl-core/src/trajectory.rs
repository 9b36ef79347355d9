//! Trajectory and batch storage

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Action, Reward, StepInfo, Task, VectorObservation};

/// Single transition in a trajectory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    /// Current observation
    pub observation: VectorObservation,
    /// Action taken
    pub action: Action,
    /// Reward received
    pub reward: Reward,
    /// Next observation
    pub next_observation: VectorObservation,
    /// Whether episode ended naturally
    pub done: bool,
    /// Whether episode was cut off by a time limit
    pub truncated: bool,
    /// Step info, including the active task
    pub info: StepInfo,
}

/// Complete trajectory of one episode under a fixed task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    /// Position of this trajectory within its batch
    pub index: usize,
    /// Task active at reset time
    pub task: Arc<Task>,
    /// Sequence of transitions
    pub transitions: Vec<Transition>,
    /// Total reward
    pub total_reward: f64,
}

impl Trajectory {
    /// Create a new empty trajectory
    #[must_use]
    pub fn new(index: usize, task: Arc<Task>) -> Self {
        Self {
            index,
            task,
            transitions: Vec::new(),
            total_reward: 0.0,
        }
    }

    /// Add a transition to the trajectory
    pub fn push(&mut self, transition: Transition) {
        self.total_reward += transition.reward.0;
        self.transitions.push(transition);
    }

    /// Get the length of the trajectory
    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Check if trajectory is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Whether the last transition ended the episode
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.transitions
            .last()
            .is_some_and(|t| t.done || t.truncated)
    }

    /// Compute returns (cumulative discounted rewards)
    #[must_use]
    pub fn returns(&self, gamma: f64) -> Vec<f64> {
        let mut returns = vec![0.0; self.len()];
        let mut running_return = 0.0;

        for i in (0..self.len()).rev() {
            running_return = self.transitions[i].reward.0 + gamma * running_return;
            returns[i] = running_return;
        }

        returns
    }
}

/// Batch of trajectories sampled under one task, ordered by index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryBatch {
    /// Task shared by every trajectory in the batch
    pub task: Arc<Task>,
    /// Collection of trajectories; element `i` has index `i`
    pub trajectories: Vec<Trajectory>,
}

impl TrajectoryBatch {
    /// Create a new empty batch
    #[must_use]
    pub fn new(task: Arc<Task>) -> Self {
        Self {
            task,
            trajectories: Vec::new(),
        }
    }

    /// Add a trajectory to the batch
    pub fn push(&mut self, trajectory: Trajectory) {
        self.trajectories.push(trajectory);
    }

    /// Number of trajectories
    #[must_use]
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    /// Whether the batch holds no trajectories
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    /// Get total number of transitions across all trajectories
    #[must_use]
    pub fn total_transitions(&self) -> usize {
        self.trajectories.iter().map(Trajectory::len).sum()
    }

    /// Get average episode reward
    #[must_use]
    pub fn avg_reward(&self) -> f64 {
        if self.trajectories.is_empty() {
            0.0
        } else {
            let total: f64 = self.trajectories.iter().map(|t| t.total_reward).sum();
            total / self.trajectories.len() as f64
        }
    }
}
