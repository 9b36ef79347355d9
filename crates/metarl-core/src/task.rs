//! Tasks and task distributions
//!
//! A [`Task`] is an immutable bundle of named parameters selecting one member
//! of a task distribution. Environments take a deep copy on `reset_task` and
//! never mutate it afterwards; a new task replaces the old one wholesale.

use std::collections::BTreeMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{RLError, Result};

/// Arm means of a bandit task
pub const MEAN: &str = "mean";
/// Target velocity of a locomotion task
pub const VELOCITY: &str = "velocity";
/// Target direction of a locomotion task
pub const DIRECTION: &str = "direction";

/// Value of a single task parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskParam {
    /// A single number
    Scalar(f64),
    /// A sequence of numbers
    Vector(Vec<f64>),
}

/// Named parameters instantiating one member of a task distribution
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Task {
    params: BTreeMap<String, TaskParam>,
}

impl Task {
    /// Empty task
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, returning the extended task
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, param: TaskParam) -> Self {
        self.params.insert(name.into(), param);
        self
    }

    /// Bandit task with the given per-arm means
    #[must_use]
    pub fn means(means: Vec<f64>) -> Self {
        Self::new().with(MEAN, TaskParam::Vector(means))
    }

    /// Locomotion task with a target velocity
    #[must_use]
    pub fn velocity(velocity: f64) -> Self {
        Self::new().with(VELOCITY, TaskParam::Scalar(velocity))
    }

    /// Locomotion task with a target direction
    #[must_use]
    pub fn direction(direction: Direction) -> Self {
        Self::new().with(DIRECTION, TaskParam::Scalar(direction.sign()))
    }

    /// Raw parameter lookup
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TaskParam> {
        self.params.get(name)
    }

    /// Parameter names in this task
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// Scalar parameter required by environment `env`
    pub fn scalar(&self, env: &str, name: &str) -> Result<f64> {
        match self.params.get(name) {
            Some(TaskParam::Scalar(value)) => Ok(*value),
            Some(TaskParam::Vector(_)) => Err(RLError::InvalidTask(format!(
                "`{name}` must be a scalar for {env}"
            ))),
            None => Err(RLError::incomplete_task(env, name)),
        }
    }

    /// Vector parameter required by environment `env`
    pub fn vector(&self, env: &str, name: &str) -> Result<&[f64]> {
        match self.params.get(name) {
            Some(TaskParam::Vector(values)) => Ok(values),
            Some(TaskParam::Scalar(_)) => Err(RLError::InvalidTask(format!(
                "`{name}` must be a sequence for {env}"
            ))),
            None => Err(RLError::incomplete_task(env, name)),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self.params),
        }
    }
}

/// Commanded direction of travel for direction-locomotion tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Run backward (-1)
    Backward,
    /// Run forward (+1)
    Forward,
}

impl Direction {
    /// `-1.0` or `+1.0`
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Self::Backward => -1.0,
            Self::Forward => 1.0,
        }
    }
}

impl TryFrom<f64> for Direction {
    type Error = RLError;

    fn try_from(value: f64) -> Result<Self> {
        if value == 1.0 {
            Ok(Self::Forward)
        } else if value == -1.0 {
            Ok(Self::Backward)
        } else {
            Err(RLError::InvalidTask(format!(
                "direction must be -1 or +1, got {value}"
            )))
        }
    }
}

/// Prior over tasks for one environment variant.
///
/// Implementations draw only from the supplied random source, so two
/// environments seeded identically produce identical task sequences.
pub trait TaskDistribution: Send + Sync {
    /// Draw `num_tasks` i.i.d. tasks
    fn sample_tasks(&self, rng: &mut StdRng, num_tasks: usize) -> Vec<Task>;
}

/// `k` arm means drawn i.i.d. from Uniform\[0, 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformMeans {
    /// Number of arms
    pub k: usize,
}

impl TaskDistribution for UniformMeans {
    fn sample_tasks(&self, rng: &mut StdRng, num_tasks: usize) -> Vec<Task> {
        (0..num_tasks)
            .map(|_| Task::means((0..self.k).map(|_| rng.gen::<f64>()).collect()))
            .collect()
    }
}

/// Target velocity drawn from Uniform\[low, high)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformVelocity {
    low: f64,
    high: f64,
}

impl UniformVelocity {
    /// Create the distribution; requires finite `low < high`
    pub fn new(low: f64, high: f64) -> Result<Self> {
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(RLError::InvalidConfig(format!(
                "velocity range must satisfy low < high, got [{low}, {high})"
            )));
        }
        Ok(Self { low, high })
    }

    /// Lower bound
    #[must_use]
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Upper bound
    #[must_use]
    pub fn high(&self) -> f64 {
        self.high
    }
}

impl Default for UniformVelocity {
    fn default() -> Self {
        Self {
            low: 0.0,
            high: 2.0,
        }
    }
}

impl TaskDistribution for UniformVelocity {
    fn sample_tasks(&self, rng: &mut StdRng, num_tasks: usize) -> Vec<Task> {
        (0..num_tasks)
            .map(|_| Task::velocity(rng.gen_range(self.low..self.high)))
            .collect()
    }
}

/// Direction drawn from Bernoulli(0.5) over {0, 1}, mapped to {-1, +1}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RandomDirection;

impl TaskDistribution for RandomDirection {
    fn sample_tasks(&self, rng: &mut StdRng, num_tasks: usize) -> Vec<Task> {
        (0..num_tasks)
            .map(|_| {
                let direction = if rng.gen_bool(0.5) {
                    Direction::Forward
                } else {
                    Direction::Backward
                };
                Task::direction(direction)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    #[test]
    fn test_task_serializes_as_plain_mapping() {
        let task = Task::means(vec![0.25, 0.75]);
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json, serde_json::json!({ "mean": [0.25, 0.75] }));

        let back: Task = serde_json::from_value(serde_json::json!({ "velocity": 1.5 })).unwrap();
        assert_eq!(back, Task::velocity(1.5));
    }

    #[test]
    fn test_missing_field_is_incomplete() {
        let err = Task::velocity(1.0).vector("BernoulliBandit", MEAN).unwrap_err();
        assert!(matches!(err, RLError::IncompleteTask { ref field, .. } if field == MEAN));
    }

    #[test]
    fn test_wrong_kind_is_invalid() {
        let task = Task::new().with(MEAN, TaskParam::Scalar(0.5));
        assert!(matches!(
            task.vector("GaussianBandit", MEAN),
            Err(RLError::InvalidTask(_))
        ));
    }

    #[test]
    fn test_direction_conversion() {
        assert_eq!(Direction::try_from(1.0).unwrap(), Direction::Forward);
        assert_eq!(Direction::try_from(-1.0).unwrap(), Direction::Backward);
        assert!(Direction::try_from(0.0).is_err());
    }

    #[test]
    fn test_velocity_range_validation() {
        assert!(UniformVelocity::new(0.0, 2.0).is_ok());
        assert!(UniformVelocity::new(2.0, 2.0).is_err());
        assert!(UniformVelocity::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_directions_are_signs() {
        let mut rng = StdRng::seed_from_u64(3);
        let tasks = RandomDirection.sample_tasks(&mut rng, 64);
        assert!(tasks.iter().all(|t| {
            let d = t.scalar("dir", DIRECTION).unwrap();
            d == 1.0 || d == -1.0
        }));
        assert!(tasks.iter().any(|t| t.scalar("dir", DIRECTION).unwrap() > 0.0));
        assert!(tasks.iter().any(|t| t.scalar("dir", DIRECTION).unwrap() < 0.0));
    }

    proptest! {
        #[test]
        fn prop_uniform_means_shape(k in 1usize..64, n in 0usize..32, seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let tasks = UniformMeans { k }.sample_tasks(&mut rng, n);
            prop_assert_eq!(tasks.len(), n);
            for task in &tasks {
                let means = task.vector("bandit", MEAN).unwrap();
                prop_assert_eq!(means.len(), k);
                prop_assert!(means.iter().all(|m| (0.0..=1.0).contains(m)));
            }
        }

        #[test]
        fn prop_velocity_within_range(low in -5.0f64..5.0, width in 0.01f64..5.0, seed in any::<u64>()) {
            let dist = UniformVelocity::new(low, low + width).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            for task in dist.sample_tasks(&mut rng, 16) {
                let v = task.scalar("vel", VELOCITY).unwrap();
                prop_assert!(v >= low && v < low + width);
            }
        }

        #[test]
        fn prop_same_seed_same_tasks(seed in any::<u64>()) {
            let dist = UniformMeans { k: 5 };
            let a = dist.sample_tasks(&mut StdRng::seed_from_u64(seed), 8);
            let b = dist.sample_tasks(&mut StdRng::seed_from_u64(seed), 8);
            prop_assert_eq!(a, b);
        }
    }
}
