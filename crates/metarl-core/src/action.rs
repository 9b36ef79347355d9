//! Action representations and action spaces

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Discrete action, e.g. the index of a bandit arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscreteAction(pub usize);

/// Continuous action, e.g. a torque vector for locomotion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousAction(pub Vec<f64>);

/// An action accepted by a task-conditioned environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    /// Discrete choice
    Discrete(DiscreteAction),
    /// Continuous control vector
    Continuous(ContinuousAction),
}

impl Action {
    /// Convert action to a vector representation
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            Self::Discrete(a) => vec![a.0 as f64],
            Self::Continuous(a) => a.0.clone(),
        }
    }

    /// The arm index, if this is a discrete action
    #[must_use]
    pub fn as_discrete(&self) -> Option<usize> {
        match self {
            Self::Discrete(a) => Some(a.0),
            Self::Continuous(_) => None,
        }
    }

    /// The control vector, if this is a continuous action
    #[must_use]
    pub fn as_continuous(&self) -> Option<&[f64]> {
        match self {
            Self::Discrete(_) => None,
            Self::Continuous(a) => Some(&a.0),
        }
    }
}

impl From<DiscreteAction> for Action {
    fn from(action: DiscreteAction) -> Self {
        Self::Discrete(action)
    }
}

impl From<ContinuousAction> for Action {
    fn from(action: ContinuousAction) -> Self {
        Self::Continuous(action)
    }
}

impl From<usize> for Action {
    fn from(arm: usize) -> Self {
        Self::Discrete(DiscreteAction(arm))
    }
}

impl From<Vec<f64>> for Action {
    fn from(ctrl: Vec<f64>) -> Self {
        Self::Continuous(ContinuousAction(ctrl))
    }
}

/// Discrete action space `{0, .., n - 1}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscreteSpace {
    /// Number of discrete actions
    pub n: usize,
}

impl DiscreteSpace {
    /// Create a new discrete action space
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// Check if an action is valid within this space
    #[must_use]
    pub fn contains(&self, action: &DiscreteAction) -> bool {
        action.0 < self.n
    }
}

/// Continuous action space (box)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousSpace {
    /// Lower bounds for each dimension
    pub low: Vec<f64>,
    /// Upper bounds for each dimension
    pub high: Vec<f64>,
}

impl ContinuousSpace {
    /// Create a new continuous action space
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> crate::Result<Self> {
        if low.len() != high.len() {
            return Err(crate::RLError::DimensionMismatch {
                expected: low.len(),
                actual: high.len(),
            });
        }
        if low.iter().zip(&high).any(|(l, h)| l > h) {
            return Err(crate::RLError::InvalidConfig(
                "continuous space has a lower bound above its upper bound".to_string(),
            ));
        }
        Ok(Self { low, high })
    }

    /// Check if a control vector lies within the box
    #[must_use]
    pub fn contains(&self, action: &ContinuousAction) -> bool {
        action.0.len() == self.low.len()
            && action
                .0
                .iter()
                .zip(&self.low)
                .zip(&self.high)
                .all(|((x, l), h)| x >= l && x <= h)
    }
}

/// Action space of a task-conditioned environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionSpace {
    /// `Discrete(K)`, used by bandits
    Discrete(DiscreteSpace),
    /// Fixed-width box, used by locomotion
    Continuous(ContinuousSpace),
}

impl ActionSpace {
    /// Check if an action is valid within this space
    #[must_use]
    pub fn contains(&self, action: &Action) -> bool {
        match (self, action) {
            (Self::Discrete(space), Action::Discrete(a)) => space.contains(a),
            (Self::Continuous(space), Action::Continuous(a)) => space.contains(a),
            _ => false,
        }
    }

    /// Dimensionality of an action from this space
    #[must_use]
    pub fn dim(&self) -> usize {
        match self {
            Self::Discrete(_) => 1,
            Self::Continuous(space) => space.low.len(),
        }
    }

    /// Sample a uniformly random action using the given random source.
    ///
    /// Unbounded dimensions of a box are drawn from a standard normal.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Action {
        match self {
            Self::Discrete(space) => Action::Discrete(DiscreteAction(rng.gen_range(0..space.n))),
            Self::Continuous(space) => {
                let values = space
                    .low
                    .iter()
                    .zip(&space.high)
                    .map(|(&l, &h)| {
                        if l.is_finite() && h.is_finite() {
                            rng.gen_range(l..=h)
                        } else {
                            rng.sample::<f64, _>(StandardNormal).clamp(l, h)
                        }
                    })
                    .collect();
                Action::Continuous(ContinuousAction(values))
            }
        }
    }
}
