//! Reward signals

use serde::{Deserialize, Serialize};

/// Reward signal from the environment
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reward(pub f64);

impl From<f64> for Reward {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl std::ops::Sub for Reward {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self(self.0 - other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_penalty_subtracts() {
        let shaped = Reward::from(1.5) - Reward(0.25);
        assert_eq!(shaped, Reward(1.25));
        assert!(Reward(-0.5) < Reward::default());
        assert_eq!(serde_json::to_string(&shaped).unwrap(), "1.25");
    }
}
