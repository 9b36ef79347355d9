//! Random policy for baseline rollouts

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rand::rngs::StdRng;

use metarl_core::seeding::rng_from_seed;
use metarl_core::{Action, ActionSpace, Policy, Result, VectorObservation};

/// Policy that ignores observations and samples actions uniformly
pub struct RandomPolicy {
    /// Action space
    action_space: ActionSpace,
    rng: Mutex<StdRng>,
}

impl RandomPolicy {
    /// Create a random policy over `action_space`, seeded from the OS when `seed` is `None`
    #[must_use]
    pub fn new(action_space: ActionSpace, seed: Option<u64>) -> Self {
        let (rng, _) = rng_from_seed(seed);
        Self {
            action_space,
            rng: Mutex::new(rng),
        }
    }

    /// Action space sampled from
    #[must_use]
    pub fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }
}

#[async_trait]
impl Policy for RandomPolicy {
    async fn act(&self, _observation: &VectorObservation) -> Result<Action> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.action_space.sample(&mut *rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metarl_core::{ContinuousSpace, DiscreteSpace};

    #[tokio::test]
    async fn test_actions_stay_in_space() {
        let space = ActionSpace::Continuous(
            ContinuousSpace::new(vec![-1.0; 6], vec![1.0; 6]).unwrap(),
        );
        let policy = RandomPolicy::new(space.clone(), Some(0));
        let obs = VectorObservation::zeros(20);
        for _ in 0..100 {
            assert!(space.contains(&policy.act(&obs).await.unwrap()));
        }
    }

    #[tokio::test]
    async fn test_seeded_policies_agree() {
        let space = ActionSpace::Discrete(DiscreteSpace::new(10));
        let a = RandomPolicy::new(space.clone(), Some(8));
        let b = RandomPolicy::new(space, Some(8));
        let obs = VectorObservation::zeros(1);
        for _ in 0..20 {
            assert_eq!(
                a.act(&obs).await.unwrap().to_vec(),
                b.act(&obs).await.unwrap().to_vec()
            );
        }
    }
}
