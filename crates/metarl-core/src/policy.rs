//! Policy abstraction for action selection

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Action, VectorObservation};

/// Maps observations to actions.
///
/// The core treats policies as opaque: anything that can answer `act` can
/// drive a rollout.
#[async_trait]
pub trait Policy: Send + Sync {
    /// Select an action given an observation
    async fn act(&self, observation: &VectorObservation) -> crate::Result<Action>;
}

/// Policy shared by concurrent sampling workers
pub type SharedPolicy = Arc<dyn Policy>;

#[async_trait]
impl<P> Policy for Arc<P>
where
    P: Policy + ?Sized,
{
    async fn act(&self, observation: &VectorObservation) -> crate::Result<Action> {
        (**self).act(observation).await
    }
}

/// Policy backed by a plain function or closure
pub struct FnPolicy<F>(pub F);

#[async_trait]
impl<F> Policy for FnPolicy<F>
where
    F: Fn(&VectorObservation) -> crate::Result<Action> + Send + Sync,
{
    async fn act(&self, observation: &VectorObservation) -> crate::Result<Action> {
        (self.0)(observation)
    }
}

/// Policy that always plays the same action
#[derive(Debug, Clone)]
pub struct ConstantPolicy {
    /// Action returned for every observation
    pub action: Action,
}

impl ConstantPolicy {
    /// Create a new constant policy
    pub fn new(action: impl Into<Action>) -> Self {
        Self {
            action: action.into(),
        }
    }
}

#[async_trait]
impl Policy for ConstantPolicy {
    async fn act(&self, _observation: &VectorObservation) -> crate::Result<Action> {
        Ok(self.action.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_policy() {
        let policy = FnPolicy(|obs: &VectorObservation| -> crate::Result<Action> {
            Ok(Action::from(obs.len()))
        });
        let action = policy.act(&VectorObservation::zeros(3)).await.unwrap();
        assert_eq!(action, Action::from(3usize));
    }

    #[tokio::test]
    async fn test_shared_policy() {
        let policy: SharedPolicy = Arc::new(ConstantPolicy::new(1usize));
        let action = policy.act(&VectorObservation::zeros(1)).await.unwrap();
        assert_eq!(action.as_discrete(), Some(1));
    }
}
