//! Physics-backed locomotion environments
//!
//! Both variants share one body: reset noise, action validation, stepping
//! the simulator and building the observation live in [`LocomotionBase`].
//! The variants differ only in how forward velocity becomes reward.

mod direction;
mod velocity;

pub use direction::{DirectionConfig, DirectionLocomotion};
pub use velocity::{VelocityConfig, VelocityLocomotion};

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::debug;

use metarl_core::seeding::rng_from_seed;
use metarl_core::{
    Action, ActionSpace, BoxObservationSpace, ContinuousSpace, EpisodePhase, RLError, Result,
    Reward, Step, StepInfo, Task, VectorObservation,
};

use crate::physics::Simulator;

/// Info key for the velocity term of the reward
pub const REWARD_FORWARD_KEY: &str = "reward_forward";
/// Info key for the (negated) control cost
pub const REWARD_CTRL_KEY: &str = "reward_ctrl";

const TORSO: &str = "torso";

pub(crate) fn default_forward_reward_weight() -> f64 {
    1.0
}

pub(crate) fn default_ctrl_cost_weight() -> f64 {
    0.1
}

pub(crate) fn default_reset_noise_scale() -> f64 {
    0.1
}

/// Reward shaping and reset noise shared by the locomotion variants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocomotionWeights {
    /// Scale of the velocity term
    pub forward_reward_weight: f64,
    /// Scale of the squared-action penalty
    pub ctrl_cost_weight: f64,
    /// Half-width of the reset perturbation
    pub reset_noise_scale: f64,
}

impl Default for LocomotionWeights {
    fn default() -> Self {
        Self {
            forward_reward_weight: default_forward_reward_weight(),
            ctrl_cost_weight: default_ctrl_cost_weight(),
            reset_noise_scale: default_reset_noise_scale(),
        }
    }
}

impl LocomotionWeights {
    fn validate(&self) -> Result<()> {
        let all_finite = [
            self.forward_reward_weight,
            self.ctrl_cost_weight,
            self.reset_noise_scale,
        ]
        .iter()
        .all(|w| w.is_finite());
        if !all_finite || self.ctrl_cost_weight < 0.0 || self.reset_noise_scale < 0.0 {
            return Err(RLError::InvalidConfig(format!(
                "invalid locomotion weights {self:?}"
            )));
        }
        Ok(())
    }
}

/// `0.5 * weight * Σ a²`
#[must_use]
pub fn control_cost(action: &[f64], weight: f64) -> f64 {
    0.5 * weight * action.iter().map(|a| a * a).sum::<f64>()
}

/// Negative distance to the goal velocity, scaled
#[must_use]
pub fn velocity_reward(forward_velocity: f64, goal_velocity: f64, weight: f64) -> f64 {
    -weight * (forward_velocity - goal_velocity).abs()
}

/// Signed forward velocity, scaled
#[must_use]
pub fn direction_reward(forward_velocity: f64, goal_direction: f64, weight: f64) -> f64 {
    weight * goal_direction * forward_velocity
}

/// Outcome of one simulated step before task-specific reward
#[derive(Debug, Clone)]
pub struct Motion {
    /// Observation after the step
    pub observation: VectorObservation,
    /// `(x_after - x_before) / dt`
    pub forward_velocity: f64,
    /// Control cost of the applied action
    pub ctrl_cost: f64,
}

/// Simulator ownership, episode bookkeeping and random source of a locomotion environment
pub struct LocomotionBase<S> {
    name: &'static str,
    sim: Option<S>,
    action_space: ContinuousSpace,
    obs_width: usize,
    weights: LocomotionWeights,
    rng: StdRng,
    phase: EpisodePhase,
}

impl<S: Simulator> LocomotionBase<S> {
    /// Wrap a simulator, seeding the random source from the OS
    pub fn new(name: &'static str, sim: S, weights: LocomotionWeights) -> Result<Self> {
        weights.validate()?;
        let (low, high) = sim.ctrl_range();
        let action_space = ContinuousSpace::new(low, high)?;
        let model = sim.model();
        if action_space.low.len() != model.nu {
            return Err(RLError::DimensionMismatch {
                expected: model.nu,
                actual: action_space.low.len(),
            });
        }
        // qpos without the root x, qvel, torso centre of mass
        let obs_width = model.nq - 1 + model.nv + 3;
        let (rng, _) = rng_from_seed(None);
        Ok(Self {
            name,
            sim: Some(sim),
            action_space,
            obs_width,
            weights,
            rng,
            phase: EpisodePhase::Uninitialized,
        })
    }

    /// Reward shaping constants
    #[must_use]
    pub fn weights(&self) -> &LocomotionWeights {
        &self.weights
    }

    /// The environment-owned random source
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Current episode phase
    #[must_use]
    pub fn phase(&self) -> EpisodePhase {
        self.phase
    }

    /// Borrow the simulator, if not closed
    #[must_use]
    pub fn simulator(&self) -> Option<&S> {
        self.sim.as_ref()
    }

    fn sim(&self) -> Result<&S> {
        self.sim
            .as_ref()
            .ok_or_else(|| RLError::InvalidState(format!("{}: environment is closed", self.name)))
    }

    fn sim_mut(&mut self) -> Result<&mut S> {
        let name = self.name;
        self.sim
            .as_mut()
            .ok_or_else(|| RLError::InvalidState(format!("{name}: environment is closed")))
    }

    /// Unbounded box of observation width
    #[must_use]
    pub fn observation_space(&self) -> BoxObservationSpace {
        BoxObservationSpace::unbounded(self.obs_width)
    }

    /// Box of actuator control ranges
    #[must_use]
    pub fn action_space(&self) -> ActionSpace {
        ActionSpace::Continuous(self.action_space.clone())
    }

    /// Replace the random source
    pub fn seed(&mut self, seed: Option<u64>) -> u64 {
        let (rng, seed) = rng_from_seed(seed);
        self.rng = rng;
        debug!(env = self.name, seed, "seeded environment");
        seed
    }

    /// `qpos[1..] ++ qvel ++ body_com("torso")` as 32-bit floats
    pub fn observation(&self) -> Result<VectorObservation> {
        let sim = self.sim()?;
        let com = sim.body_com(TORSO)?;
        #[allow(clippy::cast_possible_truncation)]
        let data = sim.qpos()[1..]
            .iter()
            .chain(sim.qvel())
            .chain(&com)
            .map(|&x| x as f32)
            .collect();
        Ok(VectorObservation::new(data))
    }

    /// Perturb the rest pose and start a new episode
    pub fn reset(&mut self) -> Result<VectorObservation> {
        let scale = self.weights.reset_noise_scale;
        let sim = self.sim.as_ref().ok_or_else(|| {
            RLError::InvalidState(format!("{}: environment is closed", self.name))
        })?;
        let rng = &mut self.rng;
        let qpos: Vec<f64> = sim
            .init_qpos()
            .iter()
            .map(|q| q + if scale > 0.0 { rng.gen_range(-scale..=scale) } else { 0.0 })
            .collect();
        let qvel: Vec<f64> = sim
            .init_qvel()
            .iter()
            .map(|v| v + scale * rng.sample::<f64, _>(StandardNormal))
            .collect();

        self.sim_mut()?.set_state(&qpos, &qvel)?;
        self.phase = EpisodePhase::Ready;
        self.observation()
    }

    /// Apply a validated action for one environment step
    pub fn advance(&mut self, action: &Action) -> Result<Motion> {
        let ctrl = self.validate(action)?;
        self.phase.ensure_steppable(self.name)?;

        let sim = self.sim_mut()?;
        let frame_skip = sim.model().frame_skip;
        let x_before = sim.qpos()[0];
        sim.do_simulation(ctrl, frame_skip)?;
        let forward_velocity = (sim.qpos()[0] - x_before) / sim.dt();

        self.phase = EpisodePhase::Running;
        Ok(Motion {
            observation: self.observation()?,
            forward_velocity,
            ctrl_cost: control_cost(ctrl, self.weights.ctrl_cost_weight),
        })
    }

    fn validate<'a>(&self, action: &'a Action) -> Result<&'a [f64]> {
        let ctrl = action.as_continuous().ok_or_else(|| {
            RLError::InvalidAction(format!(
                "{}: expected a continuous action, got {action:?}",
                self.name
            ))
        })?;
        let expected = self.action_space.low.len();
        if ctrl.len() != expected {
            return Err(RLError::InvalidAction(format!(
                "{}: expected {expected} controls, got {}",
                self.name,
                ctrl.len()
            )));
        }
        if ctrl.iter().any(|u| !u.is_finite()) {
            return Err(RLError::InvalidAction(format!(
                "{}: non-finite control in {ctrl:?}",
                self.name
            )));
        }
        Ok(ctrl)
    }

    /// Assemble the step from a motion and its task-specific forward reward
    pub fn finish(&self, motion: Motion, reward_forward: f64, task: &Task) -> Result<Step> {
        let mut info = StepInfo::with_task(task)?;
        info.insert(REWARD_FORWARD_KEY, &reward_forward)?;
        info.insert(REWARD_CTRL_KEY, &-motion.ctrl_cost)?;
        Ok(Step {
            observation: motion.observation,
            reward: Reward(reward_forward) - Reward(motion.ctrl_cost),
            done: false,
            truncated: false,
            info,
        })
    }

    /// Release the simulator; later resets and steps fail
    pub fn close(&mut self) {
        if self.sim.take().is_some() {
            debug!(env = self.name, "closed simulator");
        }
        self.phase = EpisodePhase::Uninitialized;
    }

    /// Whether [`close`](Self::close) has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sim.is_none()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Simulator with scripted root motion, for exact reward checks

    use super::*;
    use crate::physics::ModelSpec;

    /// Moves the root forward at `velocity` regardless of controls
    pub struct ScriptedSimulator {
        model: ModelSpec,
        qpos: Vec<f64>,
        qvel: Vec<f64>,
        zeros: Vec<f64>,
        pub velocity: f64,
    }

    impl ScriptedSimulator {
        pub fn new(velocity: f64) -> Self {
            Self {
                model: ModelSpec {
                    resource: "scripted".to_string(),
                    frame_skip: 5,
                    timestep: 0.01,
                    nq: 3,
                    nv: 3,
                    nu: 2,
                },
                qpos: vec![0.0; 3],
                qvel: vec![0.0; 3],
                zeros: vec![0.0; 3],
                velocity,
            }
        }
    }

    impl Simulator for ScriptedSimulator {
        fn model(&self) -> &ModelSpec {
            &self.model
        }

        fn qpos(&self) -> &[f64] {
            &self.qpos
        }

        fn qvel(&self) -> &[f64] {
            &self.qvel
        }

        fn init_qpos(&self) -> &[f64] {
            &self.zeros
        }

        fn init_qvel(&self) -> &[f64] {
            &self.zeros
        }

        fn set_state(&mut self, qpos: &[f64], qvel: &[f64]) -> Result<()> {
            self.qpos = qpos.to_vec();
            self.qvel = qvel.to_vec();
            Ok(())
        }

        fn do_simulation(&mut self, _ctrl: &[f64], n_frames: usize) -> Result<()> {
            self.qpos[0] += self.velocity * self.model.timestep * n_frames as f64;
            self.qvel[0] = self.velocity;
            Ok(())
        }

        fn body_com(&self, _body: &str) -> Result<[f64; 3]> {
            Ok([self.qpos[0], 0.0, 0.5])
        }

        fn ctrl_range(&self) -> (Vec<f64>, Vec<f64>) {
            (vec![-1.0; 2], vec![1.0; 2])
        }
    }
}
