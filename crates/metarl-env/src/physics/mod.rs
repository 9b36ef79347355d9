//! Physics-engine interface used by the locomotion environments
//!
//! The locomotion family only needs a small slice of a rigid-body engine:
//! generalized positions and velocities, state overwrite, stepping with a
//! control vector and body centre-of-mass queries. Any engine exposing
//! those through [`Simulator`] can back a locomotion environment.

mod planar;

pub use planar::{PlanarCheetah, PlanarCheetahParams};

use metarl_core::Result;

/// Static description of a loaded model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    /// Model resource the simulator was built from
    pub resource: String,
    /// Engine substeps per environment step
    pub frame_skip: usize,
    /// Engine integration timestep in seconds
    pub timestep: f64,
    /// Number of generalized coordinates
    pub nq: usize,
    /// Number of generalized velocities
    pub nv: usize,
    /// Number of actuators
    pub nu: usize,
}

impl ModelSpec {
    /// Simulated seconds per environment step
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.timestep * self.frame_skip as f64
    }
}

/// Rigid-body simulator behind a locomotion environment.
///
/// `qpos()[0]` must be the forward (x) coordinate of the root body.
pub trait Simulator: Send + Sync {
    /// Model description
    fn model(&self) -> &ModelSpec;

    /// Current generalized positions
    fn qpos(&self) -> &[f64];

    /// Current generalized velocities
    fn qvel(&self) -> &[f64];

    /// Generalized positions of the model's rest pose
    fn init_qpos(&self) -> &[f64];

    /// Generalized velocities of the model's rest pose
    fn init_qvel(&self) -> &[f64];

    /// Overwrite the full simulator state
    fn set_state(&mut self, qpos: &[f64], qvel: &[f64]) -> Result<()>;

    /// Advance `n_frames` engine substeps holding `ctrl` constant
    fn do_simulation(&mut self, ctrl: &[f64], n_frames: usize) -> Result<()>;

    /// World-frame centre of mass of a named body
    fn body_com(&self, body: &str) -> Result<[f64; 3]>;

    /// Per-actuator control bounds as `(low, high)`
    fn ctrl_range(&self) -> (Vec<f64>, Vec<f64>);

    /// Simulated seconds per environment step
    fn dt(&self) -> f64 {
        self.model().dt()
    }
}
