//! Reduced-order planar half-cheetah

use metarl_core::{RLError, Result};

use super::{ModelSpec, Simulator};

const NQ: usize = 9;
const NU: usize = 6;

// Generalized coordinate layout, matching half_cheetah.xml
const ROOT_X: usize = 0;
const ROOT_Z: usize = 1;
const ROOT_PITCH: usize = 2;
const BACK_THIGH: usize = 3;
const FRONT_THIGH: usize = 6;
const FIRST_JOINT: usize = 3;

/// Physical constants of [`PlanarCheetah`]
#[derive(Debug, Clone)]
pub struct PlanarCheetahParams {
    /// Actuator gear ratios (bthigh, bshin, bfoot, fthigh, fshin, ffoot)
    pub gear: [f64; NU],
    /// Joint angle limits in radians
    pub joint_range: [(f64, f64); NU],
    /// Joint rotational inertia
    pub joint_inertia: f64,
    /// Joint viscous damping
    pub joint_damping: f64,
    /// Joint spring stiffness toward the rest pose
    pub joint_stiffness: f64,
    /// Body mass
    pub mass: f64,
    /// Ground reaction per unit of backward thigh sweep
    pub propulsion: f64,
    /// Linear drag on the root
    pub drag: f64,
    /// Vertical and pitch suspension stiffness
    pub suspension: f64,
    /// Vertical and pitch suspension damping
    pub suspension_damping: f64,
    /// Torso height above the root frame at rest
    pub torso_height: f64,
}

impl Default for PlanarCheetahParams {
    fn default() -> Self {
        Self {
            gear: [120.0, 90.0, 60.0, 120.0, 60.0, 30.0],
            joint_range: [
                (-0.52, 1.05),
                (-0.785, 0.785),
                (-0.4, 0.785),
                (-1.0, 0.7),
                (-1.2, 0.87),
                (-0.5, 0.5),
            ],
            joint_inertia: 1.0,
            joint_damping: 6.0,
            joint_stiffness: 240.0,
            mass: 14.0,
            propulsion: 90.0,
            drag: 15.0,
            suspension: 400.0,
            suspension_damping: 40.0,
            torso_height: 0.7,
        }
    }
}

/// Planar half-cheetah with simplified contact dynamics.
///
/// Nine generalized coordinates (root x, z, pitch and six leg joints) and six
/// torque actuators, integrated with semi-implicit Euler at 0.01 s over five
/// substeps per environment step. Legs drive the root forward through a
/// ground-reaction term proportional to backward thigh sweep.
#[derive(Debug, Clone)]
pub struct PlanarCheetah {
    model: ModelSpec,
    params: PlanarCheetahParams,
    qpos: Vec<f64>,
    qvel: Vec<f64>,
    init_qpos: Vec<f64>,
    init_qvel: Vec<f64>,
}

impl PlanarCheetah {
    /// Build the model at rest with default constants
    #[must_use]
    pub fn new() -> Self {
        Self::with_params(PlanarCheetahParams::default())
    }

    /// Build the model at rest with custom constants
    #[must_use]
    pub fn with_params(params: PlanarCheetahParams) -> Self {
        Self {
            model: ModelSpec {
                resource: "half_cheetah.xml".to_string(),
                frame_skip: 5,
                timestep: 0.01,
                nq: NQ,
                nv: NQ,
                nu: NU,
            },
            params,
            qpos: vec![0.0; NQ],
            qvel: vec![0.0; NQ],
            init_qpos: vec![0.0; NQ],
            init_qvel: vec![0.0; NQ],
        }
    }

    fn substep(&mut self, ctrl: &[f64]) {
        let p = &self.params;
        let h = self.model.timestep;

        // Leg joints: torque, damping and a spring toward the rest pose
        for (j, (&u, &gear)) in ctrl.iter().zip(&p.gear).enumerate() {
            let i = FIRST_JOINT + j;
            let torque = gear * u.clamp(-1.0, 1.0)
                - p.joint_damping * self.qvel[i]
                - p.joint_stiffness * self.qpos[i];
            self.qvel[i] += h * torque / p.joint_inertia;
        }

        // Backward thigh sweep pushes the body forward while the foot is down
        let sweep = -(self.qvel[BACK_THIGH] * self.qpos[BACK_THIGH].cos()
            + self.qvel[FRONT_THIGH] * self.qpos[FRONT_THIGH].cos());
        let ax = (p.propulsion * sweep - p.drag * self.qvel[ROOT_X]) / p.mass;
        let az = -p.suspension * self.qpos[ROOT_Z] - p.suspension_damping * self.qvel[ROOT_Z];
        let pitch_torque = 0.5 * (self.qvel[BACK_THIGH] - self.qvel[FRONT_THIGH]);
        let apitch = pitch_torque
            - p.suspension * self.qpos[ROOT_PITCH]
            - p.suspension_damping * self.qvel[ROOT_PITCH];

        self.qvel[ROOT_X] += h * ax;
        self.qvel[ROOT_Z] += h * az / p.mass;
        self.qvel[ROOT_PITCH] += h * apitch / p.mass;

        for (q, v) in self.qpos.iter_mut().zip(&self.qvel) {
            *q += h * v;
        }

        // Joint limits are hard stops
        for (j, &(lo, hi)) in self.params.joint_range.iter().enumerate() {
            let i = FIRST_JOINT + j;
            if self.qpos[i] < lo || self.qpos[i] > hi {
                self.qpos[i] = self.qpos[i].clamp(lo, hi);
                self.qvel[i] = 0.0;
            }
        }
    }
}

impl Default for PlanarCheetah {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator for PlanarCheetah {
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
        &self.init_qpos
    }

    fn init_qvel(&self) -> &[f64] {
        &self.init_qvel
    }

    fn set_state(&mut self, qpos: &[f64], qvel: &[f64]) -> Result<()> {
        if qpos.len() != self.model.nq || qvel.len() != self.model.nv {
            return Err(RLError::Simulation(format!(
                "state must be ({}, {}) wide, got ({}, {})",
                self.model.nq,
                self.model.nv,
                qpos.len(),
                qvel.len()
            )));
        }
        self.qpos.copy_from_slice(qpos);
        self.qvel.copy_from_slice(qvel);
        Ok(())
    }

    fn do_simulation(&mut self, ctrl: &[f64], n_frames: usize) -> Result<()> {
        if ctrl.len() != self.model.nu {
            return Err(RLError::Simulation(format!(
                "expected {} controls, got {}",
                self.model.nu,
                ctrl.len()
            )));
        }
        if ctrl.iter().any(|u| !u.is_finite()) {
            return Err(RLError::Simulation("non-finite control".to_string()));
        }
        for _ in 0..n_frames {
            self.substep(ctrl);
        }
        if self.qpos.iter().chain(&self.qvel).any(|x| !x.is_finite()) {
            return Err(RLError::Simulation("simulation diverged".to_string()));
        }
        Ok(())
    }

    fn body_com(&self, body: &str) -> Result<[f64; 3]> {
        match body {
            "torso" => Ok([
                self.qpos[ROOT_X],
                0.0,
                self.params.torso_height + self.qpos[ROOT_Z],
            ]),
            other => Err(RLError::Simulation(format!("unknown body `{other}`"))),
        }
    }

    fn ctrl_range(&self) -> (Vec<f64>, Vec<f64>) {
        (vec![-1.0; NU], vec![1.0; NU])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_model_shape() {
        let sim = PlanarCheetah::new();
        assert_eq!(sim.model().nq, 9);
        assert_eq!(sim.model().nv, 9);
        assert_eq!(sim.model().nu, 6);
        assert_relative_eq!(sim.dt(), 0.05);
        assert_eq!(sim.qpos(), sim.init_qpos());
    }

    #[test]
    fn test_rest_is_equilibrium() {
        let mut sim = PlanarCheetah::new();
        sim.do_simulation(&[0.0; 6], 50).unwrap();
        assert!(sim.qpos().iter().all(|&q| q.abs() < 1e-12));
        assert_eq!(sim.body_com("torso").unwrap(), [0.0, 0.0, 0.7]);
    }

    #[test]
    fn test_controls_move_the_body() {
        let mut sim = PlanarCheetah::new();
        let x0 = sim.qpos()[0];
        sim.do_simulation(&[-1.0, 0.0, 0.0, -1.0, 0.0, 0.0], 5).unwrap();
        assert!(sim.qpos()[0] != x0);
        assert!(sim.qpos().iter().chain(sim.qvel()).all(|x| x.is_finite()));
    }

    #[test]
    fn test_bad_inputs_are_simulation_errors() {
        let mut sim = PlanarCheetah::new();
        assert!(matches!(
            sim.do_simulation(&[0.0; 5], 1),
            Err(RLError::Simulation(_))
        ));
        assert!(matches!(
            sim.set_state(&[0.0; 8], &[0.0; 9]),
            Err(RLError::Simulation(_))
        ));
        assert!(matches!(sim.body_com("tail"), Err(RLError::Simulation(_))));
    }
}
