//! Observation representations and observation spaces

use serde::{Deserialize, Serialize};

/// Fixed-width 32-bit float observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorObservation {
    /// The observation data
    pub data: Vec<f32>,
}

impl VectorObservation {
    /// Create an observation from raw data
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// All-zero observation of the given width
    #[must_use]
    pub fn zeros(width: usize) -> Self {
        Self {
            data: vec![0.0; width],
        }
    }

    /// Convert observation to a feature vector
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        self.data.iter().map(|&x| f64::from(x)).collect()
    }

    /// Width of the observation
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the observation is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Box observation space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxObservationSpace {
    /// Lower bounds
    pub low: Vec<f32>,
    /// Upper bounds
    pub high: Vec<f32>,
    /// Shape of observations
    pub shape: Vec<usize>,
}

impl BoxObservationSpace {
    /// Create a new box observation space
    pub fn new(low: Vec<f32>, high: Vec<f32>, shape: Vec<usize>) -> crate::Result<Self> {
        let total_size: usize = shape.iter().product();
        if low.len() != total_size {
            return Err(crate::RLError::DimensionMismatch {
                expected: total_size,
                actual: low.len(),
            });
        }
        if high.len() != total_size {
            return Err(crate::RLError::DimensionMismatch {
                expected: total_size,
                actual: high.len(),
            });
        }
        Ok(Self { low, high, shape })
    }

    /// Degenerate width-1 space fixed at zero
    #[must_use]
    pub fn zero_point() -> Self {
        Self {
            low: vec![0.0],
            high: vec![0.0],
            shape: vec![1],
        }
    }

    /// Unbounded 1-dimensional space of the given width
    #[must_use]
    pub fn unbounded(width: usize) -> Self {
        Self {
            low: vec![f32::NEG_INFINITY; width],
            high: vec![f32::INFINITY; width],
            shape: vec![width],
        }
    }

    /// Check if an observation is valid within this space
    #[must_use]
    pub fn contains(&self, obs: &VectorObservation) -> bool {
        obs.data.len() == self.low.len()
            && obs
                .data
                .iter()
                .zip(&self.low)
                .zip(&self.high)
                .all(|((x, l), h)| x >= l && x <= h)
    }

    /// Shape of observations in this space
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_point_contains_only_zero() {
        let space = BoxObservationSpace::zero_point();
        assert!(space.contains(&VectorObservation::zeros(1)));
        assert!(!space.contains(&VectorObservation::new(vec![0.5])));
        assert!(!space.contains(&VectorObservation::zeros(2)));
    }

    #[test]
    fn test_new_checks_shape() {
        assert!(BoxObservationSpace::new(vec![0.0; 4], vec![1.0; 4], vec![2, 2]).is_ok());
        assert!(BoxObservationSpace::new(vec![0.0; 3], vec![1.0; 4], vec![4]).is_err());
    }
}
