use crate::constants::{MAX_AGENTS, MAX_DOMAIN_SIZE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which structure answers the per-agent neighbor queries.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NeighborBackend {
    /// Linear scan over the whole population.
    BruteForce,
    #[default]
    QuadTree,
    /// `rstar` R*-tree, bulk loaded every step.
    RTree,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for positions, headings and noise. `None` seeds from the clock.
    pub seed: Option<u64>,
    /// Domain width in world units.
    pub width: f64,
    /// Domain height in world units.
    pub height: f64,
    /// Number of agents.
    pub num_agents: usize,
    /// Interaction radius.
    pub radius: f64,
    /// Noise scale η; angular noise is drawn from Normal(0, η/2).
    pub eta: f64,
    /// Distance travelled per step.
    pub speed: f64,
    pub neighbor_backend: NeighborBackend,
    /// Items a root-level quadtree node holds before it splits.
    pub quadtree_capacity: usize,
    /// Capacity multiplier applied at each quadtree level.
    pub quadtree_mul: usize,
    /// Compute pending headings on the rayon thread pool.
    pub parallel_sensing: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: None,
            width: 100.0,
            height: 100.0,
            num_agents: 1000,
            radius: 2.0,
            eta: 0.5,
            speed: 0.5,
            neighbor_backend: NeighborBackend::QuadTree,
            quadtree_capacity: 8,
            quadtree_mul: 1,
            parallel_sensing: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimConfigError {
    #[error("width and height must be finite and non-negative")]
    InvalidDomainSize,
    #[error("domain side ({actual}) exceeds supported maximum ({max})")]
    DomainTooLarge { max: f64, actual: f64 },
    #[error("too many agents: {actual} > max {max}")]
    TooManyAgents { max: usize, actual: usize },
    #[error("radius must be finite and non-negative")]
    InvalidRadius,
    #[error("eta must be finite and non-negative")]
    InvalidEta,
    #[error("speed must be finite and non-negative")]
    InvalidSpeed,
    #[error("speed ({speed}) must not exceed the shorter domain side ({side})")]
    SpeedExceedsDomain { speed: f64, side: f64 },
    #[error("quadtree_capacity must be positive")]
    InvalidQuadtreeCapacity,
    #[error("quadtree_mul must be positive")]
    InvalidQuadtreeMul,
}

fn finite_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), SimConfigError> {
        self.validate_domain()?;
        self.validate_physics()?;
        self.validate_index()?;
        Ok(())
    }

    fn validate_domain(&self) -> Result<(), SimConfigError> {
        if !finite_non_negative(self.width) || !finite_non_negative(self.height) {
            return Err(SimConfigError::InvalidDomainSize);
        }
        let largest = self.width.max(self.height);
        if largest > MAX_DOMAIN_SIZE {
            return Err(SimConfigError::DomainTooLarge {
                max: MAX_DOMAIN_SIZE,
                actual: largest,
            });
        }
        if self.num_agents > MAX_AGENTS {
            return Err(SimConfigError::TooManyAgents {
                max: MAX_AGENTS,
                actual: self.num_agents,
            });
        }
        Ok(())
    }

    fn validate_physics(&self) -> Result<(), SimConfigError> {
        if !finite_non_negative(self.radius) {
            return Err(SimConfigError::InvalidRadius);
        }
        if !finite_non_negative(self.eta) {
            return Err(SimConfigError::InvalidEta);
        }
        if !finite_non_negative(self.speed) {
            return Err(SimConfigError::InvalidSpeed);
        }
        let side = self.width.min(self.height);
        if side > 0.0 && self.speed > side {
            return Err(SimConfigError::SpeedExceedsDomain {
                speed: self.speed,
                side,
            });
        }
        Ok(())
    }

    fn validate_index(&self) -> Result<(), SimConfigError> {
        if self.quadtree_capacity == 0 {
            return Err(SimConfigError::InvalidQuadtreeCapacity);
        }
        if self.quadtree_mul == 0 {
            return Err(SimConfigError::InvalidQuadtreeMul);
        }
        Ok(())
    }

    /// Agents per unit area; 0 for a zero-area domain.
    pub fn density(&self) -> f64 {
        let area = self.width * self.height;
        if area > 0.0 {
            self.num_agents as f64 / area
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn degenerate_but_well_formed_configs_are_accepted() {
        let config = SimConfig {
            width: 0.0,
            height: 0.0,
            num_agents: 0,
            radius: 0.0,
            eta: 0.0,
            speed: 0.0,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.density(), 0.0);
    }

    #[test]
    fn rejects_bad_domain() {
        for (width, height) in [(-1.0, 10.0), (10.0, f64::NAN), (f64::INFINITY, 1.0)] {
            let config = SimConfig {
                width,
                height,
                ..SimConfig::default()
            };
            assert_eq!(config.validate(), Err(SimConfigError::InvalidDomainSize));
        }
        let config = SimConfig {
            width: MAX_DOMAIN_SIZE * 2.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::DomainTooLarge { .. })
        ));
    }

    #[test]
    fn rejects_bad_physics() {
        let bad_radius = SimConfig {
            radius: -0.5,
            ..SimConfig::default()
        };
        assert_eq!(bad_radius.validate(), Err(SimConfigError::InvalidRadius));

        let bad_eta = SimConfig {
            eta: f64::NAN,
            ..SimConfig::default()
        };
        assert_eq!(bad_eta.validate(), Err(SimConfigError::InvalidEta));

        let too_fast = SimConfig {
            width: 10.0,
            height: 5.0,
            speed: 6.0,
            ..SimConfig::default()
        };
        assert_eq!(
            too_fast.validate(),
            Err(SimConfigError::SpeedExceedsDomain {
                speed: 6.0,
                side: 5.0
            })
        );
    }

    #[test]
    fn rejects_zero_quadtree_parameters() {
        let config = SimConfig {
            quadtree_capacity: 0,
            ..SimConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimConfigError::InvalidQuadtreeCapacity)
        );
        let config = SimConfig {
            quadtree_mul: 0,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidQuadtreeMul));
    }

    #[test]
    fn json_round_trip_uses_snake_case_backends() {
        let json = r#"{"width": 50.0, "neighbor_backend": "r_tree", "seed": 9}"#;
        let config: SimConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.width, 50.0);
        assert_eq!(config.height, 100.0);
        assert_eq!(config.neighbor_backend, NeighborBackend::RTree);
        assert_eq!(config.seed, Some(9));
        let back = serde_json::to_string(&config).unwrap();
        assert!(back.contains("\"r_tree\""));
    }
}
