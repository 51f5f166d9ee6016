use crate::agent::Agent;
use crate::config::{NeighborBackend, SimConfig, SimConfigError};
use crate::geometry::{Torus, wrap_angle};
use crate::metrics::{self, RunSummary, StepMetrics};
use crate::rng::{create_rng, resolve_seed};
use crate::spatial::SpatialIndex;
use rand::Rng;
use rand_chacha::ChaCha12Rng;
use rand_distr::{Normal, NormalError};
use std::f64::consts::TAU;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

#[derive(Clone, Debug)]
pub struct StepTimings {
    pub index_build_us: u64,
    pub sensing_us: u64,
    pub integrate_us: u64,
    pub total_us: u64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldInitError {
    #[error(transparent)]
    Config(#[from] SimConfigError),
    #[error("agent {index} lies outside the domain")]
    AgentOutOfBounds { index: usize },
    #[error("agent {index} has a non-finite heading")]
    NonFiniteHeading { index: usize },
    #[error("noise distribution: {0}")]
    Noise(#[from] NormalError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExperimentError {
    #[error("sample_every must be positive")]
    InvalidSampleEvery,
    #[error("steps ({actual}) exceed supported maximum ({max})")]
    TooManySteps { max: usize, actual: usize },
}

/// Owns the population and advances it one synchronous Vicsek step at a time.
pub struct World {
    agents: Vec<Agent>,
    config: SimConfig,
    torus: Torus,
    noise: Normal<f64>,
    rng: ChaCha12Rng,
    seed: u64,
    step_index: usize,
    index: SpatialIndex,
    /// Whether `index` was built from the current positions.
    index_fresh: bool,
    neighbor_buffer: Vec<usize>,
}

fn noise_for(eta: f64) -> Result<Normal<f64>, NormalError> {
    Normal::new(0.0, eta / 2.0)
}

fn random_agents(rng: &mut ChaCha12Rng, count: usize, torus: &Torus) -> Vec<Agent> {
    (0..count)
        .map(|_| {
            let position = torus.wrap([
                rng.random::<f64>() * torus.width,
                rng.random::<f64>() * torus.height,
            ]);
            Agent::new(position, wrap_angle(rng.random::<f64>() * TAU))
        })
        .collect()
}

impl World {
    pub const MAX_EXPERIMENT_STEPS: usize = 10_000_000;

    /// Build a world with `config.num_agents` uniformly placed agents.
    pub fn new(config: SimConfig) -> Result<Self, WorldInitError> {
        config.validate()?;
        let seed = resolve_seed(config.seed);
        let mut rng = create_rng(seed);
        let torus = Torus::new(config.width, config.height);
        let agents = random_agents(&mut rng, config.num_agents, &torus);
        Self::assemble(agents, config, seed, rng)
    }

    /// Build a world around explicit agents; `config.num_agents` is taken
    /// from `agents.len()`. Headings are canonicalized into `[0, 2π)`.
    pub fn with_agents(
        mut agents: Vec<Agent>,
        mut config: SimConfig,
    ) -> Result<Self, WorldInitError> {
        config.num_agents = agents.len();
        config.validate()?;
        let torus = Torus::new(config.width, config.height);
        for (index, agent) in agents.iter_mut().enumerate() {
            if torus.wrap(agent.position) != agent.position {
                return Err(WorldInitError::AgentOutOfBounds { index });
            }
            if !agent.heading.is_finite() {
                return Err(WorldInitError::NonFiniteHeading { index });
            }
            agent.heading = wrap_angle(agent.heading);
            agent.pending_heading = agent.heading;
            agent.highlighted = false;
        }
        let seed = resolve_seed(config.seed);
        Self::assemble(agents, config, seed, create_rng(seed))
    }

    fn assemble(
        agents: Vec<Agent>,
        config: SimConfig,
        seed: u64,
        rng: ChaCha12Rng,
    ) -> Result<Self, WorldInitError> {
        let noise = noise_for(config.eta)?;
        info!(
            seed,
            num_agents = agents.len(),
            width = config.width,
            height = config.height,
            backend = ?config.neighbor_backend,
            "world initialized"
        );
        Ok(Self {
            torus: Torus::new(config.width, config.height),
            index: SpatialIndex::new(config.neighbor_backend),
            index_fresh: false,
            neighbor_buffer: Vec::new(),
            step_index: 0,
            agents,
            config,
            noise,
            rng,
            seed,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn torus(&self) -> Torus {
        self.torus
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// The seed actually in use, including a clock-derived one.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn num_agents(&self) -> usize {
        self.agents.len()
    }

    pub fn width(&self) -> f64 {
        self.config.width
    }

    pub fn height(&self) -> f64 {
        self.config.height
    }

    pub fn radius(&self) -> f64 {
        self.config.radius
    }

    pub fn eta(&self) -> f64 {
        self.config.eta
    }

    pub fn speed(&self) -> f64 {
        self.config.speed
    }

    /// Validate `edit` applied to a copy of the config before committing it.
    fn try_update(&mut self, edit: impl FnOnce(&mut SimConfig)) -> Result<(), WorldInitError> {
        let mut next = self.config.clone();
        edit(&mut next);
        next.validate()?;
        self.config = next;
        Ok(())
    }

    /// Set η and re-derive the noise distribution from it.
    pub fn set_eta(&mut self, eta: f64) -> Result<(), WorldInitError> {
        let mut next = self.config.clone();
        next.eta = eta;
        next.validate()?;
        self.noise = noise_for(eta)?;
        self.config = next;
        debug!(eta, "noise scale updated");
        Ok(())
    }

    pub fn set_radius(&mut self, radius: f64) -> Result<(), WorldInitError> {
        self.try_update(|c| c.radius = radius)?;
        debug!(radius, "interaction radius updated");
        Ok(())
    }

    pub fn set_speed(&mut self, speed: f64) -> Result<(), WorldInitError> {
        self.try_update(|c| c.speed = speed)?;
        debug!(speed, "speed updated");
        Ok(())
    }

    /// Resize the domain. Existing agents keep their step-to-step identity
    /// and are wrapped into the new bounds.
    pub fn set_domain_size(&mut self, width: f64, height: f64) -> Result<(), WorldInitError> {
        self.try_update(|c| {
            c.width = width;
            c.height = height;
        })?;
        self.torus = Torus::new(width, height);
        for agent in &mut self.agents {
            agent.position = self.torus.wrap(agent.position);
        }
        self.index_fresh = false;
        info!(width, height, "domain resized");
        Ok(())
    }

    /// Replace the population with `count` fresh random agents and reset
    /// the step counter.
    pub fn set_num_agents(&mut self, count: usize) -> Result<(), WorldInitError> {
        self.try_update(|c| c.num_agents = count)?;
        self.reset();
        Ok(())
    }

    pub fn set_neighbor_backend(&mut self, backend: NeighborBackend) {
        self.config.neighbor_backend = backend;
        self.index = SpatialIndex::new(backend);
        self.index_fresh = false;
        debug!(?backend, "neighbor backend switched");
    }

    pub fn set_parallel_sensing(&mut self, enabled: bool) {
        self.config.parallel_sensing = enabled;
    }

    /// Redistribute every agent uniformly at random and zero the step counter.
    pub fn reset(&mut self) {
        self.agents = random_agents(&mut self.rng, self.config.num_agents, &self.torus);
        self.step_index = 0;
        self.index_fresh = false;
        info!(num_agents = self.agents.len(), "population reshuffled");
    }

    fn rebuild_index(&mut self) {
        let rejected = self.index.rebuild(
            &self.agents,
            &self.torus,
            self.config.quadtree_capacity,
            self.config.quadtree_mul,
        );
        if rejected > 0 {
            warn!(rejected, "agents outside the domain were left out of the index");
        }
        self.index_fresh = true;
    }

    fn ensure_index(&mut self) {
        if !self.index_fresh {
            self.rebuild_index();
        }
    }

    /// Indices of agents within the interaction radius of `point`
    /// (through the domain edges). Out-of-domain points yield nothing.
    pub fn neighbors_of(&mut self, point: [f64; 2]) -> Vec<usize> {
        self.ensure_index();
        let mut out = Vec::new();
        self.index.neighbors(
            &self.agents,
            &self.torus,
            point,
            self.config.radius,
            &mut out,
        );
        out
    }

    /// Mark the neighbors of `point` as highlighted until the next step.
    /// Returns how many agents were marked.
    pub fn highlight_neighbors(&mut self, point: [f64; 2]) -> usize {
        let neighbors = self.neighbors_of(point);
        for &i in &neighbors {
            self.agents[i].highlighted = true;
        }
        neighbors.len()
    }

    /// Average normalized velocity of the current headings.
    pub fn order_parameter(&self) -> f64 {
        metrics::average_normalized_velocity(&self.agents)
    }

    pub fn step_metrics(&self) -> StepMetrics {
        StepMetrics {
            step: self.step_index,
            order_parameter: self.order_parameter(),
            density: self.config.density(),
            num_agents: self.agents.len(),
        }
    }

    /// Advance every agent by one synchronous step: sense all neighbors
    /// against current headings, then integrate.
    pub fn step(&mut self) -> StepTimings {
        let total_start = Instant::now();
        self.step_index = self.step_index.saturating_add(1);

        let t0 = Instant::now();
        self.rebuild_index();
        let index_build_us = t0.elapsed().as_micros() as u64;

        let t1 = Instant::now();
        self.step_sensing_phase();
        let sensing_us = t1.elapsed().as_micros() as u64;

        let t2 = Instant::now();
        self.step_integrate_phase();
        self.index_fresh = false;
        let integrate_us = t2.elapsed().as_micros() as u64;

        let timings = StepTimings {
            index_build_us,
            sensing_us,
            integrate_us,
            total_us: total_start.elapsed().as_micros() as u64,
        };
        trace!(step = self.step_index, ?timings, "step complete");
        timings
    }

    /// Run `steps` steps, sampling metrics every `sample_every` steps and
    /// after the last one.
    pub fn run_experiment(
        &mut self,
        steps: usize,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if steps > Self::MAX_EXPERIMENT_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: steps,
            });
        }
        let mut samples = Vec::with_capacity(steps / sample_every + 1);
        for step in 1..=steps {
            self.step();
            if step % sample_every == 0 || step == steps {
                samples.push(self.step_metrics());
            }
        }
        Ok(RunSummary {
            schema_version: 1,
            seed: self.seed,
            steps,
            sample_every,
            samples,
            final_order_parameter: self.order_parameter(),
        })
    }
}

mod phases;
