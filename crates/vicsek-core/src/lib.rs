pub mod agent;
pub mod config;
pub mod constants;
pub mod geometry;
pub mod metrics;
pub mod quadtree;
pub mod rng;
pub mod spatial;
pub mod world;

pub use config::{NeighborBackend, SimConfig, SimConfigError};
pub use metrics::{ResultEntry, ResultLog, RunSummary, StepMetrics};
pub use world::{ExperimentError, StepTimings, World, WorldInitError};
