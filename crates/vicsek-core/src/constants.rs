/// Largest accepted domain side (world units).
pub const MAX_DOMAIN_SIZE: f64 = 1.0e6;

/// Largest accepted population.
pub const MAX_AGENTS: usize = 1_000_000;

/// Below this magnitude the summed heading vector has no usable direction
/// and the agent keeps its current heading.
pub const CIRCULAR_MEAN_EPSILON: f64 = 1e-9;

/// Relative padding applied to index range queries so rounding in the
/// rectangle bounds never drops a candidate the exact distance test accepts.
pub const QUERY_PADDING: f64 = 1e-9;
