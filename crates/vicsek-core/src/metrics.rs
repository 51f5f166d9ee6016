use crate::agent::Agent;
use serde::{Deserialize, Serialize};

/// Magnitude of the mean unit heading vector, in `[0, 1]`: 1 when every
/// agent points the same way, near 0 for random headings. 0 for an empty
/// population.
pub fn average_normalized_velocity(agents: &[Agent]) -> f64 {
    if agents.is_empty() {
        return 0.0;
    }
    let [sum_x, sum_y] = agents.iter().fold([0.0, 0.0], |acc, a| {
        let [dx, dy] = a.direction();
        [acc[0] + dx, acc[1] + dy]
    });
    (sum_x.hypot(sum_y) / agents.len() as f64).min(1.0)
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StepMetrics {
    pub step: usize,
    pub order_parameter: f64,
    pub density: f64,
    pub num_agents: usize,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub seed: u64,
    pub steps: usize,
    pub sample_every: usize,
    pub samples: Vec<StepMetrics>,
    pub final_order_parameter: f64,
}

/// One row of an experiment: the parameters of a run and what it measured.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct ResultEntry {
    pub steps_per_second: f64,
    pub width: f64,
    pub height: f64,
    pub density: f64,
    pub num_agents: usize,
    pub steps: usize,
    pub avg_normalized_velocity: f64,
    pub speed: f64,
    pub eta: f64,
    pub radius: f64,
}

/// In-memory experiment rows with steady-state detection.
#[derive(Clone, Debug, Default)]
pub struct ResultLog {
    entries: Vec<ResultEntry>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, entry: ResultEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ResultEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// True once the mean order parameter of the last `window` rows is
    /// within `tolerance` of the mean over the `window` rows before them.
    /// Needs at least `2 * window` rows; a zero window is never stable.
    pub fn is_stable(&self, window: usize, tolerance: f64) -> bool {
        if window == 0 || self.entries.len() < 2 * window {
            return false;
        }
        let n = self.entries.len();
        let mean = |rows: &[ResultEntry]| {
            rows.iter().map(|e| e.avg_normalized_velocity).sum::<f64>() / rows.len() as f64
        };
        let recent = mean(&self.entries[n - window..]);
        let previous = mean(&self.entries[n - 2 * window..n - window]);
        (recent - previous).abs() <= tolerance
    }

    /// Field-wise mean of the last `n` rows (fewer if the log is shorter).
    /// Counts are averaged with rounding; `steps` is summed.
    pub fn avg_last_n(&self, n: usize) -> Option<ResultEntry> {
        let take = n.min(self.entries.len());
        if take == 0 {
            return None;
        }
        let rows = &self.entries[self.entries.len() - take..];
        let k = take as f64;
        let avg = |f: fn(&ResultEntry) -> f64| rows.iter().map(f).sum::<f64>() / k;
        Some(ResultEntry {
            steps_per_second: avg(|e| e.steps_per_second),
            width: avg(|e| e.width),
            height: avg(|e| e.height),
            density: avg(|e| e.density),
            num_agents: avg(|e| e.num_agents as f64).round() as usize,
            steps: rows.iter().map(|e| e.steps).sum(),
            avg_normalized_velocity: avg(|e| e.avg_normalized_velocity),
            speed: avg(|e| e.speed),
            eta: avg(|e| e.eta),
            radius: avg(|e| e.radius),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn entry(anv: f64) -> ResultEntry {
        ResultEntry {
            avg_normalized_velocity: anv,
            num_agents: 10,
            steps: 100,
            eta: 0.5,
            ..ResultEntry::default()
        }
    }

    #[test]
    fn aligned_agents_have_unit_order() {
        let agents: Vec<Agent> = (0..20).map(|i| Agent::new([i as f64, 0.0], 1.2)).collect();
        assert!((average_normalized_velocity(&agents) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn opposed_agents_cancel() {
        let agents = vec![
            Agent::new([0.0, 0.0], 0.0),
            Agent::new([0.0, 0.0], PI),
            Agent::new([0.0, 0.0], FRAC_PI_2),
            Agent::new([0.0, 0.0], 3.0 * FRAC_PI_2),
        ];
        assert!(average_normalized_velocity(&agents) < 1e-12);
    }

    #[test]
    fn empty_population_has_zero_order() {
        assert_eq!(average_normalized_velocity(&[]), 0.0);
    }

    #[test]
    fn stability_needs_two_full_windows() {
        let mut log = ResultLog::new();
        for _ in 0..5 {
            log.add_entry(entry(0.8));
        }
        assert!(!log.is_stable(3, 0.01));
        log.add_entry(entry(0.8));
        assert!(log.is_stable(3, 0.01));
        assert!(!log.is_stable(0, 0.01));
    }

    #[test]
    fn drifting_order_is_not_stable() {
        let mut log = ResultLog::new();
        for i in 0..8 {
            log.add_entry(entry(0.1 * i as f64));
        }
        assert!(!log.is_stable(4, 0.05));
        assert!(log.is_stable(4, 0.5));
    }

    #[test]
    fn avg_last_n_uses_tail_rows() {
        let mut log = ResultLog::new();
        assert!(log.avg_last_n(3).is_none());
        log.add_entry(entry(0.0));
        log.add_entry(entry(0.6));
        log.add_entry(entry(0.8));
        assert_eq!(log.len(), 3);
        assert_eq!(log.entries()[1].avg_normalized_velocity, 0.6);
        let avg = log.avg_last_n(2).unwrap();
        assert!((avg.avg_normalized_velocity - 0.7).abs() < 1e-12);
        assert_eq!(avg.steps, 200);
        assert_eq!(avg.num_agents, 10);
        assert!((avg.eta - 0.5).abs() < 1e-12);

        let all = log.avg_last_n(10).unwrap();
        assert_eq!(all.steps, 300);

        log.clear();
        assert!(log.is_empty());
    }
}
