use crate::agent::Agent;
use crate::constants::CIRCULAR_MEAN_EPSILON;
use rayon::prelude::*;

use super::super::World;

/// Angle of the summed unit heading vectors of `neighbors`, or `None` when
/// the sum is too short to define a direction (empty set, or headings that
/// cancel out).
pub(in crate::world) fn circular_mean(agents: &[Agent], neighbors: &[usize]) -> Option<f64> {
    let [sum_x, sum_y] = neighbors.iter().fold([0.0, 0.0], |acc, &i| {
        let [dx, dy] = agents[i].direction();
        [acc[0] + dx, acc[1] + dy]
    });
    if sum_x.hypot(sum_y) < CIRCULAR_MEAN_EPSILON {
        None
    } else {
        Some(sum_y.atan2(sum_x))
    }
}

impl World {
    /// Stage every agent's next heading from its neighbors' current
    /// headings. Only `pending_heading` is written.
    pub(in crate::world) fn step_sensing_phase(&mut self) {
        let radius = self.config.radius;

        if self.config.parallel_sensing {
            let agents = &self.agents;
            let index = &self.index;
            let torus = &self.torus;
            let pending: Vec<f64> = agents
                .par_iter()
                .map_init(Vec::new, |neighbors, agent| {
                    index.neighbors(agents, torus, agent.position, radius, neighbors);
                    circular_mean(agents, neighbors).unwrap_or(agent.heading)
                })
                .collect();
            for (agent, heading) in self.agents.iter_mut().zip(pending) {
                agent.pending_heading = heading;
            }
            return;
        }

        for i in 0..self.agents.len() {
            let agent = &self.agents[i];
            self.index.neighbors(
                &self.agents,
                &self.torus,
                agent.position,
                radius,
                &mut self.neighbor_buffer,
            );
            let heading =
                circular_mean(&self.agents, &self.neighbor_buffer).unwrap_or(agent.heading);
            self.agents[i].pending_heading = heading;
        }
    }
}
