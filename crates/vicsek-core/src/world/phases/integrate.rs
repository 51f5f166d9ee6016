use crate::geometry::wrap_angle;
use rand_distr::Distribution;

use super::super::World;

impl World {
    /// Commit staged headings with noise, move, and wrap back into range.
    pub(in crate::world) fn step_integrate_phase(&mut self) {
        let speed = self.config.speed;
        let torus = self.torus;
        let noise = &self.noise;
        let rng = &mut self.rng;

        for agent in &mut self.agents {
            let heading = agent.pending_heading + noise.sample(rng);
            let (sin, cos) = heading.sin_cos();
            agent.position = torus.wrap([
                agent.position[0] + speed * cos,
                agent.position[1] + speed * sin,
            ]);
            agent.heading = wrap_angle(heading);
            agent.highlighted = false;
        }
    }
}
