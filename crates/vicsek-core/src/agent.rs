#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
    pub position: [f64; 2],
    /// Current heading in radians, kept in `[0, 2π)` between steps.
    pub heading: f64,
    /// Heading staged during sensing and committed during integration.
    pub pending_heading: f64,
    /// Display flag set by neighbor highlighting, cleared by every step.
    pub highlighted: bool,
}

impl Agent {
    pub fn new(position: [f64; 2], heading: f64) -> Self {
        Self {
            position,
            heading,
            pending_heading: heading,
            highlighted: false,
        }
    }

    /// Unit vector pointing along the current heading.
    pub fn direction(&self) -> [f64; 2] {
        let (sin, cos) = self.heading.sin_cos();
        [cos, sin]
    }
}
