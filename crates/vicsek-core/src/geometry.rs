use std::f64::consts::TAU;

/// Axis-aligned closed rectangle: `[x, x + w] × [y, y + h]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Square of half-size `half_extent` around `center`.
    pub fn centered(center: [f64; 2], half_extent: f64) -> Self {
        Self {
            x: center[0] - half_extent,
            y: center[1] - half_extent,
            w: 2.0 * half_extent,
            h: 2.0 * half_extent,
        }
    }

    pub fn contains(&self, point: [f64; 2]) -> bool {
        point[0] >= self.x
            && point[0] <= self.x + self.w
            && point[1] >= self.y
            && point[1] <= self.y + self.h
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !(other.x > self.x + self.w
            || other.x + other.w < self.x
            || other.y > self.y + self.h
            || other.y + other.h < self.y)
    }

    fn midpoint(&self) -> [f64; 2] {
        [self.x + self.w / 2.0, self.y + self.h / 2.0]
    }

    /// Four equal quadrants in `[nw, ne, sw, se]` order (y grows southwards).
    pub fn quadrants(&self) -> [Rect; 4] {
        let half_w = self.w / 2.0;
        let half_h = self.h / 2.0;
        let [mid_x, mid_y] = self.midpoint();
        [
            Rect::new(self.x, self.y, half_w, half_h),
            Rect::new(mid_x, self.y, self.w - half_w, half_h),
            Rect::new(self.x, mid_y, half_w, self.h - half_h),
            Rect::new(mid_x, mid_y, self.w - half_w, self.h - half_h),
        ]
    }

    /// Index into [`Rect::quadrants`] owning `point`. Points on a splitting
    /// line go to the west / north side.
    pub fn quadrant_of(&self, point: [f64; 2]) -> usize {
        let [mid_x, mid_y] = self.midpoint();
        let east = point[0] > mid_x;
        let south = point[1] > mid_y;
        (south as usize) * 2 + east as usize
    }
}

/// Rectangular domain whose opposite edges are identified.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Torus {
    pub width: f64,
    pub height: f64,
}

impl Torus {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Zero-area domains never report neighbors.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Whether `point` is a valid query point (edges included).
    pub fn contains(&self, point: [f64; 2]) -> bool {
        point[0] >= 0.0 && point[0] <= self.width && point[1] >= 0.0 && point[1] <= self.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// Translations applied to a candidate before the distance test: itself
    /// and its east, north, west and south images.
    pub fn image_offsets(&self) -> [[f64; 2]; 5] {
        [
            [0.0, 0.0],
            [self.width, 0.0],
            [0.0, -self.height],
            [-self.width, 0.0],
            [0.0, self.height],
        ]
    }

    /// True if any of the five images of `candidate` lies strictly closer
    /// than `sqrt(radius_sq)` to `point`.
    pub fn is_neighbor(&self, point: [f64; 2], candidate: [f64; 2], radius_sq: f64) -> bool {
        self.image_offsets().iter().any(|offset| {
            let dx = point[0] - (candidate[0] + offset[0]);
            let dy = point[1] - (candidate[1] + offset[1]);
            dx * dx + dy * dy < radius_sq
        })
    }

    pub fn wrap(&self, point: [f64; 2]) -> [f64; 2] {
        [
            wrap_into(point[0], self.width),
            wrap_into(point[1], self.height),
        ]
    }
}

/// Map an angle into `[0, 2π)`.
pub fn wrap_angle(theta: f64) -> f64 {
    wrap_into(theta, TAU)
}

/// Map `value` into `[0, extent)`; collapses to 0 on an empty extent.
fn wrap_into(value: f64, extent: f64) -> f64 {
    if !(extent > 0.0) {
        return 0.0;
    }
    let wrapped = value.rem_euclid(extent);
    // rem_euclid of a tiny negative value can round up to `extent` itself.
    if wrapped >= extent { 0.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadrants_partition_parent() {
        let r = Rect::new(10.0, 20.0, 40.0, 60.0);
        let [nw, ne, sw, se] = r.quadrants();
        assert_eq!(nw, Rect::new(10.0, 20.0, 20.0, 30.0));
        assert_eq!(ne, Rect::new(30.0, 20.0, 20.0, 30.0));
        assert_eq!(sw, Rect::new(10.0, 50.0, 20.0, 30.0));
        assert_eq!(se, Rect::new(30.0, 50.0, 20.0, 30.0));
    }

    #[test]
    fn splitting_line_belongs_to_west_and_north() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(r.quadrant_of([5.0, 5.0]), 0);
        assert_eq!(r.quadrant_of([5.1, 5.0]), 1);
        assert_eq!(r.quadrant_of([5.0, 5.1]), 2);
        assert_eq!(r.quadrant_of([9.0, 9.0]), 3);
    }

    #[test]
    fn rect_contains_is_closed() {
        let r = Rect::new(0.0, 0.0, 1.0, 1.0);
        assert!(r.contains([0.0, 0.0]));
        assert!(r.contains([1.0, 1.0]));
        assert!(!r.contains([1.0 + 1e-12, 0.5]));
        assert!(!r.contains([f64::NAN, 0.5]));
    }

    #[test]
    fn rect_intersection_includes_touching_edges() {
        let a = Rect::new(0.0, 0.0, 1.0, 1.0);
        assert!(a.intersects(&Rect::new(1.0, 1.0, 1.0, 1.0)));
        assert!(a.intersects(&Rect::new(-5.0, 0.25, 10.0, 0.5)));
        assert!(!a.intersects(&Rect::new(1.5, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn neighbor_test_sees_through_each_edge() {
        let torus = Torus::new(100.0, 100.0);
        let r_sq = 4.0;
        assert!(torus.is_neighbor([1.0, 50.0], [99.5, 50.0], r_sq));
        assert!(torus.is_neighbor([99.5, 50.0], [1.0, 50.0], r_sq));
        assert!(torus.is_neighbor([50.0, 1.0], [50.0, 99.5], r_sq));
        assert!(torus.is_neighbor([50.0, 99.5], [50.0, 1.0], r_sq));
        // Exactly the radius apart through an edge is not a neighbor.
        assert!(!torus.is_neighbor([1.0, 50.0], [99.0, 50.0], r_sq));
        assert!(!torus.is_neighbor([50.0, 1.0], [50.0, 99.0], r_sq));
        assert!(!torus.is_neighbor([50.0, 50.0], [53.0, 50.0], r_sq));
    }

    #[test]
    fn neighbor_test_uses_strict_inequality() {
        let torus = Torus::new(100.0, 100.0);
        assert!(!torus.is_neighbor([10.0, 10.0], [12.0, 10.0], 4.0));
        assert!(!torus.is_neighbor([10.0, 10.0], [10.0, 10.0], 0.0));
    }

    #[test]
    fn wrap_handles_both_directions() {
        let torus = Torus::new(100.0, 50.0);
        let p = torus.wrap([-1.0, 51.0]);
        assert!((p[0] - 99.0).abs() < 1e-12);
        assert!((p[1] - 1.0).abs() < 1e-12);
        assert_eq!(torus.wrap([100.0, 50.0]), [0.0, 0.0]);
        assert_eq!(torus.wrap([-1e-300, 0.0]), [0.0, 0.0]);
    }

    #[test]
    fn wrap_angle_lands_in_canonical_range() {
        for theta in [-TAU - 0.5, -0.1, 0.0, TAU, TAU + 0.1, 3.0 * TAU] {
            let w = wrap_angle(theta);
            assert!((0.0..TAU).contains(&w), "{theta} -> {w}");
        }
    }

    #[test]
    fn degenerate_torus_wraps_to_origin() {
        let torus = Torus::new(0.0, 10.0);
        assert!(torus.is_degenerate());
        assert_eq!(torus.wrap([3.0, 3.0])[0], 0.0);
    }
}
