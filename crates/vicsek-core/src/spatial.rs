use crate::agent::Agent;
use crate::config::NeighborBackend;
use crate::constants::QUERY_PADDING;
use crate::geometry::{Rect, Torus};
use crate::quadtree::QuadTree;
use rstar::{AABB, RTree, RTreeObject};

/// Lightweight position-only struct for spatial indexing to avoid cloning full agents.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentLocation {
    /// Index into the population slice the index was built from.
    pub index: usize,
    pub position: [f64; 2],
}

impl RTreeObject for AgentLocation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

fn locations(agents: &[Agent]) -> impl Iterator<Item = AgentLocation> + '_ {
    agents.iter().enumerate().map(|(index, a)| AgentLocation {
        index,
        position: a.position,
    })
}

fn accepts_query(torus: &Torus, point: [f64; 2]) -> bool {
    !torus.is_degenerate() && torus.contains(point)
}

/// Indices (ascending) of every agent whose position, or one of its four
/// edge images, lies strictly within `radius` of `point`. Replaces the
/// contents of `out`.
///
/// Query points outside the domain and zero-area domains yield nothing.
pub fn neighbors_brute_force(
    agents: &[Agent],
    torus: &Torus,
    point: [f64; 2],
    radius: f64,
    out: &mut Vec<usize>,
) {
    out.clear();
    if !accepts_query(torus, point) {
        return;
    }
    let r_sq = radius * radius;
    out.extend(
        agents
            .iter()
            .enumerate()
            .filter(|(_, a)| torus.is_neighbor(point, a.position, r_sq))
            .map(|(i, _)| i),
    );
}

/// Neighbor-query backend. Index variants are snapshots of the positions
/// they were rebuilt from and must be rebuilt after agents move.
#[derive(Clone, Debug)]
pub enum SpatialIndex {
    BruteForce,
    QuadTree(QuadTree),
    RTree(RTree<AgentLocation>),
}

impl SpatialIndex {
    pub fn new(backend: NeighborBackend) -> Self {
        match backend {
            NeighborBackend::BruteForce => SpatialIndex::BruteForce,
            NeighborBackend::QuadTree => {
                SpatialIndex::QuadTree(QuadTree::new(Rect::new(0.0, 0.0, 0.0, 0.0), 1, 1))
            }
            NeighborBackend::RTree => SpatialIndex::RTree(RTree::new()),
        }
    }

    pub fn backend(&self) -> NeighborBackend {
        match self {
            SpatialIndex::BruteForce => NeighborBackend::BruteForce,
            SpatialIndex::QuadTree(_) => NeighborBackend::QuadTree,
            SpatialIndex::RTree(_) => NeighborBackend::RTree,
        }
    }

    /// Rebuild from current agent positions. Returns how many agents fell
    /// outside the domain and could not be indexed.
    pub fn rebuild(
        &mut self,
        agents: &[Agent],
        torus: &Torus,
        capacity: usize,
        mul: usize,
    ) -> usize {
        match self {
            SpatialIndex::BruteForce => 0,
            SpatialIndex::QuadTree(tree) => {
                tree.reset(torus.bounds(), capacity, mul);
                locations(agents).filter(|loc| !tree.insert(*loc)).count()
            }
            SpatialIndex::RTree(tree) => {
                let bounds = torus.bounds();
                let (inside, outside): (Vec<_>, Vec<_>) =
                    locations(agents).partition(|loc| bounds.contains(loc.position));
                *tree = RTree::bulk_load(inside);
                outside.len()
            }
        }
    }

    /// Same contract and result as [`neighbors_brute_force`].
    pub fn neighbors(
        &self,
        agents: &[Agent],
        torus: &Torus,
        point: [f64; 2],
        radius: f64,
        out: &mut Vec<usize>,
    ) {
        match self {
            SpatialIndex::BruteForce => neighbors_brute_force(agents, torus, point, radius, out),
            SpatialIndex::QuadTree(tree) => {
                neighbors_indexed(agents, torus, point, radius, out, |range, out| {
                    tree.query(range, out);
                });
            }
            SpatialIndex::RTree(tree) => {
                neighbors_indexed(agents, torus, point, radius, out, |range, out| {
                    let envelope = AABB::from_corners(
                        [range.x, range.y],
                        [range.x + range.w, range.y + range.h],
                    );
                    out.extend(tree.locate_in_envelope(&envelope).map(|loc| loc.index));
                });
            }
        }
    }
}

/// Candidate c is accepted through image offset o when it lies within
/// `radius` of `point - o`, so each offset gets its own range query. The
/// merged candidates are then held to the exact brute-force test.
fn neighbors_indexed(
    agents: &[Agent],
    torus: &Torus,
    point: [f64; 2],
    radius: f64,
    out: &mut Vec<usize>,
    mut candidates_in: impl FnMut(&Rect, &mut Vec<usize>),
) {
    out.clear();
    if !accepts_query(torus, point) {
        return;
    }
    let half_extent = radius + QUERY_PADDING * (radius + torus.width + torus.height);
    for offset in torus.image_offsets() {
        let center = [point[0] - offset[0], point[1] - offset[1]];
        candidates_in(&Rect::centered(center, half_extent), out);
    }

    out.sort_unstable();
    out.dedup();
    let r_sq = radius * radius;
    out.retain(|&i| torus.is_neighbor(point, agents[i].position, r_sq));
}
