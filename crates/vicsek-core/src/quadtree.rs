//! Region quadtree over a flat rectangle, stored as an index arena.
//!
//! A node keeps up to `capacity` items locally. The insert that finds a leaf
//! full splits it into four quadrants (once) and continues into the quadrant
//! owning the point; items already held by the node stay where they are.
//! Children inherit `capacity * mul`, so `mul > 1` trades deeper local lists
//! for a shallower tree under clustering.

use crate::geometry::Rect;
use crate::spatial::AgentLocation;

const ROOT: usize = 0;

#[derive(Clone, Debug)]
struct Node {
    boundary: Rect,
    capacity: usize,
    level: usize,
    items: Vec<AgentLocation>,
    /// `[nw, ne, sw, se]` arena indices, set exactly once on split.
    children: Option<[usize; 4]>,
}

impl Node {
    fn leaf(boundary: Rect, capacity: usize, level: usize) -> Self {
        Self {
            boundary,
            capacity,
            level,
            items: Vec::new(),
            children: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct QuadTree {
    nodes: Vec<Node>,
    mul: usize,
}

impl QuadTree {
    /// Zero `capacity` or `mul` are raised to 1.
    pub fn new(boundary: Rect, capacity: usize, mul: usize) -> Self {
        Self {
            nodes: vec![Node::leaf(boundary, capacity.max(1), 0)],
            mul: mul.max(1),
        }
    }

    pub fn boundary(&self) -> Rect {
        self.nodes[ROOT].boundary
    }

    /// Drop all items and children, keeping the root's boundary and capacity.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        let root = &mut self.nodes[ROOT];
        root.items.clear();
        root.children = None;
    }

    /// Clear and re-target the tree at a new boundary / split policy.
    pub fn reset(&mut self, boundary: Rect, capacity: usize, mul: usize) {
        self.clear();
        let root = &mut self.nodes[ROOT];
        root.boundary = boundary;
        root.capacity = capacity.max(1);
        self.mul = mul.max(1);
    }

    /// Store `item`. Returns `false` (and stores nothing) when the position
    /// lies outside the root boundary.
    pub fn insert(&mut self, item: AgentLocation) -> bool {
        if !self.nodes[ROOT].boundary.contains(item.position) {
            return false;
        }
        let mut id = ROOT;
        loop {
            let node = &self.nodes[id];
            let children = match (node.children, node.items.len() < node.capacity) {
                (Some(children), _) => children,
                (None, true) => {
                    self.nodes[id].items.push(item);
                    return true;
                }
                (None, false) => self.split(id),
            };
            let child = children[self.nodes[id].boundary.quadrant_of(item.position)];
            if !self.nodes[child].boundary.contains(item.position) {
                // Split-line rounding left the point outside its quadrant.
                self.nodes[id].items.push(item);
                return true;
            }
            id = child;
        }
    }

    fn split(&mut self, id: usize) -> [usize; 4] {
        let parent = &self.nodes[id];
        let capacity = parent.capacity.saturating_mul(self.mul);
        let level = parent.level + 1;
        let quadrants = parent.boundary.quadrants();
        let first = self.nodes.len();
        self.nodes
            .extend(quadrants.into_iter().map(|q| Node::leaf(q, capacity, level)));
        let children = [first, first + 1, first + 2, first + 3];
        self.nodes[id].children = Some(children);
        children
    }

    /// Append the index of every stored item inside `range` to `out`.
    /// Returns whether the root boundary intersects `range` at all.
    pub fn query(&self, range: &Rect, out: &mut Vec<usize>) -> bool {
        if !self.nodes[ROOT].boundary.intersects(range) {
            return false;
        }
        let mut pending = vec![ROOT];
        while let Some(id) = pending.pop() {
            let node = &self.nodes[id];
            out.extend(
                node.items
                    .iter()
                    .filter(|item| range.contains(item.position))
                    .map(|item| item.index),
            );
            if let Some(children) = node.children {
                pending.extend(
                    children
                        .into_iter()
                        .filter(|&child| self.nodes[child].boundary.intersects(range)),
                );
            }
        }
        true
    }

    /// Total number of stored items.
    pub fn size(&self) -> usize {
        self.nodes.iter().map(|n| n.items.len()).sum()
    }

    /// Number of split (internal) nodes.
    pub fn knots(&self) -> usize {
        self.nodes.iter().filter(|n| n.children.is_some()).count()
    }

    /// Deepest level holding a node; the root is level 0.
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.level).max().unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
