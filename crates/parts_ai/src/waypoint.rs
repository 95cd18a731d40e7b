//! Waypoint graphs and patrols

use glam::Vec3;
use parts_core::move_towards;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One node of a patrol graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Vec3,
    /// Nodes a follower may continue to from here
    pub next: Vec<usize>,
}

/// A set of waypoints linked into routes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaypointGraph {
    nodes: Vec<Waypoint>,
}

impl WaypointGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its index
    pub fn add(&mut self, position: Vec3) -> usize {
        self.nodes.push(Waypoint {
            position,
            next: Vec::new(),
        });
        self.nodes.len() - 1
    }

    /// Link `from` to `to`. Unknown indices are ignored.
    pub fn link(&mut self, from: usize, to: usize) {
        if to >= self.nodes.len() {
            return;
        }
        if let Some(node) = self.nodes.get_mut(from) {
            if !node.next.contains(&to) {
                node.next.push(to);
            }
        }
    }

    /// Build a closed loop through `points` in order
    pub fn ring(points: &[Vec3]) -> Self {
        let mut graph = Self::new();
        for p in points {
            graph.add(*p);
        }
        let n = graph.len();
        for i in 0..n {
            graph.link(i, (i + 1) % n);
        }
        graph
    }

    pub fn get(&self, index: usize) -> Option<&Waypoint> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pick one of the node's successors at random
    pub fn random_next(&self, index: usize, rng: &mut impl Rng) -> Option<usize> {
        self.nodes.get(index)?.next.choose(rng).copied()
    }

    /// Node closest to `position`
    pub fn find_nearest(&self, position: Vec3) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.position
                    .distance_squared(position)
                    .total_cmp(&b.position.distance_squared(position))
            })
            .map(|(i, _)| i)
    }
}

/// Walks a [`WaypointGraph`], branching at random
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaypointFollower {
    pub speed: f32,
    pub arrival_distance: f32,
    target: Option<usize>,
}

impl Default for WaypointFollower {
    fn default() -> Self {
        Self {
            speed: 5.0,
            arrival_distance: 0.1,
            target: None,
        }
    }
}

impl WaypointFollower {
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Head for the node nearest to `position`
    pub fn start(&mut self, graph: &WaypointGraph, position: Vec3) {
        self.target = graph.find_nearest(position);
    }

    pub fn set_target(&mut self, target: Option<usize>) {
        self.target = target;
    }

    /// Node currently being walked to
    pub fn target(&self) -> Option<usize> {
        self.target
    }

    /// Move toward the target and return the new position. On arrival the
    /// next node is picked at random; a dead end stops the follower.
    pub fn tick(&mut self, dt: f32, position: Vec3, graph: &WaypointGraph, rng: &mut impl Rng) -> Vec3 {
        let Some(node) = self.target.and_then(|i| graph.get(i)) else {
            return position;
        };

        let moved = move_towards(position, node.position, self.speed * dt);
        if moved.distance(node.position) <= self.arrival_distance {
            let reached = self.target;
            self.target = reached.and_then(|i| graph.random_next(i, rng));
            if self.target.is_none() {
                log::debug!("waypoint follower stopped at node {:?}", reached);
            }
        }
        moved
    }
}
