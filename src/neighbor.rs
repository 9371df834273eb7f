use crate::agent::AgentId;
use crate::geometry::Vec2;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RADIUS: f64 = 50.0;

/// Position of a pool member at the query instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sighting {
    pub id: AgentId,
    pub position: Vec2,
}

/// Fixed radius range query.
///
/// A linear scan is plenty for a few dozen agents. Larger fleets would want a
/// grid or k-d tree behind the same `query` signature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeighborQuery {
    pub radius: f64,
}

impl Default for NeighborQuery {
    fn default() -> Self {
        Self { radius: DEFAULT_RADIUS }
    }
}

impl NeighborQuery {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    pub fn in_range(&self, center: Vec2, other: Vec2) -> bool {
        center.distance(other) <= self.radius
    }

    /// Members of `pool` within `radius` of `center`, in pool order.
    pub fn query(&self, center: Vec2, pool: &[Sighting]) -> Vec<AgentId> {
        pool.iter()
            .filter(|s| self.in_range(center, s.position))
            .map(|s| s.id)
            .collect()
    }
}
