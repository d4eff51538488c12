//! The diagram data model: cells, nodes, edges, and the diagram itself.

use crate::ids::{CellId, DiagramId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

/// A 2D size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width.
    pub w: f64,
    /// Height.
    pub h: f64,
}

/// A node: a shape placed at a position with an optional size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node id (unique within the diagram).
    pub id: CellId,
    /// Shape name (e.g. `"process"`, `"actor"`, `"datastore"`).
    pub shape: String,
    /// Position.
    pub position: Point,
    /// Size, if the shape has one.
    #[serde(default)]
    pub size: Option<Size>,
    /// Free-form style (stroke/fill/etc.), opaque to the engine.
    #[serde(default)]
    pub style: Option<serde_json::Value>,
    /// Label or other cell value.
    #[serde(default)]
    pub value: Option<String>,
}

/// An edge: a connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Edge id (unique within the diagram).
    pub id: CellId,
    /// Shape name (e.g. `"flow"`, `"trust-boundary"`).
    pub shape: String,
    /// Source node id.
    pub source: CellId,
    /// Target node id.
    pub target: CellId,
    /// Optional routing waypoints.
    #[serde(default)]
    pub waypoints: Vec<Point>,
    /// Label or other cell value.
    #[serde(default)]
    pub value: Option<String>,
}

/// A cell is either a node or an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cell {
    /// A node.
    Node(Node),
    /// An edge.
    Edge(Edge),
}

impl Cell {
    /// The cell's id, regardless of variant.
    #[must_use]
    pub fn id(&self) -> &CellId {
        match self {
            Self::Node(n) => &n.id,
            Self::Edge(e) => &e.id,
        }
    }

    /// `true` if this cell is an edge.
    #[must_use]
    pub fn is_edge(&self) -> bool {
        matches!(self, Self::Edge(_))
    }

    /// The edge's endpoints, if this cell is an edge.
    #[must_use]
    pub fn edge_endpoints(&self) -> Option<(&CellId, &CellId)> {
        match self {
            Self::Edge(e) => Some((&e.source, &e.target)),
            Self::Node(_) => None,
        }
    }
}

/// An ordered, versioned collection of cells.
///
/// `modified_at` is only ever advanced, never rewound, by accepted
/// mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagram {
    /// Diagram id.
    pub id: DiagramId,
    /// Revision number. Starts at 0, incremented on every accepted batch.
    pub revision: u64,
    /// All cells, keyed by id, for O(1) lookup and update.
    pub cells: HashMap<CellId, Cell>,
    /// Last modification time.
    pub modified_at: DateTime<Utc>,
}

impl Diagram {
    /// An empty diagram with the given id.
    #[must_use]
    pub fn empty(id: DiagramId) -> Self {
        Self {
            id,
            revision: 0,
            cells: HashMap::new(),
            modified_at: Utc::now(),
        }
    }

    /// `true` if every edge's endpoints resolve to existing nodes.
    #[must_use]
    pub fn has_no_dangling_edges(&self) -> bool {
        self.cells.values().all(|cell| match cell {
            Cell::Edge(e) => {
                matches!(self.cells.get(&e.source), Some(Cell::Node(_)))
                    && matches!(self.cells.get(&e.target), Some(Cell::Node(_)))
            }
            Cell::Node(_) => true,
        })
    }

    /// Cell count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// `true` if the diagram has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, x: f64, y: f64) -> Cell {
        Cell::Node(Node {
            id: id.into(),
            shape: "process".to_string(),
            position: Point { x, y },
            size: None,
            style: None,
            value: None,
        })
    }

    fn edge(id: &str, source: &str, target: &str) -> Cell {
        Cell::Edge(Edge {
            id: id.into(),
            shape: "flow".to_string(),
            source: source.into(),
            target: target.into(),
            waypoints: vec![],
            value: None,
        })
    }

    #[test]
    fn dangling_edge_detected() {
        let mut d = Diagram::empty(DiagramId::new());
        d.cells.insert("N1".into(), node("N1", 0.0, 0.0));
        d.cells.insert("E1".into(), edge("E1", "N1", "N9"));
        assert!(!d.has_no_dangling_edges());
    }

    #[test]
    fn well_formed_diagram_has_no_dangling_edges() {
        let mut d = Diagram::empty(DiagramId::new());
        d.cells.insert("N1".into(), node("N1", 0.0, 0.0));
        d.cells.insert("N2".into(), node("N2", 10.0, 10.0));
        d.cells.insert("E1".into(), edge("E1", "N1", "N2"));
        assert!(d.has_no_dangling_edges());
    }
}
