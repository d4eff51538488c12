//! Fixtures for diagrams, cells, and participants.

use chrono::Utc;
use collabhub_core::{Cell, CellId, Diagram, DiagramId, Edge, Node, Participant, Point, Role, UserId};

/// Build a test node cell.
#[must_use]
pub fn test_node(id: &str, x: f64, y: f64) -> Cell {
    Cell::Node(Node {
        id: CellId::new(id),
        shape: "process".to_string(),
        position: Point { x, y },
        size: None,
        style: None,
        value: None,
    })
}

/// Build a test edge cell.
#[must_use]
pub fn test_edge(id: &str, source: &str, target: &str) -> Cell {
    Cell::Edge(Edge {
        id: CellId::new(id),
        shape: "flow".to_string(),
        source: CellId::new(source),
        target: CellId::new(target),
        waypoints: vec![],
        value: None,
    })
}

/// An empty diagram with a fresh id.
#[must_use]
pub fn test_diagram() -> Diagram {
    Diagram::empty(DiagramId::new())
}

/// A diagram with a fresh id seeded with the given cells.
#[must_use]
pub fn test_diagram_with(cells: Vec<Cell>) -> Diagram {
    let mut diagram = test_diagram();
    for cell in cells {
        diagram.cells.insert(cell.id().clone(), cell);
    }
    diagram
}

/// A test participant with the given role, joined "now".
#[must_use]
pub fn test_participant(display_name: &str, role: Role) -> Participant {
    Participant {
        user_id: UserId::new(),
        display_name: display_name.to_string(),
        email: None,
        provider: "local".to_string(),
        role,
        joined_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagram_with_seeds_cells() {
        let diagram = test_diagram_with(vec![test_node("N1", 0.0, 0.0)]);
        assert_eq!(diagram.len(), 1);
    }
}
