//! `DiagramStore` implementations.

use async_trait::async_trait;
use collabhub_core::{Diagram, DiagramId, DiagramStore};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::StorageError;

const TABLE: &str = "diagram";

/// Row shape persisted in the `diagram` table.
///
/// Mirrors [`Diagram`] field for field; kept as a separate type so the wire
/// representation can diverge from the in-memory one without touching
/// `collabhub-core`.
#[derive(Debug, Serialize, Deserialize)]
struct DiagramRow {
    id: DiagramId,
    revision: u64,
    cells: std::collections::HashMap<collabhub_core::CellId, collabhub_core::Cell>,
    modified_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Diagram> for DiagramRow {
    fn from(d: &Diagram) -> Self {
        Self {
            id: d.id,
            revision: d.revision,
            cells: d.cells.clone(),
            modified_at: d.modified_at,
        }
    }
}

impl From<DiagramRow> for Diagram {
    fn from(row: DiagramRow) -> Self {
        Self {
            id: row.id,
            revision: row.revision,
            cells: row.cells,
            modified_at: row.modified_at,
        }
    }
}

/// A `SurrealDB`-backed [`DiagramStore`].
///
/// Diagrams are stored whole (one document per diagram, keyed by id) rather
/// than cell-by-cell: a `DiagramSession` holds the authoritative in-memory
/// copy and only persists on accepted mutation, so there is no need for
/// partial-row updates at this layer.
pub struct SurrealDiagramStore {
    db: Database,
}

impl SurrealDiagramStore {
    /// Wrap an already-connected [`Database`].
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DiagramStore for SurrealDiagramStore {
    async fn get(&self, id: DiagramId) -> anyhow::Result<Option<Diagram>> {
        let row: Option<DiagramRow> = self
            .db
            .client()
            .select((TABLE, id.to_string()))
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(row.map(Diagram::from))
    }

    async fn put(&self, diagram: &Diagram) -> anyhow::Result<()> {
        let row = DiagramRow::from(diagram);
        let _: Option<DiagramRow> = self
            .db
            .client()
            .upsert((TABLE, diagram.id.to_string()))
            .content(row)
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(())
    }
}

/// An in-process [`DiagramStore`] for tests and single-node dev runs without
/// a `SurrealDB` endpoint configured.
#[derive(Default)]
pub struct InMemoryDiagramStore {
    diagrams: DashMap<DiagramId, Diagram>,
}

impl InMemoryDiagramStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DiagramStore for InMemoryDiagramStore {
    async fn get(&self, id: DiagramId) -> anyhow::Result<Option<Diagram>> {
        Ok(self.diagrams.get(&id).map(|r| r.clone()))
    }

    async fn put(&self, diagram: &Diagram) -> anyhow::Result<()> {
        self.diagrams.insert(diagram.id, diagram.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_round_trips() {
        let store = InMemoryDiagramStore::new();
        let diagram = Diagram::empty(DiagramId::new());

        assert!(store.get(diagram.id).await.unwrap().is_none());
        store.put(&diagram).await.unwrap();

        let fetched = store.get(diagram.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, diagram.id);
        assert_eq!(fetched.revision, 0);
    }

    #[tokio::test]
    async fn in_memory_store_put_overwrites() {
        let store = InMemoryDiagramStore::new();
        let mut diagram = Diagram::empty(DiagramId::new());
        store.put(&diagram).await.unwrap();

        diagram.revision = 5;
        store.put(&diagram).await.unwrap();

        let fetched = store.get(diagram.id).await.unwrap().unwrap();
        assert_eq!(fetched.revision, 5);
    }
}
