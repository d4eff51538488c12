//! Cell operations, mutation batches, and the history entries used for undo/redo.

use crate::diagram::Cell;
use crate::ids::CellId;
use serde::{Deserialize, Serialize};

/// The kind of change a [`CellOperation`] makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Add a new cell. Idempotent — adding an id that already exists is
    /// treated as an `update`.
    Add,
    /// Update an existing cell.
    Update,
    /// Remove a cell (cascades to edges when removing a node).
    Remove,
}

/// A single change to one cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellOperation {
    /// The cell being operated on.
    pub cell_id: CellId,
    /// What kind of operation this is.
    pub operation: OpKind,
    /// The cell snapshot. Required for `add`/`update`, ignored for `remove`.
    #[serde(default)]
    pub data: Option<Cell>,
}

/// An ordered sequence of [`CellOperation`]s from one participant, tagged
/// with the client's own logical sequence number so duplicate resends can
/// be recognized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationBatch {
    /// Client-supplied monotonic sequence number for this participant.
    pub client_seq: u64,
    /// The operations, in client-submitted order.
    pub operations: Vec<CellOperation>,
}

impl MutationBatch {
    /// Deduplicate operations by cell id, keeping the first occurrence —
    /// clients may resend a batch after a dropped acknowledgment.
    #[must_use]
    pub fn deduplicated(&self) -> Vec<CellOperation> {
        let mut seen = std::collections::HashSet::new();
        self.operations
            .iter()
            .filter(|op| seen.insert(op.cell_id.clone()))
            .cloned()
            .collect()
    }
}

/// Enough information to reverse one accepted [`MutationBatch`]: for every
/// cell the batch touched, its state immediately before the batch was
/// applied (`None` if the cell did not exist yet, i.e. the forward op was
/// an `add`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The batch as it was accepted.
    pub forward: MutationBatch,
    /// Pre-state for every cell id touched by `forward`, used to build the
    /// inverse batch on undo.
    pub pre_state: Vec<(CellId, Option<Cell>)>,
    /// Revision produced when `forward` was committed.
    pub revision: u64,
}

impl HistoryEntry {
    /// Build the inverse batch: an `add` for every cell that existed before
    /// (restoring its prior snapshot, whether or not it still exists in
    /// current state — `add` is idempotent, so this both resurrects a
    /// removed cell and restores an updated one's prior value) and a
    /// `remove` for every cell that did not exist before (i.e. the forward
    /// op added it).
    #[must_use]
    pub fn inverse_batch(&self, client_seq: u64) -> MutationBatch {
        let operations = self
            .pre_state
            .iter()
            .map(|(cell_id, prior)| match prior {
                Some(cell) => CellOperation {
                    cell_id: cell_id.clone(),
                    operation: OpKind::Add,
                    data: Some(cell.clone()),
                },
                None => CellOperation {
                    cell_id: cell_id.clone(),
                    operation: OpKind::Remove,
                    data: None,
                },
            })
            .collect();
        MutationBatch {
            client_seq,
            operations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_occurrence() {
        let batch = MutationBatch {
            client_seq: 1,
            operations: vec![
                CellOperation {
                    cell_id: "N1".into(),
                    operation: OpKind::Add,
                    data: None,
                },
                CellOperation {
                    cell_id: "N1".into(),
                    operation: OpKind::Update,
                    data: None,
                },
            ],
        };
        let deduped = batch.deduplicated();
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].operation, OpKind::Add);
    }
}
