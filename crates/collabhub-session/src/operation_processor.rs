//! `OperationProcessor`: the pure, side-effect-free pipeline that turns one
//! client [`MutationBatch`] plus the
//! diagram's current state into either an accepted new state or a rejection
//! with a correction payload.
//!
//! Kept free of channels, locks, and services on purpose — `DiagramSession`
//! is the only caller, and testing the six-step pipeline here never needs a
//! running actor.

use chrono::Utc;
use collabhub_core::{Cell, CellId, CellOperation, CorrectionReason, Diagram, HistoryEntry, MutationBatch, OpKind};

/// Result of processing one batch against a diagram.
pub enum ProcessOutcome {
    /// The batch (after dedup/idempotent-add normalization) was applied.
    Accepted {
        /// The diagram after the batch was applied.
        diagram: Diagram,
        /// The batch as actually applied (normalized, with cascades included).
        applied_batch: MutationBatch,
        /// The undo/redo history entry for this acceptance.
        history: HistoryEntry,
    },
    /// The batch was rejected; the origin must resync to the attached
    /// authoritative snapshot.
    Rejected {
        /// Why the batch was rejected.
        reason: CorrectionReason,
        /// Full authoritative snapshot of current state.
        cells: Vec<Cell>,
    },
}

/// Stateless processor implementing the six-step batch pipeline.
pub struct OperationProcessor;

impl OperationProcessor {
    /// Process `batch` against `current`, producing either the new diagram
    /// state or a rejection.
    ///
    /// 1. Deduplicate by cell id, keeping the first occurrence per id.
    /// 2. Validate each operation against the working copy (idempotent
    ///    add-as-update, edge endpoints must resolve to nodes already present
    ///    in the working copy, update/remove must reference an existing
    ///    cell).
    /// 3. Apply validated operations to the working copy, cascading node
    ///    removal onto the edges it dangles.
    /// 4. Re-check the invariant (no dangling edges) on the whole result.
    /// 5. On success, commit and build the undo history entry.
    /// 6. On any validation failure, reject with the full authoritative
    ///    current state.
    #[must_use]
    pub fn process(current: &Diagram, batch: &MutationBatch) -> ProcessOutcome {
        let deduped = batch.deduplicated();
        let mut working = current.cells.clone();
        let mut touched: Vec<CellId> = Vec::new();
        let mut pre_state: Vec<(CellId, Option<Cell>)> = Vec::new();
        let mut applied_ops: Vec<CellOperation> = Vec::new();

        for op in &deduped {
            if !touched.contains(&op.cell_id) {
                pre_state.push((op.cell_id.clone(), current.cells.get(&op.cell_id).cloned()));
                touched.push(op.cell_id.clone());
            }

            match op.operation {
                OpKind::Add => {
                    if working.contains_key(&op.cell_id) {
                        match apply_write(&op.cell_id, &op.data, &working) {
                            Ok(cell) => {
                                working.insert(op.cell_id.clone(), cell.clone());
                                applied_ops.push(CellOperation {
                                    cell_id: op.cell_id.clone(),
                                    operation: OpKind::Update,
                                    data: Some(cell),
                                });
                            }
                            Err(reason) => return reject(reason, current),
                        }
                    } else {
                        match apply_write(&op.cell_id, &op.data, &working) {
                            Ok(cell) => {
                                working.insert(op.cell_id.clone(), cell.clone());
                                applied_ops.push(CellOperation {
                                    cell_id: op.cell_id.clone(),
                                    operation: OpKind::Add,
                                    data: Some(cell),
                                });
                            }
                            Err(reason) => return reject(reason, current),
                        }
                    }
                }
                OpKind::Update => {
                    if !working.contains_key(&op.cell_id) {
                        return reject(CorrectionReason::UnknownCell, current);
                    }
                    match apply_write(&op.cell_id, &op.data, &working) {
                        Ok(cell) => {
                            working.insert(op.cell_id.clone(), cell.clone());
                            applied_ops.push(CellOperation {
                                cell_id: op.cell_id.clone(),
                                operation: OpKind::Update,
                                data: Some(cell),
                            });
                        }
                        Err(reason) => return reject(reason, current),
                    }
                }
                OpKind::Remove => {
                    if working.remove(&op.cell_id).is_none() {
                        return reject(CorrectionReason::UnknownCell, current);
                    }
                    applied_ops.push(CellOperation {
                        cell_id: op.cell_id.clone(),
                        operation: OpKind::Remove,
                        data: None,
                    });

                    let cascaded: Vec<CellId> = working
                        .iter()
                        .filter_map(|(id, cell)| match cell.edge_endpoints() {
                            Some((source, target))
                                if *source == op.cell_id || *target == op.cell_id =>
                            {
                                Some(id.clone())
                            }
                            _ => None,
                        })
                        .collect();
                    for cid in cascaded {
                        if !touched.contains(&cid) {
                            pre_state.push((cid.clone(), current.cells.get(&cid).cloned()));
                            touched.push(cid.clone());
                        }
                        working.remove(&cid);
                        applied_ops.push(CellOperation {
                            cell_id: cid,
                            operation: OpKind::Remove,
                            data: None,
                        });
                    }
                }
            }
        }

        let new_diagram = Diagram {
            id: current.id,
            revision: current.revision + 1,
            cells: working,
            modified_at: Utc::now(),
        };
        if !new_diagram.has_no_dangling_edges() {
            return reject(CorrectionReason::DanglingEdge, current);
        }

        let applied_batch = MutationBatch {
            client_seq: batch.client_seq,
            operations: applied_ops,
        };
        let history = HistoryEntry {
            forward: applied_batch.clone(),
            pre_state,
            revision: new_diagram.revision,
        };

        ProcessOutcome::Accepted {
            diagram: new_diagram,
            applied_batch,
            history,
        }
    }
}

/// Validate and return the cell an `add`/`update` op would write: the
/// payload must be present, self-consistent with `cell_id`, and — if an
/// edge — its endpoints must resolve to nodes already in `working`.
fn apply_write(
    cell_id: &CellId,
    data: &Option<Cell>,
    working: &std::collections::HashMap<CellId, Cell>,
) -> Result<Cell, CorrectionReason> {
    let cell = match data {
        Some(cell) if cell.id() == cell_id => cell.clone(),
        _ => return Err(CorrectionReason::MalformedCell),
    };
    if let Some((source, target)) = cell.edge_endpoints() {
        let source_ok = matches!(working.get(source), Some(Cell::Node(_)));
        let target_ok = matches!(working.get(target), Some(Cell::Node(_)));
        if !source_ok || !target_ok {
            return Err(CorrectionReason::DanglingEdge);
        }
    }
    Ok(cell)
}

/// Build a rejection carrying the full authoritative current state, so the
/// origin can rebuild regardless of which cells its batch happened to name
/// — an edge rejected for a dangling endpoint still comes back with its
/// would-be sibling nodes rather than an empty snapshot.
fn reject(reason: CorrectionReason, current: &Diagram) -> ProcessOutcome {
    let cells = current.cells.values().cloned().collect();
    ProcessOutcome::Rejected { reason, cells }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collabhub_test::prelude::{test_diagram, test_diagram_with, test_edge, test_node};
    use proptest::prelude::*;

    fn batch(ops: Vec<CellOperation>) -> MutationBatch {
        MutationBatch {
            client_seq: 1,
            operations: ops,
        }
    }

    fn add(cell: Cell) -> CellOperation {
        CellOperation {
            cell_id: cell.id().clone(),
            operation: OpKind::Add,
            data: Some(cell),
        }
    }

    #[test]
    fn add_creates_a_cell() {
        let diagram = test_diagram();
        let outcome = OperationProcessor::process(&diagram, &batch(vec![add(test_node("N1", 0.0, 0.0))]));
        match outcome {
            ProcessOutcome::Accepted { diagram, .. } => {
                assert_eq!(diagram.revision, 1);
                assert_eq!(diagram.len(), 1);
            }
            ProcessOutcome::Rejected { reason, .. } => panic!("expected acceptance, got {reason:?}"),
        }
    }

    #[test]
    fn re_adding_an_existing_id_is_idempotent_update() {
        let diagram = test_diagram_with(vec![test_node("N1", 0.0, 0.0)]);
        let outcome = OperationProcessor::process(&diagram, &batch(vec![add(test_node("N1", 5.0, 5.0))]));
        match outcome {
            ProcessOutcome::Accepted { applied_batch, diagram, .. } => {
                assert_eq!(applied_batch.operations[0].operation, OpKind::Update);
                assert_eq!(diagram.len(), 1);
            }
            ProcessOutcome::Rejected { reason, .. } => panic!("expected acceptance, got {reason:?}"),
        }
    }

    #[test]
    fn edge_with_dangling_endpoint_is_rejected() {
        let diagram = test_diagram_with(vec![test_node("N1", 0.0, 0.0), test_node("N2", 10.0, 10.0)]);
        let outcome = OperationProcessor::process(&diagram, &batch(vec![add(test_edge("E1", "N1", "N9"))]));
        match outcome {
            ProcessOutcome::Rejected { reason, cells } => {
                assert_eq!(reason, CorrectionReason::DanglingEdge);
                assert!(cells.iter().any(|c| c.id() == &CellId::new("N1")));
                assert!(cells.iter().any(|c| c.id() == &CellId::new("N2")));
                assert!(!cells.iter().any(|c| c.id() == &CellId::new("E1")));
            }
            ProcessOutcome::Accepted { .. } => panic!("expected rejection"),
        }
    }

    #[test]
    fn removing_a_node_cascades_to_its_edges() {
        let diagram = test_diagram_with(vec![
            test_node("N1", 0.0, 0.0),
            test_node("N2", 10.0, 10.0),
            test_edge("E1", "N1", "N2"),
        ]);
        let remove_n1 = CellOperation {
            cell_id: CellId::new("N1"),
            operation: OpKind::Remove,
            data: None,
        };
        let outcome = OperationProcessor::process(&diagram, &batch(vec![remove_n1]));
        match outcome {
            ProcessOutcome::Accepted { diagram, applied_batch, .. } => {
                assert_eq!(diagram.len(), 1);
                assert!(diagram.cells.get(&CellId::new("E1")).is_none());
                assert_eq!(applied_batch.operations.len(), 2);
            }
            ProcessOutcome::Rejected { reason, .. } => panic!("expected acceptance, got {reason:?}"),
        }
    }

    #[test]
    fn updating_an_unknown_cell_is_rejected_with_unknown_cell() {
        let diagram = test_diagram();
        let update = CellOperation {
            cell_id: CellId::new("N1"),
            operation: OpKind::Update,
            data: Some(test_node("N1", 0.0, 0.0)),
        };
        let outcome = OperationProcessor::process(&diagram, &batch(vec![update]));
        assert!(matches!(
            outcome,
            ProcessOutcome::Rejected {
                reason: CorrectionReason::UnknownCell,
                ..
            }
        ));
    }

    #[test]
    fn duplicate_ids_within_a_batch_are_deduplicated_not_rejected() {
        let diagram = test_diagram();
        let outcome = OperationProcessor::process(
            &diagram,
            &batch(vec![add(test_node("N1", 0.0, 0.0)), add(test_node("N1", 99.0, 99.0))]),
        );
        match outcome {
            ProcessOutcome::Accepted { diagram, .. } => {
                assert_eq!(diagram.len(), 1);
                let node = diagram.cells.get(&CellId::new("N1")).unwrap();
                assert!(matches!(node, Cell::Node(n) if n.position.x == 0.0));
            }
            ProcessOutcome::Rejected { reason, .. } => panic!("expected acceptance, got {reason:?}"),
        }
    }

    #[test]
    fn undo_then_redo_round_trips_to_the_same_state() {
        let diagram = test_diagram_with(vec![test_node("N1", 0.0, 0.0)]);
        let update = CellOperation {
            cell_id: CellId::new("N1"),
            operation: OpKind::Update,
            data: Some(test_node("N1", 5.0, 5.0)),
        };
        let outcome = OperationProcessor::process(&diagram, &batch(vec![update]));
        let ProcessOutcome::Accepted { diagram: s1, history, .. } = outcome else {
            panic!("expected acceptance")
        };

        let inverse = history.inverse_batch(0);
        let undone = OperationProcessor::process(&s1, &inverse);
        let ProcessOutcome::Accepted { diagram: back_to_s0, history: undo_history, .. } = undone else {
            panic!("expected undo to apply")
        };
        assert_eq!(back_to_s0.cells, diagram.cells);

        let redo = undo_history.forward.clone();
        let redone = OperationProcessor::process(&back_to_s0, &redo);
        let ProcessOutcome::Accepted { diagram: s1_again, .. } = redone else {
            panic!("expected redo to apply")
        };
        assert_eq!(s1_again.cells, s1.cells);
    }

    proptest! {
        /// Batches touching disjoint cell-id sets commute — applying them
        /// in either order lands on the same final state.
        /// Grounded on `Alb-O-xeno`'s `proptest!` usage for editor history
        /// (`crates/editor/src/impls/history_tests.rs`), generalized from
        /// text-edit transactions to diagram cell operations.
        #[test]
        fn disjoint_batches_commute(ax in 0.0f64..500.0, ay in 0.0f64..500.0, bx in 0.0f64..500.0, by in 0.0f64..500.0) {
            let diagram = test_diagram();
            let batch_a = batch(vec![add(test_node("A", ax, ay))]);
            let batch_b = batch(vec![add(test_node("B", bx, by))]);

            let a_then_b = {
                let ProcessOutcome::Accepted { diagram: after_a, .. } = OperationProcessor::process(&diagram, &batch_a) else {
                    panic!("expected acceptance")
                };
                let ProcessOutcome::Accepted { diagram: after_b, .. } = OperationProcessor::process(&after_a, &batch_b) else {
                    panic!("expected acceptance")
                };
                after_b
            };

            let b_then_a = {
                let ProcessOutcome::Accepted { diagram: after_b, .. } = OperationProcessor::process(&diagram, &batch_b) else {
                    panic!("expected acceptance")
                };
                let ProcessOutcome::Accepted { diagram: after_a, .. } = OperationProcessor::process(&after_b, &batch_a) else {
                    panic!("expected acceptance")
                };
                after_a
            };

            prop_assert_eq!(a_then_b.cells, b_then_a.cells);
        }

        /// Idempotent add — two identical `add`s for the same id leave
        /// state equal to one `add` followed by `update` with the second
        /// payload.
        #[test]
        fn idempotent_add_matches_add_then_update(x1 in 0.0f64..500.0, y1 in 0.0f64..500.0, x2 in 0.0f64..500.0, y2 in 0.0f64..500.0) {
            let diagram = test_diagram();

            let via_two_adds = {
                let first = batch(vec![add(test_node("N1", x1, y1))]);
                let ProcessOutcome::Accepted { diagram: after_first, .. } = OperationProcessor::process(&diagram, &first) else {
                    panic!("expected acceptance")
                };
                let second = batch(vec![add(test_node("N1", x2, y2))]);
                let ProcessOutcome::Accepted { diagram: after_second, .. } = OperationProcessor::process(&after_first, &second) else {
                    panic!("expected acceptance")
                };
                after_second
            };

            let via_add_then_update = {
                let first = batch(vec![add(test_node("N1", x1, y1))]);
                let ProcessOutcome::Accepted { diagram: after_first, .. } = OperationProcessor::process(&diagram, &first) else {
                    panic!("expected acceptance")
                };
                let update = CellOperation {
                    cell_id: CellId::new("N1"),
                    operation: OpKind::Update,
                    data: Some(test_node("N1", x2, y2)),
                };
                let ProcessOutcome::Accepted { diagram: after_update, .. } = OperationProcessor::process(&after_first, &batch(vec![update])) else {
                    panic!("expected acceptance")
                };
                after_update
            };

            prop_assert_eq!(via_two_adds.cells, via_add_then_update.cells);
        }
    }
}
