//! `DiagramSession`, the per-diagram actor.
//!
//! A single task owns one diagram's state and runs an exclusive event loop
//! over four inbound channels (register/unregister/inbound/stop), dispatched
//! with a `biased` `tokio::select!` so a shutdown request is always observed
//! before more work is picked up — the same shape as
//! `astrid-gateway::server::inbound_router::run_inbound_router`, generalized
//! from routing inbound chat messages by identity to mutating one diagram's
//! authoritative state.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use collabhub_core::{
    ClientMessage, Diagram, DiagramId, MutationBatch, Participant, Role, ServerMessage, SessionId,
    UserId,
};
use collabhub_events::{EngineEvent, EventMetadata};

use crate::error::{SessionError, SessionResult};
use crate::operation_processor::{OperationProcessor, ProcessOutcome};
use crate::services::Services;

/// A snapshot of session state cheap enough to poll without touching the
/// actor's mailbox, published after every handled message.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// The diagram this session serves.
    pub diagram_id: DiagramId,
    /// This session's opaque id.
    pub session_id: SessionId,
    /// Number of currently-registered participants.
    pub participant_count: usize,
    /// Wall-clock time of the last handled message.
    pub last_activity: DateTime<Utc>,
    /// The current host, if any participant remains.
    pub host: Option<UserId>,
}

/// Request to admit a new participant into the session loop.
struct RegisterRequest {
    participant: Participant,
    outbound: mpsc::Sender<ServerMessage>,
    ack: oneshot::Sender<SessionResult<()>>,
}

/// An inbound message, tagged with the participant who sent it.
struct InboundEnvelope {
    user_id: UserId,
    message: ClientMessage,
}

/// Lifecycle state of a `DiagramSession`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Active,
    HostTransferring,
    Terminating,
}

/// A handle to a spawned `DiagramSession`'s actor task. Cheap to clone and
/// share; all mutation happens through its channels.
#[derive(Clone)]
pub struct SessionHandle {
    /// This session's opaque id.
    pub session_id: SessionId,
    /// The diagram this session serves.
    pub diagram_id: DiagramId,
    register_tx: mpsc::Sender<RegisterRequest>,
    unregister_tx: mpsc::Sender<UserId>,
    inbound_tx: mpsc::Sender<InboundEnvelope>,
    stop_tx: mpsc::Sender<()>,
    summary_rx: watch::Receiver<SessionSummary>,
}

impl SessionHandle {
    /// Register a new participant, waiting at most `timeout` for the session
    /// loop to admit them. Refuses rather than blocking indefinitely if the
    /// loop is backed up or already terminating.
    pub async fn register(
        &self,
        participant: Participant,
        outbound: mpsc::Sender<ServerMessage>,
        timeout: Duration,
    ) -> SessionResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        let req = RegisterRequest {
            participant,
            outbound,
            ack: ack_tx,
        };
        tokio::time::timeout(timeout, async {
            self.register_tx
                .send(req)
                .await
                .map_err(|_| SessionError::SessionTerminating)?;
            ack_rx.await.map_err(|_| SessionError::SessionTerminating)?
        })
        .await
        .map_err(|_| SessionError::RegistrationTimeout)?
    }

    /// Tell the session loop that `user_id` has disconnected.
    pub async fn unregister(&self, user_id: UserId) {
        let _ = self.unregister_tx.send(user_id).await;
    }

    /// Forward a parsed client message for `user_id` into the session loop.
    pub async fn send_inbound(&self, user_id: UserId, message: ClientMessage) {
        let _ = self.inbound_tx.send(InboundEnvelope { user_id, message }).await;
    }

    /// Request the session loop stop, draining with its configured grace.
    pub async fn stop(&self) {
        let _ = self.stop_tx.send(()).await;
    }

    /// The most recently published summary.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        self.summary_rx.borrow().clone()
    }
}

struct ParticipantEntry {
    participant: Participant,
    outbound: mpsc::Sender<ServerMessage>,
}

/// The actor: owns the diagram, the participant roster, and the undo/redo
/// stacks. The stacks live on the session, not per-participant, since
/// undo/redo operate on the shared diagram state.
struct DiagramSessionActor {
    session_id: SessionId,
    diagram_id: DiagramId,
    diagram: Diagram,
    participants: HashMap<UserId, ParticipantEntry>,
    host: Option<UserId>,
    state: SessionState,
    undo_stack: VecDeque<collabhub_core::HistoryEntry>,
    redo_stack: VecDeque<collabhub_core::HistoryEntry>,
    last_activity: DateTime<Utc>,
    services: Arc<Services>,
    summary_tx: watch::Sender<SessionSummary>,
}

/// Spawn a new `DiagramSession` actor for `diagram_id`, loaded from
/// `initial_diagram` (the snapshot the caller already fetched from
/// `DiagramStore`, or a fresh empty diagram if none existed).
#[must_use]
pub fn spawn(diagram_id: DiagramId, initial_diagram: Diagram, services: Arc<Services>) -> SessionHandle {
    let session_id = SessionId::new();
    let (register_tx, register_rx) = mpsc::channel(32);
    let (unregister_tx, unregister_rx) = mpsc::channel(32);
    let (inbound_tx, inbound_rx) = mpsc::channel(256);
    let (stop_tx, stop_rx) = mpsc::channel(1);
    let now = Utc::now();
    let (summary_tx, summary_rx) = watch::channel(SessionSummary {
        diagram_id,
        session_id,
        participant_count: 0,
        last_activity: now,
        host: None,
    });

    let actor = DiagramSessionActor {
        session_id,
        diagram_id,
        diagram: initial_diagram,
        participants: HashMap::new(),
        host: None,
        state: SessionState::Active,
        undo_stack: VecDeque::new(),
        redo_stack: VecDeque::new(),
        last_activity: now,
        services,
        summary_tx,
    };

    tokio::spawn(actor.run(register_rx, unregister_rx, inbound_rx, stop_rx));

    SessionHandle {
        session_id,
        diagram_id,
        register_tx,
        unregister_tx,
        inbound_tx,
        stop_tx,
        summary_rx,
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run `OperationProcessor::process`, a synchronous pure function, behind
/// `catch_unwind` — a malformed batch must never take the whole session
/// loop down with it.
fn safe_process(current: &Diagram, batch: &MutationBatch) -> Result<ProcessOutcome, String> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| OperationProcessor::process(current, batch)))
        .map_err(panic_message)
}

impl DiagramSessionActor {
    async fn run(
        mut self,
        mut register_rx: mpsc::Receiver<RegisterRequest>,
        mut unregister_rx: mpsc::Receiver<UserId>,
        mut inbound_rx: mpsc::Receiver<InboundEnvelope>,
        mut stop_rx: mpsc::Receiver<()>,
    ) {
        info!(session_id = %self.session_id, diagram_id = %self.diagram_id, "session started");
        self.emit(EngineEvent::SessionStarted {
            metadata: EventMetadata::new("session"),
            diagram_id: self.diagram_id,
            session_id: self.session_id,
        })
        .await;

        loop {
            tokio::select! {
                biased;
                _ = stop_rx.recv() => {
                    info!(session_id = %self.session_id, "session received stop signal");
                    break;
                }
                Some(req) = register_rx.recv() => {
                    self.handle_register(req).await;
                }
                Some(user_id) = unregister_rx.recv() => {
                    self.handle_unregister(user_id).await;
                }
                Some(envelope) = inbound_rx.recv() => {
                    self.handle_inbound(envelope).await;
                }
                else => break,
            }

            self.publish_summary();
            if self.state == SessionState::Terminating {
                break;
            }
        }

        let grace = Duration::from_secs(self.services.config.session.shutdown_grace_secs);
        tokio::time::sleep(grace).await;
        self.emit(EngineEvent::SessionEnded {
            metadata: EventMetadata::new("session"),
            diagram_id: self.diagram_id,
            session_id: self.session_id,
        })
        .await;
        info!(session_id = %self.session_id, "session ended");
    }

    fn can_mutate(&self, user_id: UserId) -> bool {
        self.participants
            .get(&user_id)
            .is_some_and(|entry| entry.participant.role.can_mutate())
    }

    fn touch_activity(&mut self) {
        self.last_activity = Utc::now();
    }

    fn publish_summary(&self) {
        let _ = self.summary_tx.send(SessionSummary {
            diagram_id: self.diagram_id,
            session_id: self.session_id,
            participant_count: self.participants.len(),
            last_activity: self.last_activity,
            host: self.host,
        });
    }

    async fn emit(&self, event: EngineEvent) {
        let payload = serde_json::to_value(&event).unwrap_or(Value::Null);
        self.services.event_bus.publish(event);
        self.services.event_emitter.emit(payload).await;
    }

    async fn persist_and_emit(&self) {
        if let Err(e) = self.services.diagram_store.put(&self.diagram).await {
            warn!(session_id = %self.session_id, error = %e, "failed to persist diagram snapshot");
        }
        self.emit(EngineEvent::DiagramMutated {
            metadata: EventMetadata::new("session"),
            diagram_id: self.diagram_id,
            session_id: self.session_id,
            revision: self.diagram.revision,
            cell_count: self.diagram.len(),
        })
        .await;
    }

    async fn send_to(&mut self, user_id: UserId, msg: ServerMessage) {
        let should_kick = self
            .participants
            .get(&user_id)
            .map(|entry| entry.outbound.try_send(msg).is_err())
            .unwrap_or(false);
        if should_kick {
            self.remove_participant(user_id).await;
        }
    }

    async fn send_error(&mut self, origin: UserId, kind: &str, message: &str) {
        self.send_to(
            origin,
            ServerMessage::Error {
                error: kind.to_string(),
                message: message.to_string(),
                details: Value::Null,
            },
        )
        .await;
    }

    async fn broadcast(&mut self, msg: ServerMessage) {
        self.broadcast_filtered(msg, None).await;
    }

    async fn broadcast_except(&mut self, exclude: UserId, msg: ServerMessage) {
        self.broadcast_filtered(msg, Some(exclude)).await;
    }

    async fn broadcast_filtered(&mut self, msg: ServerMessage, exclude: Option<UserId>) {
        let kicked: Vec<UserId> = self
            .participants
            .iter()
            .filter(|(id, _)| Some(**id) != exclude)
            .filter(|(_, entry)| entry.outbound.try_send(msg.clone()).is_err())
            .map(|(id, _)| *id)
            .collect();
        for id in kicked {
            warn!(session_id = %self.session_id, user_id = %id, "outbound queue backpressure, dropping participant");
            self.remove_participant(id).await;
        }
    }

    async fn broadcast_presence(&mut self) {
        let participants = self
            .participants
            .values()
            .map(|entry| entry.participant.clone())
            .collect();
        self.broadcast(ServerMessage::Presence { participants }).await;
    }

    fn pick_next_host(&self) -> Option<UserId> {
        self.participants
            .values()
            .map(|entry| (entry.participant.host_transfer_key(), entry.participant.user_id))
            .min_by(|a, b| a.0.cmp(&b.0))
            .map(|(_, user_id)| user_id)
    }

    async fn handle_host_departure(&mut self) {
        self.state = SessionState::HostTransferring;
        match self.pick_next_host() {
            Some(new_host) => {
                self.host = Some(new_host);
                info!(session_id = %self.session_id, new_host = %new_host, "host transferred");
                self.broadcast(ServerMessage::HostChanged { new_host }).await;
                self.state = SessionState::Active;
            }
            None => {
                self.state = SessionState::Terminating;
            }
        }
    }

    async fn remove_participant(&mut self, user_id: UserId) {
        if self.participants.remove(&user_id).is_none() {
            return;
        }
        self.emit(EngineEvent::ParticipantLeft {
            metadata: EventMetadata::new("session"),
            diagram_id: self.diagram_id,
            session_id: self.session_id,
            user_id,
        })
        .await;

        if self.participants.is_empty() {
            self.host = None;
            self.state = SessionState::Terminating;
            return;
        }

        if self.host == Some(user_id) {
            self.handle_host_departure().await;
        }
        self.broadcast_presence().await;
    }

    async fn handle_register(&mut self, req: RegisterRequest) {
        let RegisterRequest {
            participant,
            outbound,
            ack,
        } = req;
        let user_id = participant.user_id;
        let is_first = self.participants.is_empty();

        self.participants.insert(
            user_id,
            ParticipantEntry {
                participant: participant.clone(),
                outbound: outbound.clone(),
            },
        );
        if is_first {
            self.host = Some(user_id);
        }
        let _ = ack.send(Ok(()));

        let snapshot = ServerMessage::SyncResponse {
            cells: self.diagram.cells.values().cloned().collect(),
            revision: self.diagram.revision,
        };
        let _ = outbound.try_send(snapshot);

        self.emit(EngineEvent::ParticipantJoined {
            metadata: EventMetadata::new("session"),
            diagram_id: self.diagram_id,
            session_id: self.session_id,
            user_id,
            role: participant.role,
        })
        .await;
        self.broadcast_presence().await;
        self.touch_activity();
    }

    async fn handle_unregister(&mut self, user_id: UserId) {
        self.remove_participant(user_id).await;
        self.touch_activity();
    }

    async fn handle_inbound(&mut self, envelope: InboundEnvelope) {
        let InboundEnvelope { user_id, message } = envelope;
        if !self.participants.contains_key(&user_id) {
            debug!(session_id = %self.session_id, user_id = %user_id, "inbound message from unregistered participant, dropping");
            return;
        }

        match message {
            ClientMessage::Join => {
                // Admission already happened via the register channel; the
                // wire-level `join` is informational only.
            }
            ClientMessage::Leave => self.remove_participant(user_id).await,
            ClientMessage::DiagramOperation(batch) => self.handle_diagram_operation(user_id, batch).await,
            ClientMessage::SyncStatusRequest => {
                self.send_to(
                    user_id,
                    ServerMessage::SyncStatusResponse {
                        revision: self.diagram.revision,
                        cell_count: self.diagram.len(),
                    },
                )
                .await;
            }
            ClientMessage::SyncRequest | ClientMessage::ResyncRequest => {
                // Point-to-point only — no roster-wide broadcast.
                self.send_to(
                    user_id,
                    ServerMessage::SyncResponse {
                        cells: self.diagram.cells.values().cloned().collect(),
                        revision: self.diagram.revision,
                    },
                )
                .await;
            }
            ClientMessage::UndoRequest => self.handle_undo(user_id).await,
            ClientMessage::RedoRequest => self.handle_redo(user_id).await,
            ClientMessage::PresenterCursor(data) => {
                self.broadcast_except(user_id, ServerMessage::PresenterCursor { from: user_id, data })
                    .await;
            }
            ClientMessage::PresenterSelection(data) => {
                self.broadcast_except(user_id, ServerMessage::PresenterSelection { from: user_id, data })
                    .await;
            }
            ClientMessage::Heartbeat => {
                self.send_to(user_id, ServerMessage::Heartbeat).await;
            }
        }
        self.touch_activity();
    }

    async fn handle_diagram_operation(&mut self, origin: UserId, batch: MutationBatch) {
        if !self.can_mutate(origin) {
            self.send_error(origin, "forbidden", "participant role cannot mutate the diagram")
                .await;
            return;
        }

        match safe_process(&self.diagram, &batch) {
            Ok(ProcessOutcome::Accepted {
                diagram,
                applied_batch,
                history,
            }) => {
                let entry = self.commit(diagram, applied_batch, history).await;
                self.undo_stack.push_back(entry);
                self.enforce_undo_limit();
                self.redo_stack.clear();
            }
            Ok(ProcessOutcome::Rejected { reason, cells }) => {
                self.send_to(origin, ServerMessage::StateCorrection { reason, cells }).await;
            }
            Err(panic_msg) => {
                error!(session_id = %self.session_id, panic = %panic_msg, "recovered from panic while processing a diagram operation");
                self.send_error(origin, "server_error", "internal error processing operation")
                    .await;
            }
        }
    }

    /// Apply an already-accepted outcome: replace state, broadcast, persist.
    /// Does not touch the undo/redo stacks — callers (forward mutation,
    /// undo, redo) each push onto the stack appropriate to their direction.
    async fn commit(
        &mut self,
        diagram: Diagram,
        applied_batch: MutationBatch,
        history: collabhub_core::HistoryEntry,
    ) -> collabhub_core::HistoryEntry {
        self.diagram = diagram;
        let revision = self.diagram.revision;
        self.broadcast(ServerMessage::DiagramOperationAccepted {
            batch: applied_batch,
            revision,
        })
        .await;
        self.persist_and_emit().await;
        history
    }

    fn enforce_undo_limit(&mut self) {
        let limit = self.services.config.session.undo_stack_limit;
        while self.undo_stack.len() > limit {
            self.undo_stack.pop_front();
        }
    }

    fn enforce_redo_limit(&mut self) {
        let limit = self.services.config.session.redo_stack_limit;
        while self.redo_stack.len() > limit {
            self.redo_stack.pop_front();
        }
    }

    async fn handle_undo(&mut self, origin: UserId) {
        if !self.can_mutate(origin) {
            self.send_error(origin, "forbidden", "participant role cannot undo")
                .await;
            return;
        }
        let Some(top) = self.undo_stack.pop_back() else {
            self.send_to(
                origin,
                ServerMessage::SyncStatusResponse {
                    revision: self.diagram.revision,
                    cell_count: self.diagram.len(),
                },
            )
            .await;
            return;
        };

        let inverse = top.inverse_batch(0);
        match safe_process(&self.diagram, &inverse) {
            Ok(ProcessOutcome::Accepted {
                diagram,
                applied_batch,
                ..
            }) => {
                self.commit(diagram, applied_batch, top.clone()).await;
                self.redo_stack.push_back(top);
                self.enforce_redo_limit();
            }
            _ => {
                self.undo_stack.push_back(top);
                self.send_error(origin, "server_error", "failed to apply undo").await;
            }
        }
    }

    async fn handle_redo(&mut self, origin: UserId) {
        if !self.can_mutate(origin) {
            self.send_error(origin, "forbidden", "participant role cannot redo")
                .await;
            return;
        }
        let Some(redo_entry) = self.redo_stack.pop_back() else {
            self.send_to(
                origin,
                ServerMessage::SyncStatusResponse {
                    revision: self.diagram.revision,
                    cell_count: self.diagram.len(),
                },
            )
            .await;
            return;
        };

        let forward = redo_entry.forward.clone();
        match safe_process(&self.diagram, &forward) {
            Ok(ProcessOutcome::Accepted {
                diagram,
                applied_batch,
                history,
            }) => {
                self.commit(diagram, applied_batch, history.clone()).await;
                self.undo_stack.push_back(history);
                self.enforce_undo_limit();
            }
            _ => {
                self.redo_stack.push_back(redo_entry);
                self.send_error(origin, "server_error", "failed to apply redo").await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collabhub_test::prelude::*;
    use std::sync::Arc as StdArc;

    fn test_services() -> StdArc<Services> {
        use collabhub_config::Config;
        use collabhub_ratelimit::{ApiRateLimiter, InMemoryOrderedSetStore, SlidingWindowRateLimiter};
        use collabhub_events::EventBus;

        let rate_limiter = ApiRateLimiter::new(
            SlidingWindowRateLimiter::new(StdArc::new(InMemoryOrderedSetStore::new()), 60),
            StdArc::new(FixedQuotaStore::default()),
        );

        StdArc::new(Services::new(
            StdArc::new(FixedAccessChecker::new()),
            StdArc::new(InMemoryDiagramStore::new()),
            StdArc::new(RecordingEventEmitter::new()),
            StdArc::new(InMemoryWebhookSubscriptionStore::new()),
            StdArc::new(InMemoryUserDirectory::new()),
            StdArc::new(rate_limiter),
            EventBus::new(),
            Config::default(),
        ))
    }

    fn owner_participant() -> Participant {
        test_participant("Owner", Role::Owner)
    }

    #[tokio::test]
    async fn join_then_leave_transitions_host_and_tears_down() {
        let services = test_services();
        let handle = spawn(DiagramId::new(), test_diagram(), services);

        let (out_tx, mut out_rx) = mpsc::channel(16);
        let owner = owner_participant();
        let owner_id = owner.user_id;
        handle
            .register(owner, out_tx, Duration::from_secs(1))
            .await
            .expect("registration should succeed");

        // First message sent to a new participant is their sync snapshot.
        let first = out_rx.recv().await.expect("snapshot");
        assert!(matches!(first, ServerMessage::SyncResponse { .. }));
        let presence = out_rx.recv().await.expect("presence broadcast");
        assert!(matches!(presence, ServerMessage::Presence { .. }));

        handle.unregister(owner_id).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        // The session has no participants left; its summary reflects that
        // before the actor fully exits.
        assert_eq!(handle.summary().participant_count, 0);
    }

    #[tokio::test]
    async fn host_transfers_to_longest_connected_writer_on_departure() {
        let services = test_services();
        let handle = spawn(DiagramId::new(), test_diagram(), services);

        let (owner_tx, _owner_rx) = mpsc::channel(16);
        let owner = owner_participant();
        let owner_id = owner.user_id;
        handle.register(owner, owner_tx, Duration::from_secs(1)).await.unwrap();

        let (writer_tx, mut writer_rx) = mpsc::channel(16);
        let writer = test_participant("Writer", Role::Writer);
        let writer_id = writer.user_id;
        handle.register(writer, writer_tx, Duration::from_secs(1)).await.unwrap();
        let _ = writer_rx.recv().await; // snapshot
        let _ = writer_rx.recv().await; // presence after writer joins

        handle.unregister(owner_id).await;

        let host_changed = writer_rx.recv().await.expect("host change broadcast");
        assert!(matches!(
            host_changed,
            ServerMessage::HostChanged { new_host } if new_host == writer_id
        ));
    }

    #[tokio::test]
    async fn reader_cannot_submit_diagram_operations() {
        let services = test_services();
        let handle = spawn(DiagramId::new(), test_diagram(), services);

        let (reader_tx, mut reader_rx) = mpsc::channel(16);
        let reader = test_participant("Reader", Role::Reader);
        let reader_id = reader.user_id;
        handle.register(reader, reader_tx, Duration::from_secs(1)).await.unwrap();
        let _ = reader_rx.recv().await; // snapshot
        let _ = reader_rx.recv().await; // presence

        handle
            .send_inbound(
                reader_id,
                ClientMessage::DiagramOperation(MutationBatch {
                    client_seq: 1,
                    operations: vec![],
                }),
            )
            .await;

        let msg = reader_rx.recv().await.expect("forbidden error");
        assert!(matches!(msg, ServerMessage::Error { error, .. } if error == "forbidden"));
    }

    #[tokio::test]
    async fn undo_then_redo_round_trips_through_the_actor() {
        use collabhub_core::{Cell, CellId, CellOperation, OpKind};

        let services = test_services();
        let handle = spawn(DiagramId::new(), test_diagram(), services);

        let (owner_tx, mut owner_rx) = mpsc::channel(16);
        let owner = owner_participant();
        let owner_id = owner.user_id;
        handle.register(owner, owner_tx, Duration::from_secs(1)).await.unwrap();
        let _ = owner_rx.recv().await; // snapshot
        let _ = owner_rx.recv().await; // presence

        handle
            .send_inbound(
                owner_id,
                ClientMessage::DiagramOperation(MutationBatch {
                    client_seq: 1,
                    operations: vec![CellOperation {
                        cell_id: CellId::new("N1"),
                        operation: OpKind::Add,
                        data: Some(test_node("N1", 0.0, 0.0)),
                    }],
                }),
            )
            .await;
        let accepted = owner_rx.recv().await.expect("accepted broadcast");
        assert!(matches!(accepted, ServerMessage::DiagramOperationAccepted { .. }));

        handle.send_inbound(owner_id, ClientMessage::UndoRequest).await;
        let undone = owner_rx.recv().await.expect("undo broadcast");
        match undone {
            ServerMessage::DiagramOperationAccepted { batch, .. } => {
                assert_eq!(batch.operations[0].operation, OpKind::Remove);
                assert_eq!(batch.operations[0].cell_id, CellId::new("N1"));
            }
            other => panic!("expected undo to broadcast an accepted removal, got {other:?}"),
        }

        handle.send_inbound(owner_id, ClientMessage::RedoRequest).await;
        let redone = owner_rx.recv().await.expect("redo broadcast");
        match redone {
            ServerMessage::DiagramOperationAccepted { batch, .. } => {
                assert_eq!(batch.operations[0].operation, OpKind::Add);
                let Some(Cell::Node(node)) = &batch.operations[0].data else {
                    panic!("expected a node payload");
                };
                assert_eq!(node.id, CellId::new("N1"));
            }
            other => panic!("expected redo to broadcast an accepted re-add, got {other:?}"),
        }

        // A second redo is a no-op: the redo stack was emptied by the
        // original forward mutation's commit and only ever holds one entry
        // after a single undo.
        handle.send_inbound(owner_id, ClientMessage::RedoRequest).await;
        let no_op = owner_rx.recv().await.expect("ack for no-op redo");
        assert!(matches!(no_op, ServerMessage::SyncStatusResponse { .. }));
    }
}
