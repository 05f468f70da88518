//! Sync engine — reconciles the local board with the shared remote document.
//!
//! DESIGN
//! ======
//! Outbound: every gesture end or clear (re)arms a single-slot debounce
//! timer; when the quiet period elapses the *entire* board is written as one
//! full-document overwrite. Bursts collapse into the last write; there is no
//! sub-document diffing.
//!
//! Inbound: a standing subscription delivers remote snapshots — including the
//! echo of this client's own writes — and each one replaces local state
//! unconditionally via `replace_all`, even when identical. This guarantees
//! convergence without computing diffs, at the cost of discarding an
//! in-progress local gesture when a remote update lands mid-stroke.
//!
//! ERROR HANDLING
//! ==============
//! A failed write is logged and not retried; the next gesture pushes the
//! then-current full state, so nothing is permanently lost, only delayed. A
//! dead subscription is logged once and the board freezes at its last known
//! state; reconnection policy belongs to the backend, not this engine.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{error, warn};
use uuid::Uuid;

use crate::model::{BoardModel, BoardSnapshot, Point, Tool};
use crate::session::{DrawingSession, SessionEvent};

/// Quiet period before a debounced write is sent.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(1500);

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("remote write failed: {0}")]
    Write(String),
    #[error("subscribe failed: {0}")]
    Subscribe(String),
}

/// The shared remote document, keyed by group.
///
/// `write_lines` is a merge-style upsert of `{ lines }` under the group key.
/// `subscribe` opens a push channel that must deliver every change to the
/// document, including changes this client wrote itself.
#[async_trait]
pub trait RemoteBoard: Send + Sync {
    async fn write_lines(&self, group_id: Uuid, snapshot: &BoardSnapshot) -> Result<(), SyncError>;

    async fn subscribe(&self, group_id: Uuid) -> Result<Subscription, SyncError>;
}

/// Local input events fed to [`SyncEngine::run`].
#[derive(Debug, Clone)]
pub enum BoardInput {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp,
    PointerLeave,
    Clear,
    SetTool(Tool),
    SetColor(String),
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Handle to a standing remote subscription.
///
/// Holds the snapshot receiver and an unsubscribe signal. The signal fires on
/// explicit [`unsubscribe`](Self::unsubscribe) or on drop, so the remote side
/// is always released when the view is torn down — there is no implicit
/// process-wide listener.
pub struct Subscription {
    rx: mpsc::Receiver<BoardSnapshot>,
    unsub: Option<oneshot::Sender<()>>,
}

impl Subscription {
    #[must_use]
    pub fn new(rx: mpsc::Receiver<BoardSnapshot>, unsub: oneshot::Sender<()>) -> Self {
        Self { rx, unsub: Some(unsub) }
    }

    /// Receive the next remote snapshot. `None` means the channel died.
    pub async fn next(&mut self) -> Option<BoardSnapshot> {
        self.rx.recv().await
    }

    /// Release the subscription explicitly.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(tx) = self.unsub.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

// =============================================================================
// DEBOUNCE TIMER
// =============================================================================

/// Explicit single-slot cancellable timer. Arming while armed re-arms:
/// debounce, not throttle — only the last trigger in a burst fires.
#[derive(Debug)]
struct DebounceTimer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    fn new(quiet: Duration) -> Self {
        Self { quiet, deadline: None }
    }

    fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.quiet);
    }

    fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarm and fire if the deadline has passed.
    fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Disarm, reporting whether a write was pending.
    fn take(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}

// =============================================================================
// SYNC ENGINE
// =============================================================================

/// Owns the board model, the drawing session, and the debounce timer, and
/// drives both directions of sync against a [`RemoteBoard`].
pub struct SyncEngine<R: RemoteBoard> {
    remote: Arc<R>,
    group_id: Uuid,
    model: BoardModel,
    session: DrawingSession,
    timer: DebounceTimer,
}

impl<R: RemoteBoard> SyncEngine<R> {
    #[must_use]
    pub fn new(remote: Arc<R>, group_id: Uuid) -> Self {
        Self::with_quiet_period(remote, group_id, DEFAULT_QUIET_PERIOD)
    }

    #[must_use]
    pub fn with_quiet_period(remote: Arc<R>, group_id: Uuid, quiet: Duration) -> Self {
        Self {
            remote,
            group_id,
            model: BoardModel::new(),
            session: DrawingSession::default(),
            timer: DebounceTimer::new(quiet),
        }
    }

    #[must_use]
    pub fn model(&self) -> &BoardModel {
        &self.model
    }

    #[must_use]
    pub fn session(&self) -> &DrawingSession {
        &self.session
    }

    /// Whether a debounced write is pending.
    #[must_use]
    pub fn write_pending(&self) -> bool {
        self.timer.deadline().is_some()
    }

    /// Deadline of the pending write, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    // -- local input ----------------------------------------------------------

    /// Apply one local input event.
    pub fn handle(&mut self, input: BoardInput) {
        match input {
            BoardInput::PointerDown(point) => {
                self.session.pointer_down(&mut self.model, point);
            }
            BoardInput::PointerMove(point) => {
                self.session.pointer_move(&mut self.model, point);
            }
            BoardInput::PointerUp => {
                if self.session.pointer_up(&mut self.model) == SessionEvent::GestureEnded {
                    self.timer.arm();
                }
            }
            BoardInput::PointerLeave => {
                if self.session.pointer_leave(&mut self.model) == SessionEvent::GestureEnded {
                    self.timer.arm();
                }
            }
            BoardInput::Clear => {
                self.model.clear();
                self.timer.arm();
            }
            BoardInput::SetTool(tool) => self.session.set_tool(tool),
            BoardInput::SetColor(color) => self.session.set_color(color),
        }
    }

    pub fn pointer_down(&mut self, point: Point) {
        self.handle(BoardInput::PointerDown(point));
    }

    pub fn pointer_move(&mut self, point: Point) {
        self.handle(BoardInput::PointerMove(point));
    }

    pub fn pointer_up(&mut self) {
        self.handle(BoardInput::PointerUp);
    }

    pub fn pointer_leave(&mut self) {
        self.handle(BoardInput::PointerLeave);
    }

    pub fn clear(&mut self) {
        self.handle(BoardInput::Clear);
    }

    // -- remote ----------------------------------------------------------------

    /// Apply a remote snapshot. Unconditional, even when the content is
    /// indistinguishable from the current board and even for the echo of our
    /// own write; an active local gesture is discarded (expected behavior,
    /// not a bug).
    pub fn apply_remote(&mut self, snapshot: BoardSnapshot) {
        self.model.replace_all(snapshot.lines);
    }

    /// Fire the debounced write if its deadline has passed.
    pub async fn tick(&mut self, now: Instant) {
        if self.timer.fire_if_due(now) {
            self.push().await;
        }
    }

    /// Force any pending debounced write out immediately. Used on teardown so
    /// the last gesture is not silently dropped.
    pub async fn flush(&mut self) {
        if self.timer.take() {
            self.push().await;
        }
    }

    async fn push(&mut self) {
        let snapshot = self.model.snapshot();
        if let Err(e) = self.remote.write_lines(self.group_id, &snapshot).await {
            // No retry queue: the next gesture pushes the full current state.
            error!(group_id = %self.group_id, error = %e, "whiteboard write failed");
        }
    }

    // -- driver ----------------------------------------------------------------

    /// Event loop: local inputs, remote snapshots, and the debounce deadline.
    ///
    /// Returns when the input channel closes (view teardown): any pending
    /// write is flushed, the subscription is released, and the final board
    /// state is handed back.
    pub async fn run(mut self, mut inputs: mpsc::Receiver<BoardInput>, mut sub: Subscription) -> BoardModel {
        let mut sub_open = true;
        loop {
            let deadline = self.timer.deadline();
            tokio::select! {
                input = inputs.recv() => {
                    let Some(input) = input else { break };
                    self.handle(input);
                }
                snapshot = sub.next(), if sub_open => {
                    if let Some(snapshot) = snapshot {
                        self.apply_remote(snapshot);
                    } else {
                        warn!(group_id = %self.group_id, "whiteboard subscription closed; board frozen at last known state");
                        sub_open = false;
                    }
                }
                () = async {
                    match deadline {
                        Some(d) => tokio::time::sleep_until(d).await,
                        None => std::future::pending().await,
                    }
                } => {
                    self.tick(Instant::now()).await;
                }
            }
        }

        self.flush().await;
        sub.unsubscribe();
        self.model
    }
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
