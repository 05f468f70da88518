use super::*;

use crate::model::Stroke;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

/// Remote double: records writes, can be told to fail the next N of them.
#[derive(Default)]
struct MockRemote {
    writes: Mutex<Vec<(Uuid, BoardSnapshot)>>,
    fail_writes: AtomicUsize,
    sub_senders: Mutex<Vec<mpsc::Sender<BoardSnapshot>>>,
}

impl MockRemote {
    fn writes(&self) -> Vec<(Uuid, BoardSnapshot)> {
        self.writes.lock().expect("mock mutex should lock").clone()
    }

    fn fail_next_writes(&self, count: usize) {
        self.fail_writes.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteBoard for MockRemote {
    async fn write_lines(&self, group_id: Uuid, snapshot: &BoardSnapshot) -> Result<(), SyncError> {
        let remaining = self.fail_writes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_writes.store(remaining - 1, Ordering::SeqCst);
            return Err(SyncError::Write("injected failure".into()));
        }
        self.writes
            .lock()
            .expect("mock mutex should lock")
            .push((group_id, snapshot.clone()));
        Ok(())
    }

    async fn subscribe(&self, _group_id: Uuid) -> Result<Subscription, SyncError> {
        let (tx, rx) = mpsc::channel(8);
        let (unsub_tx, _unsub_rx) = oneshot::channel();
        self.sub_senders
            .lock()
            .expect("mock mutex should lock")
            .push(tx);
        Ok(Subscription::new(rx, unsub_tx))
    }
}

fn test_subscription() -> (mpsc::Sender<BoardSnapshot>, oneshot::Receiver<()>, Subscription) {
    let (tx, rx) = mpsc::channel(8);
    let (unsub_tx, unsub_rx) = oneshot::channel();
    (tx, unsub_rx, Subscription::new(rx, unsub_tx))
}

fn engine(remote: &Arc<MockRemote>) -> SyncEngine<MockRemote> {
    SyncEngine::new(Arc::clone(remote), Uuid::new_v4())
}

fn quick_gesture(engine: &mut SyncEngine<MockRemote>, x: f64, y: f64) {
    engine.pointer_down(pt(x, y));
    engine.pointer_up();
}

// =============================================================================
// DEBOUNCE
// =============================================================================

#[tokio::test(start_paused = true)]
async fn burst_of_gesture_ends_collapses_into_one_write() {
    let remote = Arc::new(MockRemote::default());
    let mut engine = engine(&remote);

    quick_gesture(&mut engine, 1.0, 1.0);
    tokio::time::advance(Duration::from_millis(500)).await;
    engine.tick(Instant::now()).await;
    assert!(remote.writes().is_empty(), "quiet period not yet elapsed");

    // Second gesture inside the quiet window re-arms the timer.
    quick_gesture(&mut engine, 2.0, 2.0);
    tokio::time::advance(Duration::from_millis(1400)).await;
    engine.tick(Instant::now()).await;
    assert!(remote.writes().is_empty(), "retrigger must reset the timer");

    tokio::time::advance(Duration::from_millis(200)).await;
    engine.tick(Instant::now()).await;

    let writes = remote.writes();
    assert_eq!(writes.len(), 1, "burst collapses into exactly one write");
    assert_eq!(writes[0].1.lines.len(), 2, "write carries the board as of the last gesture end");
}

#[tokio::test(start_paused = true)]
async fn tick_before_deadline_never_writes() {
    let remote = Arc::new(MockRemote::default());
    let mut engine = engine(&remote);

    quick_gesture(&mut engine, 1.0, 1.0);
    for _ in 0..5 {
        tokio::time::advance(Duration::from_millis(100)).await;
        engine.tick(Instant::now()).await;
    }
    assert!(remote.writes().is_empty());
    assert!(engine.write_pending());
}

#[tokio::test(start_paused = true)]
async fn clear_converges_remote_to_empty_lines() {
    let remote = Arc::new(MockRemote::default());
    let mut engine = engine(&remote);

    quick_gesture(&mut engine, 1.0, 1.0);
    tokio::time::advance(DEFAULT_QUIET_PERIOD).await;
    engine.tick(Instant::now()).await;
    assert_eq!(remote.writes().len(), 1);

    engine.clear();
    tokio::time::advance(DEFAULT_QUIET_PERIOD).await;
    engine.tick(Instant::now()).await;

    let writes = remote.writes();
    assert_eq!(writes.len(), 2);
    assert!(writes[1].1.lines.is_empty(), "clear syncs as a write of empty lines");
}

// =============================================================================
// FAILURE HANDLING
// =============================================================================

#[tokio::test(start_paused = true)]
async fn failed_write_is_not_retried_until_the_next_gesture() {
    let remote = Arc::new(MockRemote::default());
    let mut engine = engine(&remote);
    remote.fail_next_writes(1);

    quick_gesture(&mut engine, 1.0, 1.0);
    tokio::time::advance(DEFAULT_QUIET_PERIOD).await;
    engine.tick(Instant::now()).await;
    assert!(remote.writes().is_empty(), "first write fails");
    assert!(!engine.write_pending(), "no automatic retry");

    // The next gesture re-attempts with the then-current full state.
    quick_gesture(&mut engine, 2.0, 2.0);
    tokio::time::advance(DEFAULT_QUIET_PERIOD).await;
    engine.tick(Instant::now()).await;

    let writes = remote.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].1.lines.len(), 2, "retry carries the full board, nothing is lost");
}

// =============================================================================
// INBOUND REPLACEMENT
// =============================================================================

#[tokio::test]
async fn remote_snapshot_mid_gesture_wins() {
    let remote = Arc::new(MockRemote::default());
    let mut engine = engine(&remote);

    engine.pointer_down(pt(1.0, 1.0));
    engine.pointer_move(pt(2.0, 2.0));

    let snapshot = BoardSnapshot { lines: vec![Stroke::new(Tool::Pen, "#abc", pt(9.0, 9.0))] };
    engine.apply_remote(snapshot.clone());

    assert_eq!(engine.model().lines(), snapshot.lines.as_slice());
    engine.pointer_up();
    assert!(!engine.write_pending(), "discarded gesture must not schedule a write");
}

#[tokio::test]
async fn replaying_the_same_notification_is_idempotent() {
    let remote = Arc::new(MockRemote::default());
    let mut engine = engine(&remote);

    let snapshot = BoardSnapshot {
        lines: vec![
            Stroke::new(Tool::Pen, "#abc", pt(1.0, 1.0)),
            Stroke::new(Tool::Eraser, "#000", pt(2.0, 2.0)),
        ],
    };
    engine.apply_remote(snapshot.clone());
    let once = engine.model().snapshot();
    engine.apply_remote(snapshot);
    assert_eq!(engine.model().snapshot(), once);
}

// =============================================================================
// FLUSH / TEARDOWN
// =============================================================================

#[tokio::test]
async fn flush_forces_the_pending_write_out() {
    let remote = Arc::new(MockRemote::default());
    let mut engine = engine(&remote);

    quick_gesture(&mut engine, 1.0, 1.0);
    assert!(engine.write_pending());

    engine.flush().await;
    assert_eq!(remote.writes().len(), 1);
    assert!(!engine.write_pending());

    engine.flush().await;
    assert_eq!(remote.writes().len(), 1, "flush without a pending write does nothing");
}

#[tokio::test]
async fn run_flushes_pending_write_and_unsubscribes_on_teardown() {
    let remote = Arc::new(MockRemote::default());
    let engine = engine(&remote);
    let (input_tx, input_rx) = mpsc::channel(8);
    let (_snap_tx, unsub_rx, sub) = test_subscription();

    let handle = tokio::spawn(engine.run(input_rx, sub));

    input_tx
        .send(BoardInput::PointerDown(pt(1.0, 1.0)))
        .await
        .expect("send down");
    input_tx.send(BoardInput::PointerUp).await.expect("send up");
    drop(input_tx);

    let model = handle.await.expect("run task");
    assert_eq!(model.lines().len(), 1);
    assert_eq!(remote.writes().len(), 1, "teardown must flush the pending debounced write");
    assert!(unsub_rx.await.is_ok(), "teardown must release the subscription");
}

#[tokio::test]
async fn run_applies_inbound_snapshots() {
    let remote = Arc::new(MockRemote::default());
    let engine = engine(&remote);
    let (input_tx, input_rx) = mpsc::channel(8);
    let (snap_tx, _unsub_rx, sub) = test_subscription();

    let handle = tokio::spawn(engine.run(input_rx, sub));

    let snapshot = BoardSnapshot { lines: vec![Stroke::new(Tool::Pen, "#fff", pt(3.0, 3.0))] };
    snap_tx.send(snapshot.clone()).await.expect("send snapshot");

    // Let the loop drain the subscription before closing the input channel.
    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(input_tx);

    let model = handle.await.expect("run task");
    assert_eq!(model.lines(), snapshot.lines.as_slice());
    assert!(remote.writes().is_empty(), "inbound updates never trigger writes");
}

#[tokio::test]
async fn dropping_a_subscription_releases_it() {
    let (_snap_tx, unsub_rx, sub) = test_subscription();
    drop(sub);
    assert!(unsub_rx.await.is_ok());
}
