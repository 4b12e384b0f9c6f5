// ── Committed-state subscriptions ──
//
// Both stores publish one `Arc` snapshot per committed operation. A reader
// holding a `SnapshotStream` can only ever see committed states.

use std::sync::Arc;

use tokio::sync::watch;

/// A subscription to a store's committed state.
///
/// Provides both point-in-time snapshot access and change notification via
/// [`changed()`](Self::changed).
pub struct SnapshotStream<T> {
    current: Arc<T>,
    receiver: watch::Receiver<Arc<T>>,
}

impl<T> SnapshotStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<T>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Get the snapshot captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &Arc<T> {
        &self.current
    }

    /// Get the latest committed snapshot.
    pub fn latest(&self) -> Arc<T> {
        self.receiver.borrow().clone()
    }

    /// Whether a commit happened since the last observed snapshot.
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next commit, returning the new snapshot.
    /// Returns `None` if the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<T>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }
}

/// Owner side of a published state: the single writer.
#[derive(Debug)]
pub(crate) struct Published<T> {
    sender: watch::Sender<Arc<T>>,
}

impl<T> Published<T> {
    pub(crate) fn new(initial: T) -> Self {
        let (sender, _) = watch::channel(Arc::new(initial));
        Self { sender }
    }

    pub(crate) fn get(&self) -> Arc<T> {
        self.sender.borrow().clone()
    }

    /// Replace the state in one step and notify subscribers.
    pub(crate) fn commit(&mut self, next: T) {
        self.sender.send_replace(Arc::new(next));
    }

    pub(crate) fn subscribe(&self) -> SnapshotStream<T> {
        SnapshotStream::new(self.sender.subscribe())
    }
}
