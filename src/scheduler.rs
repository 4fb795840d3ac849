//! Scheduling contexts for the pipelines.
//!
//! Two contexts exist:
//!
//! - a **background** context ([`SchedulingContext`]) that runs the feed
//!   connector and the pipeline tasks, normally a tokio runtime handle;
//! - a **UI-affine** context ([`UiDispatcher`] / [`UiQueue`]), a mailbox that
//!   is drained only on the thread that draws the screen.
//!
//! Both are passed explicitly to whatever needs them, so tests can run the
//! pipelines on a paused current-thread runtime and drain the mailbox by hand.

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A boxed task handed to a [`SchedulingContext`].
pub type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Somewhere to run background work.
pub trait SchedulingContext: Send + Sync + Debug {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Run a task on this context.
    fn spawn(&self, task: Task) -> JoinHandle<()>;
}

/// Background context backed by a tokio runtime.
#[derive(Debug, Clone)]
pub struct Background {
    name: String,
    handle: Handle,
}

impl Background {
    pub fn new(name: &str, handle: Handle) -> Self {
        Self {
            name: name.to_string(),
            handle,
        }
    }

    /// Use the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn current(name: &str) -> Self {
        Self::new(name, Handle::current())
    }
}

impl SchedulingContext for Background {
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, task: Task) -> JoinHandle<()> {
        tracing::trace!(context = %self.name, "spawning task");
        self.handle.spawn(task)
    }
}

/// Create a UI-affine mailbox.
///
/// The dispatcher half is cheap to clone and can be moved into background
/// tasks; the queue half stays on the UI thread.
pub fn ui_context<T: Send>() -> (UiDispatcher<T>, UiQueue<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let live = Arc::new(AtomicBool::new(true));
    (
        UiDispatcher {
            tx,
            live: live.clone(),
        },
        UiQueue { rx, live },
    )
}

/// Sending half of the UI mailbox.
#[derive(Debug)]
pub struct UiDispatcher<T> {
    tx: mpsc::UnboundedSender<T>,
    live: Arc<AtomicBool>,
}

impl<T> Clone for UiDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            live: self.live.clone(),
        }
    }
}

impl<T> UiDispatcher<T> {
    /// Queue an item for the UI thread.
    ///
    /// Returns `false` once the view is gone, either because the mailbox was
    /// shut down or because the queue was dropped.
    pub fn deliver(&self, item: T) -> bool {
        if !self.is_live() {
            return false;
        }
        self.tx.send(item).is_ok()
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    /// Mark the view as torn down. Anything queued or delivered afterwards
    /// is discarded.
    pub fn shutdown(&self) {
        self.live.store(false, Ordering::Release);
    }
}

/// Receiving half of the UI mailbox. Drain it on the UI thread only.
#[derive(Debug)]
pub struct UiQueue<T> {
    rx: mpsc::UnboundedReceiver<T>,
    live: Arc<AtomicBool>,
}

impl<T> UiQueue<T> {
    /// Apply every pending item, in delivery order. Never blocks.
    ///
    /// Returns the number of items applied; always zero after shutdown.
    pub fn drain(&mut self, mut apply: impl FnMut(T)) -> usize {
        let mut applied = 0;
        while let Ok(item) = self.rx.try_recv() {
            // Checked per item: a shutdown may land mid-drain.
            if !self.is_live() {
                self.discard();
                return applied;
            }
            apply(item);
            applied += 1;
        }
        applied
    }

    /// Wait for the next item. Returns `None` once the mailbox is shut down
    /// or every dispatcher is gone.
    pub async fn recv(&mut self) -> Option<T> {
        if !self.is_live() {
            return None;
        }
        let item = self.rx.recv().await?;
        if self.is_live() {
            Some(item)
        } else {
            self.discard();
            None
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn discard(&mut self) {
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }
}
