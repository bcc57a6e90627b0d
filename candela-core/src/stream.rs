use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A pump or connector task that can be polled for exit and torn down.
pub trait Abortable {
    /// Tear the task down; a no-op once it has exited.
    fn abort(&mut self);
    /// `true` once the task has returned on its own or been aborted.
    fn is_finished(&self) -> bool;
}

impl Abortable for JoinHandle<()> {
    fn abort(&mut self) {
        Self::abort(self);
    }

    fn is_finished(&self) -> bool {
        Self::is_finished(self)
    }
}

/// The sending half of a task's unsubscribe signal.
pub trait Stoppable {
    /// Ask the task to unsubscribe; ignored if it already exited.
    fn send(self);
}

impl Stoppable for oneshot::Sender<()> {
    fn send(self) {
        let _ = Self::send(self, ());
    }
}

/// Teardown shared by [`StreamHandle`] and the live feed's drop path.
///
/// Signals the task first, then aborts it unless it already exited. The task
/// may exit concurrently; aborting it then is harmless.
pub fn drop_impl<H, S>(inner: &mut Option<H>, stop_tx: &mut Option<S>)
where
    H: Abortable,
    S: Stoppable,
{
    if let Some(tx) = stop_tx.take() {
        tx.send();
    }
    if let Some(mut h) = inner.take()
        && !h.is_finished()
    {
        h.abort();
    }
}

/// Owner of a connector's streaming task.
///
/// [`stop`](Self::stop) asks the task to finish and waits for it. Dropping the
/// handle without stopping sends the stop signal and aborts the task if it is
/// still running.
#[derive(Debug)]
pub struct StreamHandle {
    inner: Option<JoinHandle<()>>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl StreamHandle {
    /// Wrap a spawned task and the sender half of its stop channel.
    #[must_use]
    pub const fn new(inner: JoinHandle<()>, stop_tx: oneshot::Sender<()>) -> Self {
        Self {
            inner: Some(inner),
            stop_tx: Some(stop_tx),
        }
    }

    /// Signal the task to stop and wait for it to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            Stoppable::send(tx);
        }
        if let Some(handle) = self.inner.take() {
            let _ = handle.await;
        }
    }

    /// Abort the task without waiting.
    pub fn abort(mut self) {
        self.stop_tx.take();
        if let Some(mut handle) = self.inner.take() {
            Abortable::abort(&mut handle);
        }
    }

    /// Whether the task has already completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        drop_impl(&mut self.inner, &mut self.stop_tx);
    }
}
