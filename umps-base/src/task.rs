//! Cooperative task cancellation, in the style of a scoped `JoinHandle`.
//!
//! Every long-lived UMPS component (the ZAP service, a proxy, a replier) is driven by one
//! [`JoinGuard`]. The component's `stop()` calls [`JoinGuard::cancel`], which wakes every
//! [`Cancel::wait`] await point inside the actor's `select!` loop; the destructor cancels and
//! detaches rather than blocking.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::{JoinError, JoinHandle};
use tokio::time;

#[derive(Debug, Default)]
struct Flag {
    flag: AtomicBool,
    notify: Notify,
}

impl Flag {
    fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    async fn wait(&self) {
        loop {
            if self.is_set() {
                return;
            }
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

/// A cooperative stop signal shared between a spawned task and its owner.
#[derive(Clone, Debug, Default)]
pub struct Cancel(Arc<Flag>);

impl Cancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.is_set()
    }

    pub fn set(&self) {
        self.0.set();
    }

    pub async fn wait(&self) {
        self.0.wait().await;
    }
}

/// Error returned when a [`JoinGuard`] fails to shut down within its timeout.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ShutdownError {
    JoinTimeout,
    TaskAborted,
}

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum Stage<T> {
    Running(JoinHandle<T>),
    Finished(Result<T, JoinError>),
    Consumed,
}

/// A `tokio` task handle paired with the [`Cancel`] flag that was handed to its future.
#[derive(Debug)]
pub struct JoinGuard<T> {
    stage: Stage<T>,
    cancel: Cancel,
}

impl<T> JoinGuard<T>
where
    T: Send + 'static,
{
    /// Spawns `new_future(cancel)` on the current runtime, handing it a fresh [`Cancel`].
    pub fn spawn<F>(new_future: impl FnOnce(Cancel) -> F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        let cancel = Cancel::new();
        let handle = tokio::spawn(new_future(cancel.clone()));
        Self {
            stage: Stage::Running(handle),
            cancel,
        }
    }

    pub fn cancel_handle(&self) -> Cancel {
        self.cancel.clone()
    }

    /// Sets the cancel flag without waiting for the task to observe it.
    pub fn cancel(&self) {
        self.cancel.set();
    }

    pub fn is_finished(&self) -> bool {
        match &self.stage {
            Stage::Running(handle) => handle.is_finished(),
            _ => true,
        }
    }

    /// Cancels the task and waits up to `timeout` for it to finish, aborting otherwise.
    pub async fn shutdown_with_timeout(&mut self, timeout: Duration) -> Result<T, ShutdownError> {
        self.cancel();
        match time::timeout(timeout, self.join_inner()).await {
            Ok(result) => result,
            Err(_) => {
                if let Stage::Running(handle) = &self.stage {
                    handle.abort();
                }
                self.stage = Stage::Consumed;
                Err(ShutdownError::JoinTimeout)
            }
        }
    }

    pub async fn shutdown(&mut self) -> Result<T, ShutdownError> {
        self.shutdown_with_timeout(SHUTDOWN_TIMEOUT).await
    }

    /// Waits for the task to finish, without signaling cancellation first.
    pub async fn join(&mut self) -> Result<T, ShutdownError> {
        self.join_inner().await
    }

    async fn join_inner(&mut self) -> Result<T, ShutdownError> {
        match std::mem::replace(&mut self.stage, Stage::Consumed) {
            Stage::Running(handle) => match handle.await {
                Ok(value) => Ok(value),
                Err(error) if error.is_cancelled() => Err(ShutdownError::TaskAborted),
                Err(_) => Err(ShutdownError::TaskAborted),
            },
            Stage::Finished(Ok(value)) => Ok(value),
            Stage::Finished(Err(_)) => Err(ShutdownError::TaskAborted),
            Stage::Consumed => panic!("JoinGuard already consumed"),
        }
    }
}

impl<T> Drop for JoinGuard<T> {
    fn drop(&mut self) {
        self.cancel.set();
        if let Stage::Running(handle) = &self.stage {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_wakes_waiter() {
        let cancel = Cancel::new();
        let waiter = {
            let cancel = cancel.clone();
            tokio::spawn(async move { cancel.wait().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        cancel.set();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn join_guard_cancel_then_join() {
        let mut guard = JoinGuard::spawn(|cancel| async move {
            cancel.wait().await;
            42
        });
        assert_eq!(guard.shutdown().await, Ok(42));
    }

    #[tokio::test]
    async fn join_guard_shutdown_timeout_aborts() {
        let mut guard: JoinGuard<()> = JoinGuard::spawn(|_cancel| async move {
            loop {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        });
        let result = guard.shutdown_with_timeout(Duration::from_millis(20)).await;
        assert_eq!(result, Err(ShutdownError::JoinTimeout));
    }
}
