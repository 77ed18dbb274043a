//! Save tasks supplied by the caller

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Authoritative "saved at" time reported by the backing store (Unix milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_unix_ms(ms: u64) -> Self {
        Self(ms)
    }

    pub const fn as_unix_ms(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type TaskFn = dyn Fn() -> BoxFuture<'static, anyhow::Result<Timestamp>> + Send + Sync;

/// A persistence operation
///
/// The closure is invoked once per attempt, so a retry re-runs the whole write.
/// It must resolve to the timestamp the store assigned to the write, or fail.
#[derive(Clone)]
pub struct SaveTask {
    run: Arc<TaskFn>,
}

impl SaveTask {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Timestamp>> + Send + 'static,
    {
        Self {
            run: Arc::new(move || f().boxed()),
        }
    }

    /// Start one attempt
    pub(crate) fn invoke(&self) -> BoxFuture<'static, anyhow::Result<Timestamp>> {
        (self.run)()
    }
}

impl fmt::Debug for SaveTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveTask").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_task_is_reinvokable() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let task = SaveTask::new(move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Timestamp::from_unix_ms(n as u64))
            }
        });

        assert_eq!(task.invoke().await.unwrap(), Timestamp::from_unix_ms(1));
        assert_eq!(task.invoke().await.unwrap(), Timestamp::from_unix_ms(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_timestamp_ordering() {
        let a = Timestamp::from_unix_ms(10);
        let b = Timestamp::from_unix_ms(20);
        assert!(a < b);
        assert_eq!(b.as_unix_ms(), 20);
        assert_eq!(a.to_string(), "10");
    }
}
