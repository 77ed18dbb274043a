//! Save outcome callbacks

use crate::error::ErrorInfo;
use crate::task::Timestamp;

/// Receives save outcomes from the coordinator's worker
///
/// `on_success` fires once per successful save. `on_error` fires once per save
/// cycle that exhausted its attempts, never per failed attempt. Both run on the
/// worker task and should return quickly.
pub trait SaveObserver: Send + Sync + 'static {
    fn on_success(&self, _saved_at: Timestamp) {}

    fn on_error(&self, _error: &ErrorInfo) {}
}

/// Observer that ignores every outcome
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SaveObserver for NoopObserver {}
