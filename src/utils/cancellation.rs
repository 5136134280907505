use crate::error::RankingError;
use chrono::{DateTime, Utc};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc
};

/// Cooperative cancellation for a ranking run.
///
/// Clones share the same flag, so a signal handler can hold one copy while the
/// pipeline polls another. Polling happens between users while building the duel
/// matrix and between pruning iterations. Nothing is persisted once a check fails.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<DateTime<Utc>>
}

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    pub fn with_deadline(deadline: DateTime<Utc>) -> CancellationToken {
        CancellationToken {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline)
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn check(&self) -> Result<(), RankingError> {
        if self.is_cancelled() {
            return Err(RankingError::Cancelled);
        }

        match self.deadline {
            Some(deadline) if Utc::now() >= deadline => Err(RankingError::DeadlineExceeded),
            _ => Ok(())
        }
    }
}
