//! Staged transaction engine
//!
//! A generic staged-execution/rollback runner. Independent features
//! contribute handlers; the engine runs them strictly sequentially per
//! stage in registration order, rolls everything back on the first
//! failure, and always finishes with the `complete` stage. The shared
//! mutable context is the only communication channel between handlers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Failure captured from a handler callback. Callers never see anything
/// escape the engine; the triggering error lands on the transaction record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransactionError {
    pub message: String,
}

impl TransactionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<crate::storage::StorageError> for TransactionError {
    fn from(err: crate::storage::StorageError) -> Self {
        Self::new(err.to_string())
    }
}

/// Lifecycle states of one transaction execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionStatus {
    Init,
    Prepare,
    Operation,
    Rollback,
    Complete,
    Failed,
}

/// One contributed step of a transaction.
///
/// All callbacks default to no-ops. `rollback` runs for every handler on
/// the failure path, including handlers whose own forward callbacks never
/// ran; implementations must inspect the shared context to decide what, if
/// anything, needs undoing. `complete` runs exactly once per handler on
/// both paths, with `failed` indicating which one.
#[async_trait]
pub trait TransactionHandler<C: Send + Sync>: Send + Sync {
    async fn prepare(&self, _cx: &mut C) -> Result<(), TransactionError> {
        Ok(())
    }

    async fn operation(&self, _cx: &mut C) -> Result<(), TransactionError> {
        Ok(())
    }

    async fn rollback(&self, _cx: &mut C) -> Result<(), TransactionError> {
        Ok(())
    }

    async fn complete(&self, _cx: &mut C, _failed: bool) -> Result<(), TransactionError> {
        Ok(())
    }
}

/// A staged, rollback-capable execution over an ordered handler list.
pub struct Transaction<C> {
    pub id: Uuid,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<TransactionError>,
    handlers: Vec<Arc<dyn TransactionHandler<C>>>,
}

impl<C: Send + Sync> Transaction<C> {
    pub fn new(handlers: Vec<Arc<dyn TransactionHandler<C>>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: TransactionStatus::Init,
            created_at: Utc::now(),
            completed_at: None,
            error: None,
            handlers,
        }
    }

    /// Run the transaction to a terminal status.
    ///
    /// Handlers execute strictly sequentially within each stage because
    /// later handlers may depend on context mutations made by earlier
    /// ones. The first failing callback skips the remaining forward
    /// stages and triggers rollback for every handler.
    pub async fn execute(&mut self, cx: &mut C) -> TransactionStatus {
        let mut failure: Option<TransactionError> = None;

        self.status = TransactionStatus::Prepare;
        debug!("Transaction {} entering prepare stage", self.id);
        for handler in &self.handlers {
            if let Err(e) = handler.prepare(cx).await {
                failure = Some(e);
                break;
            }
        }

        if failure.is_none() {
            self.status = TransactionStatus::Operation;
            debug!("Transaction {} entering operation stage", self.id);
            for handler in &self.handlers {
                if let Err(e) = handler.operation(cx).await {
                    failure = Some(e);
                    break;
                }
            }
        }

        if let Some(error) = failure {
            self.status = TransactionStatus::Rollback;
            warn!("Transaction {} rolling back: {}", self.id, error);
            for handler in &self.handlers {
                if let Err(e) = handler.rollback(cx).await {
                    // A failed rollback step never masks the original
                    // error.
                    warn!("Transaction {} rollback step failed: {}", self.id, e);
                }
            }
            self.error = Some(error);
        }

        let failed = self.error.is_some();
        for handler in &self.handlers {
            if let Err(e) = handler.complete(cx, failed).await {
                warn!("Transaction {} complete step failed: {}", self.id, e);
            }
        }

        self.status = if failed {
            TransactionStatus::Failed
        } else {
            TransactionStatus::Complete
        };
        self.completed_at = Some(Utc::now());
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    type Trace = Vec<String>;

    struct Step {
        label: &'static str,
        prepare_delay: Option<Duration>,
        has_prepare: bool,
        has_operation: bool,
        fail_in: Option<&'static str>,
    }

    impl Step {
        fn prepare(label: &'static str) -> Self {
            Self {
                label,
                prepare_delay: None,
                has_prepare: true,
                has_operation: false,
                fail_in: None,
            }
        }

        fn operation(label: &'static str) -> Self {
            Self {
                label,
                prepare_delay: None,
                has_prepare: false,
                has_operation: true,
                fail_in: None,
            }
        }
    }

    #[async_trait]
    impl TransactionHandler<Trace> for Step {
        async fn prepare(&self, cx: &mut Trace) -> Result<(), TransactionError> {
            if !self.has_prepare {
                return Ok(());
            }
            if let Some(delay) = self.prepare_delay {
                tokio::time::sleep(delay).await;
            }
            cx.push(format!("{}.prepare", self.label));
            if self.fail_in == Some("prepare") {
                return Err(TransactionError::new("prepare failed"));
            }
            Ok(())
        }

        async fn operation(&self, cx: &mut Trace) -> Result<(), TransactionError> {
            if !self.has_operation {
                return Ok(());
            }
            cx.push(format!("{}.operation", self.label));
            if self.fail_in == Some("operation") {
                return Err(TransactionError::new("operation failed"));
            }
            Ok(())
        }

        async fn rollback(&self, cx: &mut Trace) -> Result<(), TransactionError> {
            cx.push(format!("{}.rollback", self.label));
            Ok(())
        }

        async fn complete(&self, cx: &mut Trace, failed: bool) -> Result<(), TransactionError> {
            cx.push(format!("{}.complete({})", self.label, failed));
            Ok(())
        }
    }

    #[tokio::test]
    async fn handlers_run_in_registration_order_despite_delays() {
        let h1 = Step {
            prepare_delay: Some(Duration::from_millis(100)),
            ..Step::prepare("H1")
        };
        let h2 = Step::prepare("H2");
        let h3 = Step::operation("H3");

        let mut tx = Transaction::new(vec![Arc::new(h3), Arc::new(h1), Arc::new(h2)]);
        let mut trace = Trace::new();
        let status = tx.execute(&mut trace).await;

        assert_eq!(status, TransactionStatus::Complete);
        let forward: Vec<_> = trace
            .iter()
            .filter(|s| !s.contains("complete"))
            .cloned()
            .collect();
        assert_eq!(forward, vec!["H1.prepare", "H2.prepare", "H3.operation"]);
    }

    #[tokio::test]
    async fn failure_triggers_rollback_for_every_handler() {
        let h1 = Step::operation("H1");
        let h2 = Step {
            fail_in: Some("prepare"),
            ..Step::prepare("H2")
        };
        let h3 = Step::prepare("H3");

        let mut tx = Transaction::new(vec![Arc::new(h1), Arc::new(h2), Arc::new(h3)]);
        let mut trace = Trace::new();
        let status = tx.execute(&mut trace).await;

        assert_eq!(status, TransactionStatus::Failed);
        assert_eq!(tx.error.as_ref().unwrap().message, "prepare failed");
        // H3's prepare never ran, H1's operation never ran, yet all three
        // rollbacks ran exactly once in registration order.
        let rollbacks: Vec<_> = trace
            .iter()
            .filter(|s| s.contains("rollback"))
            .cloned()
            .collect();
        assert_eq!(rollbacks, vec!["H1.rollback", "H2.rollback", "H3.rollback"]);
        assert!(!trace.contains(&"H1.operation".to_string()));
        assert!(!trace.contains(&"H3.prepare".to_string()));
    }

    #[tokio::test]
    async fn complete_runs_once_on_both_paths() {
        let ok = Step::prepare("A");
        let mut tx = Transaction::new(vec![Arc::new(ok)]);
        let mut trace = Trace::new();
        tx.execute(&mut trace).await;
        assert_eq!(
            trace.iter().filter(|s| s.contains("complete")).count(),
            1
        );
        assert!(trace.contains(&"A.complete(false)".to_string()));

        let bad = Step {
            fail_in: Some("operation"),
            ..Step::operation("B")
        };
        let mut tx = Transaction::new(vec![Arc::new(bad)]);
        let mut trace = Trace::new();
        let status = tx.execute(&mut trace).await;
        assert_eq!(status, TransactionStatus::Failed);
        assert!(trace.contains(&"B.complete(true)".to_string()));
        assert!(tx.completed_at.is_some());
    }
}
