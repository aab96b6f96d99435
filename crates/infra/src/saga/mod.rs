//! Saga runner: ordered steps with LIFO compensation.
//!
//! A saga is a list of `{apply, compensate}` steps. The runner applies them in
//! order and stops at the first failure; every step that already succeeded is
//! then compensated, newest first. Compensation failures are logged and never
//! retried; the caller always gets the error of the step that failed.

pub mod steps;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::error::ServiceResult;

pub use steps::{
    AdjustStock, AppendLog, DeleteLineItem, InsertBatch, InsertDeliveryHeader,
    InsertDeliveryItems, InsertLineItem, UpdateLineItem,
};

/// One reversible unit of work.
#[async_trait]
pub trait SagaStep: Send + Sync {
    fn name(&self) -> &'static str;

    async fn apply(&self) -> ServiceResult<()>;

    /// Undo a successful `apply`. Only called after `apply` returned `Ok`.
    async fn compensate(&self) -> ServiceResult<()>;
}

/// Ordered list of steps executed by `run`.
pub struct Saga {
    name: &'static str,
    steps: Vec<Box<dyn SagaStep>>,
}

impl Saga {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: impl SagaStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub async fn run(self) -> ServiceResult<()> {
        for (idx, step) in self.steps.iter().enumerate() {
            debug!(saga = self.name, step = step.name(), "applying saga step");
            if let Err(err) = step.apply().await {
                warn!(
                    saga = self.name,
                    step = step.name(),
                    error = %err,
                    "saga step failed, compensating"
                );
                for done in self.steps[..idx].iter().rev() {
                    if let Err(comp_err) = done.compensate().await {
                        error!(
                            saga = self.name,
                            step = done.name(),
                            error = %comp_err,
                            "saga compensation failed"
                        );
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::ServiceError;

    type Journal = Arc<Mutex<Vec<String>>>;

    struct Recording {
        name: &'static str,
        journal: Journal,
        fail_apply: bool,
        fail_compensate: bool,
    }

    impl Recording {
        fn ok(name: &'static str, journal: &Journal) -> Self {
            Self {
                name,
                journal: journal.clone(),
                fail_apply: false,
                fail_compensate: false,
            }
        }

        fn failing(name: &'static str, journal: &Journal) -> Self {
            Self {
                fail_apply: true,
                ..Self::ok(name, journal)
            }
        }
    }

    #[async_trait]
    impl SagaStep for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn apply(&self) -> ServiceResult<()> {
            self.journal.lock().unwrap().push(format!("apply {}", self.name));
            if self.fail_apply {
                return Err(ServiceError::LogAppend(format!("{} broke", self.name)));
            }
            Ok(())
        }

        async fn compensate(&self) -> ServiceResult<()> {
            self.journal.lock().unwrap().push(format!("undo {}", self.name));
            if self.fail_compensate {
                return Err(ServiceError::InventoryUpdate("undo broke".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn all_steps_apply_in_order() {
        let journal = Journal::default();
        Saga::new("test")
            .step(Recording::ok("a", &journal))
            .step(Recording::ok("b", &journal))
            .run()
            .await
            .unwrap();

        assert_eq!(*journal.lock().unwrap(), vec!["apply a", "apply b"]);
    }

    #[tokio::test]
    async fn failure_compensates_completed_steps_lifo_and_returns_original_error() {
        let journal = Journal::default();
        let err = Saga::new("test")
            .step(Recording::ok("a", &journal))
            .step(Recording::ok("b", &journal))
            .step(Recording::failing("c", &journal))
            .step(Recording::ok("d", &journal))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::LogAppend(ref m) if m == "c broke"));
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["apply a", "apply b", "apply c", "undo b", "undo a"]
        );
    }

    #[tokio::test]
    async fn compensation_failure_does_not_stop_unwinding() {
        let journal = Journal::default();
        let mut b = Recording::ok("b", &journal);
        b.fail_compensate = true;

        let err = Saga::new("test")
            .step(Recording::ok("a", &journal))
            .step(b)
            .step(Recording::failing("c", &journal))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::LogAppend(_)));
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["apply a", "apply b", "apply c", "undo b", "undo a"]
        );
    }
}
