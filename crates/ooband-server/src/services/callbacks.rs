// ============================================
// File: crates/ooband-server/src/services/callbacks.rs
// ============================================
//! # Callback Matching Engine
//!
//! ## Creation Reason
//! Clients attach (predicate, action) pairs to their session. When an
//! interaction for that session arrives, every predicate is evaluated
//! against the interaction and the matching actions are executed.
//!
//! ## Evaluation Flow
//! ```text
//! for (i, cb) in callbacks:
//!     predicate(cb.dsl, binding) ──timeout──► false / error ──► log, next
//!            │ true
//!            ▼
//!     action(cb.code, binding)   ──timeout──► error ──► log, next
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Callbacks are independent: a failing one never skips its siblings
//! - Scripts run on the blocking pool; the timeout only stops waiting,
//!   the evaluator itself must enforce its deadline

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use ooband_core::protocol::{Callback, Protocol};

use crate::error::{Result, ServerError};
use crate::services::dsl::DslEvaluator;

// ============================================
// CallbackBinding
// ============================================

/// What predicates and actions can see about an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackBinding {
    /// Capture protocol.
    pub protocol: Protocol,
    /// Peer address, `ip:port`.
    pub remote_addr: String,
    /// SMTP envelope sender; empty for other protocols.
    pub from: String,
    /// Recipients, query name or host.
    pub to: Vec<String>,
    /// Message body or raw request.
    pub data: String,
}

// ============================================
// CallbackReport
// ============================================

/// Outcome of one engine run.
#[derive(Debug, Default)]
pub struct CallbackReport {
    /// Predicates evaluated.
    pub evaluated: usize,
    /// Predicates that returned true.
    pub matched: usize,
    /// Actions that completed.
    pub executed: usize,
    /// Per-callback failures, in order.
    pub failures: Vec<ServerError>,
}

impl CallbackReport {
    /// `true` if every evaluation succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// ============================================
// CallbackEngine
// ============================================

/// Runs a session's callbacks against an interaction.
#[derive(Clone)]
pub struct CallbackEngine {
    evaluator: Arc<dyn DslEvaluator>,
    timeout: Duration,
}

impl CallbackEngine {
    /// Creates an engine bounding each evaluation by `timeout`.
    #[must_use]
    pub fn new(evaluator: Arc<dyn DslEvaluator>, timeout: Duration) -> Self {
        Self { evaluator, timeout }
    }

    /// Evaluates every callback in declaration order.
    pub async fn run(&self, binding: CallbackBinding, callbacks: &[Callback]) -> CallbackReport {
        let binding = Arc::new(binding);
        let mut report = CallbackReport::default();

        for (index, callback) in callbacks.iter().enumerate() {
            report.evaluated += 1;

            let expr = callback.dsl.clone();
            let predicate = self
                .evaluate(index, "predicate", &binding, move |evaluator, binding| {
                    evaluator.evaluate_predicate(&expr, binding)
                })
                .await;

            match predicate {
                Ok(false) => continue,
                Ok(true) => report.matched += 1,
                Err(e) => {
                    warn!(protocol = %binding.protocol, error = %e, "Callback predicate failed");
                    report.failures.push(e);
                    continue;
                }
            }

            let code = callback.code.clone();
            let action = self
                .evaluate(index, "action", &binding, move |evaluator, binding| {
                    evaluator.execute_action(&code, binding)
                })
                .await;

            match action {
                Ok(()) => report.executed += 1,
                Err(e) => {
                    warn!(protocol = %binding.protocol, error = %e, "Callback action failed");
                    report.failures.push(e);
                }
            }
        }

        debug!(
            evaluated = report.evaluated,
            matched = report.matched,
            executed = report.executed,
            failed = report.failures.len(),
            "Callbacks evaluated"
        );
        report
    }

    async fn evaluate<T, F>(
        &self,
        index: usize,
        stage: &'static str,
        binding: &Arc<CallbackBinding>,
        f: F,
    ) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn DslEvaluator, &CallbackBinding) -> Result<T> + Send + 'static,
    {
        let evaluator = Arc::clone(&self.evaluator);
        let binding = Arc::clone(binding);
        let task = tokio::task::spawn_blocking(move || f(evaluator.as_ref(), &binding));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(e))) => Err(ServerError::callback(index, stage, e.to_string())),
            Ok(Err(join)) => Err(ServerError::callback(index, stage, join.to_string())),
            Err(_) => Err(ServerError::callback(
                index,
                stage,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }
}

impl std::fmt::Debug for CallbackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackEngine")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Predicates: `"true"`, `"false"`, `"error"`, `"slow"`.
    /// Actions: `"fail"` errors, anything else is recorded.
    #[derive(Default)]
    struct StubEvaluator {
        executed: Mutex<Vec<String>>,
    }

    impl DslEvaluator for StubEvaluator {
        fn evaluate_predicate(&self, expr: &str, _binding: &CallbackBinding) -> Result<bool> {
            match expr {
                "true" => Ok(true),
                "slow" => {
                    std::thread::sleep(Duration::from_millis(200));
                    Ok(true)
                }
                "error" => Err(ServerError::DslEvaluation("bad predicate".into())),
                _ => Ok(false),
            }
        }

        fn execute_action(&self, code: &str, _binding: &CallbackBinding) -> Result<()> {
            if code == "fail" {
                return Err(ServerError::DslEvaluation("action failed".into()));
            }
            self.executed.lock().push(code.to_owned());
            Ok(())
        }
    }

    fn binding() -> CallbackBinding {
        CallbackBinding {
            protocol: Protocol::Smtp,
            remote_addr: "192.0.2.1:40000".into(),
            from: "a@b.test".into(),
            to: vec!["x@y.test".into()],
            data: "hello".into(),
        }
    }

    #[tokio::test]
    async fn test_only_matching_actions_run() {
        let stub = Arc::new(StubEvaluator::default());
        let engine = CallbackEngine::new(stub.clone(), Duration::from_secs(1));
        let callbacks = vec![
            Callback::new("true", "first"),
            Callback::new("false", "second"),
            Callback::new("true", "third"),
        ];

        let report = engine.run(binding(), &callbacks).await;

        assert_eq!(report.evaluated, 3);
        assert_eq!(report.matched, 2);
        assert_eq!(*stub.executed.lock(), vec!["first", "third"]);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_failing_action_does_not_stop_siblings() {
        let stub = Arc::new(StubEvaluator::default());
        let engine = CallbackEngine::new(stub.clone(), Duration::from_secs(1));
        let callbacks = vec![Callback::new("true", "fail"), Callback::new("true", "second")];

        let report = engine.run(binding(), &callbacks).await;

        assert_eq!(*stub.executed.lock(), vec!["second"]);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0],
            ServerError::Callback { index: 0, stage: "action", .. }
        ));
    }

    #[tokio::test]
    async fn test_predicate_error_and_timeout_are_isolated() {
        let stub = Arc::new(StubEvaluator::default());
        let engine = CallbackEngine::new(stub.clone(), Duration::from_millis(20));
        let callbacks = vec![
            Callback::new("error", "never"),
            Callback::new("slow", "late"),
            Callback::new("true", "ran"),
        ];

        let report = engine.run(binding(), &callbacks).await;

        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.executed, 1);
        assert!(stub.executed.lock().contains(&"ran".to_owned()));
    }
}
