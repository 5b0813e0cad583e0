//! Startup-condition checking.
//!
//! After every pending binding has executed, beans carrying the
//! [`StartupCondition`] capability are polled until they all report that the
//! container may continue, or until the configured timeout elapses.

use std::sync::Arc;
use std::time::Duration;

use rivet_core::{Container, StartupCondition};
use tokio::time::{Instant, sleep};
use tracing::{debug, trace};

use crate::config::StartupConditionConfig;
use crate::error::{RuntimeError, RuntimeResult};

/// Result of a completed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupVerdict {
    /// Every condition passed (or there were none).
    Passed,
    /// `name` was still failing when the timeout elapsed.
    TimedOut { name: String, message: String },
}

impl StartupVerdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Polls the startup conditions of a container.
#[derive(Debug, Clone, Copy)]
pub struct StartupConditionChecker {
    timeout: Duration,
    interval: Duration,
}

impl StartupConditionChecker {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub fn from_config(config: &StartupConditionConfig) -> Self {
        Self::new(config.timeout(), config.interval())
    }

    /// Polls every condition registered in `container` until all pass.
    ///
    /// Conditions are re-checked from the first one on every round. An error
    /// from a condition ends the check immediately.
    pub async fn check(&self, container: &Container) -> RuntimeResult<StartupVerdict> {
        let conditions = container.beans().startup_conditions();
        if conditions.is_empty() {
            return Ok(StartupVerdict::Passed);
        }
        debug!(
            conditions = conditions.len(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Checking startup conditions"
        );

        let deadline = Instant::now() + self.timeout;
        let mut rounds = 0u32;
        loop {
            rounds += 1;
            let Some(failing) = first_failing(&conditions, container)? else {
                debug!(rounds, "Startup conditions passed");
                return Ok(StartupVerdict::Passed);
            };

            let now = Instant::now();
            if now >= deadline {
                let message = failing
                    .failure_message()
                    .unwrap_or_else(|| format!("not satisfied within {} ms", self.timeout.as_millis()));
                return Ok(StartupVerdict::TimedOut {
                    name: failing.name().to_string(),
                    message,
                });
            }
            trace!(condition = failing.name(), rounds, "Startup condition not yet satisfied");
            sleep(self.interval.min(deadline - now)).await;
        }
    }
}

fn first_failing(
    conditions: &[(String, Arc<dyn StartupCondition>)],
    container: &Container,
) -> RuntimeResult<Option<Arc<dyn StartupCondition>>> {
    for (id, condition) in conditions {
        match condition.can_continue(container) {
            Ok(true) => {}
            Ok(false) => return Ok(Some(Arc::clone(condition))),
            Err(cause) => {
                debug!(bean = %id, condition = condition.name(), "Startup condition raised an error");
                return Err(RuntimeError::StartupConditionError {
                    name: condition.name().to_string(),
                    cause,
                });
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};

    use rivet_core::{Bean, BindingDescriptor, BoxError};

    use super::*;

    struct CountingCondition {
        calls: AtomicU32,
        passes_after: Option<u32>,
    }

    impl CountingCondition {
        fn never() -> Self {
            Self {
                calls: AtomicU32::new(0),
                passes_after: None,
            }
        }

        fn after(calls: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                passes_after: Some(calls),
            }
        }
    }

    impl StartupCondition for CountingCondition {
        fn name(&self) -> &str {
            "counting"
        }

        fn can_continue(&self, _container: &Container) -> Result<bool, BoxError> {
            let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(self.passes_after.is_some_and(|n| calls >= n))
        }

        fn failure_message(&self) -> Option<String> {
            Some("never ready".to_string())
        }
    }

    struct Broken;

    impl StartupCondition for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn can_continue(&self, _container: &Container) -> Result<bool, BoxError> {
            Err(io::Error::other("health check failed").into())
        }
    }

    fn bind_condition<T: StartupCondition + 'static>(container: &Container, id: &str, condition: T) {
        let bean = Bean::builder(condition).startup_condition().build();
        container
            .bind(BindingDescriptor::instance(id, bean))
            .unwrap();
    }

    fn checker() -> StartupConditionChecker {
        StartupConditionChecker::new(Duration::from_millis(250), Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_no_conditions_pass() {
        let container = Container::new("empty");
        assert_eq!(checker().check(&container).await.unwrap(), StartupVerdict::Passed);
    }

    #[tokio::test]
    async fn test_condition_passes_after_polling() {
        let container = Container::new("polling");
        bind_condition(&container, "ready", CountingCondition::after(3));

        let verdict = checker().check(&container).await.unwrap();
        assert!(verdict.is_passed());

        let condition = container.lookup_as::<CountingCondition>("ready").unwrap();
        assert_eq!(condition.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_condition_times_out() {
        let container = Container::new("slow");
        bind_condition(&container, "gate", CountingCondition::never());

        let started = Instant::now();
        let verdict = checker().check(&container).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(250));
        assert_eq!(
            verdict,
            StartupVerdict::TimedOut {
                name: "counting".into(),
                message: "never ready".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_condition_error_ends_check() {
        let container = Container::new("broken");
        bind_condition(&container, "health", Broken);

        let err = checker().check(&container).await.unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::StartupConditionError { ref name, .. } if name == "broken"
        ));
    }
}
