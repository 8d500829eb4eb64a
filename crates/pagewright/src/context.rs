//! Per-scenario test context with soft assertions.
//!
//! A soft assertion records a mismatch and lets the scenario continue. The
//! collected results dump to JSON as `{"scenario": ..., "soft": [...]}` so a
//! report step can pick them up after the run.
//!
//! ```
//! use pagewright::context::TestContext;
//!
//! let mut ctx = TestContext::new("search docs");
//! ctx.soft_assert(&"test", &"test1", "Both should be equal");
//! assert_eq!(ctx.failure_count(), 1);
//! assert!(ctx.verify().is_err());
//! ```

use crate::result::UiResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::Path;

/// One recorded soft assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftAssertion {
    /// Message given by the test
    pub message: String,
    /// Expected value, debug-formatted
    pub expected: String,
    /// Actual value, debug-formatted
    pub actual: String,
    /// Whether actual matched expected
    pub passed: bool,
    /// Position in the scenario
    pub index: usize,
    /// When it was checked
    pub checked_at: DateTime<Utc>,
}

/// Soft assertion failures reported by [`TestContext::verify`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{count} soft assertion(s) failed: {}", .messages.join("; "))]
pub struct SoftAssertionError {
    /// Failure messages in order
    pub messages: Vec<String>,
    /// Number of failures
    pub count: usize,
}

/// State collected while one scenario runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestContext {
    scenario: String,
    started_at: DateTime<Utc>,
    soft: Vec<SoftAssertion>,
}

impl TestContext {
    /// Start a context for `scenario`
    #[must_use]
    pub fn new(scenario: impl Into<String>) -> Self {
        let scenario = scenario.into();
        tracing::info!("Starting of scenario {scenario}");
        Self {
            scenario,
            started_at: Utc::now(),
            soft: Vec::new(),
        }
    }

    /// Scenario name
    #[must_use]
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    /// Compare `actual` with `expected` and record the outcome.
    ///
    /// Returns whether they matched; a mismatch is logged at error level.
    pub fn soft_assert<T: PartialEq + Debug + ?Sized>(&mut self, actual: &T, expected: &T, message: &str) -> bool {
        let passed = actual == expected;
        self.record(message, format!("{expected:?}"), format!("{actual:?}"), passed);
        passed
    }

    /// Record whether `condition` held
    pub fn soft_assert_true(&mut self, condition: bool, message: &str) -> bool {
        self.record(message, "true".to_string(), condition.to_string(), condition);
        condition
    }

    fn record(&mut self, message: &str, expected: String, actual: String, passed: bool) {
        if passed {
            tracing::info!("soft assert passed : {message}");
        } else {
            tracing::error!("soft assert failed : {message} - expected {expected}, got {actual}");
        }
        self.soft.push(SoftAssertion {
            message: message.to_string(),
            expected,
            actual,
            passed,
            index: self.soft.len(),
            checked_at: Utc::now(),
        });
    }

    /// Every soft assertion checked so far
    #[must_use]
    pub fn assertions(&self) -> &[SoftAssertion] {
        &self.soft
    }

    /// Failed soft assertions
    pub fn failures(&self) -> impl Iterator<Item = &SoftAssertion> {
        self.soft.iter().filter(|a| !a.passed)
    }

    /// Number of failed soft assertions
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Fail with every recorded mismatch, if any
    pub fn verify(&self) -> Result<(), SoftAssertionError> {
        let messages: Vec<String> = self
            .failures()
            .map(|a| format!("{}: expected {}, got {}", a.message, a.expected, a.actual))
            .collect();
        if messages.is_empty() {
            Ok(())
        } else {
            Err(SoftAssertionError {
                count: messages.len(),
                messages,
            })
        }
    }

    /// The context as JSON
    pub fn to_json(&self) -> UiResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON dump to `path`
    pub fn write_json(&self, path: impl AsRef<Path>) -> UiResult<()> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        tracing::debug!(path = %path.as_ref().display(), "test context written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod soft_assert_tests {
        use super::*;

        #[test]
        fn test_mismatch_is_recorded_not_raised() {
            let mut ctx = TestContext::new("search");
            assert!(!ctx.soft_assert("test", "test1", "Both should be equal"));
            assert!(ctx.soft_assert(&3, &3, "counts"));
            assert!(!ctx.soft_assert_true(false, "visible"));

            assert_eq!(ctx.assertions().len(), 3);
            assert_eq!(ctx.failure_count(), 2);
            let err = ctx.verify().unwrap_err();
            assert_eq!(err.count, 2);
            assert_eq!(err.messages[0], "Both should be equal: expected \"test1\", got \"test\"");
        }

        #[test]
        fn test_all_passed_verifies() {
            let mut ctx = TestContext::new("ok");
            ctx.soft_assert(&"a", &"a", "same");
            assert!(ctx.verify().is_ok());
        }
    }

    mod dump_tests {
        use super::*;

        #[test]
        fn test_write_json() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("asserts.json");
            let mut ctx = TestContext::new("dump");
            ctx.soft_assert(&1, &2, "numbers");
            ctx.write_json(&path).unwrap();

            let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
            assert_eq!(value["scenario"], "dump");
            assert_eq!(value["soft"][0]["message"], "numbers");
            assert_eq!(value["soft"][0]["passed"], false);
        }
    }
}
