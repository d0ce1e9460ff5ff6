//! Verification result collected while checking a fixture.

/// Verification result
#[derive(Debug, Clone, Default)]
pub struct VerificationResult {
    /// List of failures
    pub failures: Vec<String>,
    /// Number of checks that passed
    pub checks_passed: usize,
}

impl VerificationResult {
    /// Create an empty, passing result
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether every check passed
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Record a check, adding `describe()` as a failure when `ok` is false
    pub fn check(&mut self, ok: bool, describe: impl FnOnce() -> String) {
        if ok {
            self.checks_passed += 1;
        } else {
            self.failures.push(describe());
        }
    }

    /// Add failure
    pub fn add_failure(&mut self, message: impl Into<String>) {
        self.failures.push(message.into());
    }
}
