//! Bounded attempt history

use heapless::Deque;

use crate::enforce::EnforcementAttempt;

/// Attempts retained for diagnostics
pub const HISTORY_DEPTH: usize = 8;

/// Last `N` enforcement attempts, most recent first
///
/// Older entries are dropped once the history is full. Lifetime totals
/// keep counting past the window.
#[derive(Debug, Clone)]
pub struct AttemptHistory<const N: usize = HISTORY_DEPTH> {
    attempts: Deque<EnforcementAttempt, N>,
    total: u32,
    failed: u32,
}

impl<const N: usize> Default for AttemptHistory<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> AttemptHistory<N> {
    /// Create an empty history
    pub const fn new() -> Self {
        Self {
            attempts: Deque::new(),
            total: 0,
            failed: 0,
        }
    }

    /// Record an attempt, evicting the oldest when full
    pub fn record(&mut self, attempt: EnforcementAttempt) {
        if self.attempts.is_full() {
            self.attempts.pop_back();
        }
        // Cannot fail: room was made above
        let _ = self.attempts.push_front(attempt);

        self.total = self.total.saturating_add(1);
        if !attempt.success() {
            self.failed = self.failed.saturating_add(1);
        }
    }

    /// Most recent attempt
    pub fn latest(&self) -> Option<&EnforcementAttempt> {
        self.attempts.front()
    }

    /// Attempts, most recent first
    pub fn iter(&self) -> impl Iterator<Item = &EnforcementAttempt> {
        self.attempts.iter()
    }

    /// Number of retained attempts
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    /// Check if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// Failed attempts in a row, counted from the most recent
    ///
    /// Bounded by the window size.
    pub fn consecutive_failures(&self) -> usize {
        self.attempts.iter().take_while(|a| !a.success()).count()
    }

    /// Attempts recorded over the lifetime of the history
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Failed attempts recorded over the lifetime of the history
    pub fn failed(&self) -> u32 {
        self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforce::EnforceError;
    use crate::pin::{PinConfiguration, Pull};

    fn ok(pull: Pull) -> EnforcementAttempt {
        EnforcementAttempt {
            error: None,
            ..failed(pull)
        }
    }

    fn failed(pull: Pull) -> EnforcementAttempt {
        EnforcementAttempt::rejected(PinConfiguration::input(pull), EnforceError::DeviceNotReady)
    }

    #[test]
    fn test_most_recent_first() {
        let mut history: AttemptHistory<4> = AttemptHistory::new();
        history.record(ok(Pull::None));
        history.record(ok(Pull::PullDown));
        history.record(ok(Pull::PullUp));

        let pulls: heapless::Vec<Pull, 4> = history.iter().map(|a| a.target.pull).collect();
        assert_eq!(pulls.as_slice(), &[Pull::PullUp, Pull::PullDown, Pull::None]);
        assert_eq!(history.latest().map(|a| a.target.pull), Some(Pull::PullUp));
    }

    #[test]
    fn test_bounded() {
        let mut history: AttemptHistory<3> = AttemptHistory::new();
        for _ in 0..5 {
            history.record(ok(Pull::None));
        }
        history.record(ok(Pull::PullDown));

        assert_eq!(history.len(), 3);
        assert_eq!(history.total(), 6);
        assert_eq!(history.latest().map(|a| a.target.pull), Some(Pull::PullDown));
    }

    #[test]
    fn test_consecutive_failures() {
        let mut history = AttemptHistory::<HISTORY_DEPTH>::new();
        assert!(history.is_empty());
        assert_eq!(history.consecutive_failures(), 0);

        history.record(failed(Pull::PullDown));
        history.record(ok(Pull::PullDown));
        history.record(failed(Pull::PullDown));
        history.record(failed(Pull::PullDown));

        assert_eq!(history.consecutive_failures(), 2);
        assert_eq!(history.failed(), 3);
    }
}
