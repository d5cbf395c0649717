//! Enforcement attempt records

use crate::pin::{decode, Level, PinConfiguration, RegisterEncoding, Unsupported};

/// Why an enforcement cycle did not hold the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EnforceError {
    /// Register block not available yet; retried by the scheduler
    DeviceNotReady,
    /// Read-back after writing did not match the target encoding
    ConfigurationMismatch,
    /// Target cannot be held on this hardware; nothing was written
    UnsupportedConfiguration(Unsupported),
}

/// Which configuration the cycle left in the register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Applied {
    /// Nothing was written
    Nothing,
    /// The requested target
    Target,
    /// The fallback configuration, after the target did not hold
    Fallback(PinConfiguration),
}

/// Outcome of one enforcement cycle
///
/// Produced by every `enforce` call and discarded after the next few
/// cycles; diagnostics keep a bounded history of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnforcementAttempt {
    /// Configuration that was asked for
    pub target: PinConfiguration,
    /// Configuration that was written last
    pub applied: Applied,
    /// `PIN_CNF` read back at the end of the cycle
    pub read_back: Option<RegisterEncoding>,
    /// Input level sampled at the end of the cycle
    pub level: Option<Level>,
    /// Failure reason, `None` when the target is held
    pub error: Option<EnforceError>,
}

impl EnforcementAttempt {
    pub(crate) const fn rejected(target: PinConfiguration, error: EnforceError) -> Self {
        Self {
            target,
            applied: Applied::Nothing,
            read_back: None,
            level: None,
            error: Some(error),
        }
    }

    /// Check whether the original target is held
    pub const fn success(&self) -> bool {
        self.error.is_none()
    }

    /// Check whether the one-shot fallback was used
    pub const fn used_fallback(&self) -> bool {
        matches!(self.applied, Applied::Fallback(_))
    }

    /// Check whether the fallback configuration itself held
    pub fn fallback_held(&self) -> bool {
        match (self.applied, self.resulting()) {
            (Applied::Fallback(fallback), Some(resulting)) => fallback == resulting,
            _ => false,
        }
    }

    /// Configuration decoded from the read-back
    pub fn resulting(&self) -> Option<PinConfiguration> {
        self.read_back.and_then(|raw| decode(raw).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::{encode, Pull};

    #[test]
    fn test_rejected_attempt() {
        let attempt =
            EnforcementAttempt::rejected(PinConfiguration::pull_down(), EnforceError::DeviceNotReady);
        assert!(!attempt.success());
        assert!(!attempt.used_fallback());
        assert_eq!(attempt.applied, Applied::Nothing);
        assert_eq!(attempt.resulting(), None);
    }

    #[test]
    fn test_fallback_held() {
        let fallback = PinConfiguration::input(Pull::None);
        let attempt = EnforcementAttempt {
            target: PinConfiguration::pull_down(),
            applied: Applied::Fallback(fallback),
            read_back: Some(encode(&fallback)),
            level: Some(Level::Low),
            error: Some(EnforceError::ConfigurationMismatch),
        };
        assert!(!attempt.success());
        assert!(attempt.used_fallback());
        assert!(attempt.fallback_held());
        assert_eq!(attempt.resulting(), Some(fallback));
    }
}
