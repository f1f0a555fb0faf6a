//! Wall-clock limits for the uploader and the availability probe
//!
//! A [`Deadline`] starts when a child process has been spawned. Callers
//! poll the child and ask the deadline whether the limit has passed; the
//! deadline itself never touches the process.

use std::time::{Duration, Instant};

/// Timeout configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Hard limit for the upload subprocess (default: 600)
    pub upload_seconds: u64,

    /// Limit for the `--version` probe (default: 5)
    pub probe_seconds: u64,

    /// Time between SIGTERM and SIGKILL when terminating (default: 5)
    pub termination_grace_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            upload_seconds: 600,
            probe_seconds: 5,
            termination_grace_seconds: 5,
        }
    }
}

impl TimeoutConfig {
    pub fn validate(&self) -> Result<(), TimeoutValidationError> {
        if self.upload_seconds == 0 || self.upload_seconds > 86400 {
            return Err(TimeoutValidationError::UploadOutOfBounds {
                value: self.upload_seconds,
            });
        }

        if self.probe_seconds == 0 || self.probe_seconds > 300 {
            return Err(TimeoutValidationError::ProbeOutOfBounds {
                value: self.probe_seconds,
            });
        }

        if self.termination_grace_seconds > 60 {
            return Err(TimeoutValidationError::GraceOutOfBounds {
                value: self.termination_grace_seconds,
            });
        }

        Ok(())
    }

    pub fn upload(&self) -> Duration {
        Duration::from_secs(self.upload_seconds)
    }

    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_seconds)
    }

    pub fn termination_grace(&self) -> Duration {
        Duration::from_secs(self.termination_grace_seconds)
    }
}

/// Timeout validation errors
#[derive(Debug, thiserror::Error)]
pub enum TimeoutValidationError {
    #[error("upload_seconds must be in (0, 86400], got {value}")]
    UploadOutOfBounds { value: u64 },

    #[error("probe_seconds must be in (0, 300], got {value}")]
    ProbeOutOfBounds { value: u64 },

    #[error("termination_grace_seconds must be in [0, 60], got {value}")]
    GraceOutOfBounds { value: u64 },
}

/// A fixed point in time after which a wait gives up.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    limit: Duration,
}

impl Deadline {
    /// Start counting now.
    pub fn after(limit: Duration) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.start.elapsed() >= self.limit
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_timeout_config_default() {
        let config = TimeoutConfig::default();
        assert_eq!(config.upload_seconds, 600);
        assert_eq!(config.probe_seconds, 5);
        assert_eq!(config.termination_grace_seconds, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_upload_zero() {
        let config = TimeoutConfig {
            upload_seconds: 0,
            ..TimeoutConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TimeoutValidationError::UploadOutOfBounds { value: 0 })
        ));
    }

    #[test]
    fn test_validation_upload_too_large() {
        let config = TimeoutConfig {
            upload_seconds: 86401,
            ..TimeoutConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_probe_bounds() {
        let config = TimeoutConfig {
            probe_seconds: 301,
            ..TimeoutConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TimeoutValidationError::ProbeOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_zero_grace_allowed() {
        let config = TimeoutConfig {
            termination_grace_seconds: 0,
            ..TimeoutConfig::default()
        };
        assert!(config.validate().is_ok());

        let config = TimeoutConfig {
            termination_grace_seconds: 61,
            ..TimeoutConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deadline_expires() {
        let deadline = Deadline::after(Duration::from_millis(50));
        assert!(!deadline.is_expired());
        sleep(Duration::from_millis(80));
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_deadline_remaining() {
        let deadline = Deadline::after(Duration::from_secs(10));
        assert!(deadline.remaining() <= Duration::from_secs(10));
        assert!(deadline.remaining() > Duration::from_secs(9));
    }
}
