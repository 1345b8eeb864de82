//! Runtime configuration for the trust core.

use std::time::Duration;

/// Tunables for the vault, reaper, audit trail, and upstream calls.
///
/// Construct with [`CoreConfig::default`] and adjust with the builder
/// setters. Tests typically shrink the durations to milliseconds.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    /// Idle window after which a session expires.
    pub session_ttl: Duration,
    /// Interval between reaper cycles.
    pub reap_interval: Duration,
    /// Maximum number of retained audit events.
    pub audit_capacity: usize,
    /// Timeout applied to every upstream collaborator call.
    pub upstream_timeout: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(3600),
            reap_interval: Duration::from_secs(600),
            audit_capacity: 10_000,
            upstream_timeout: Duration::from_secs(15),
        }
    }
}

impl CoreConfig {
    /// Set the session idle window.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Set the reaper interval.
    pub fn with_reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    /// Set the audit ring capacity.
    pub fn with_audit_capacity(mut self, capacity: usize) -> Self {
        self.audit_capacity = capacity;
        self
    }

    /// Set the upstream call timeout.
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
        assert_eq!(config.reap_interval, Duration::from_secs(600));
        assert_eq!(config.audit_capacity, 10_000);
        assert_eq!(config.upstream_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_builder_chain() {
        let config = CoreConfig::default()
            .with_session_ttl(Duration::from_millis(50))
            .with_audit_capacity(3);
        assert_eq!(config.session_ttl, Duration::from_millis(50));
        assert_eq!(config.audit_capacity, 3);
    }
}
