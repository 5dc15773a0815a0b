//! Common error types for the gateway core

use std::fmt;

use thiserror::Error;

use crate::netcore::NetcoreError;

/// Result type for gateway operations
pub type HiveResult<T> = Result<T, HiveError>;

/// Errors that can occur in the gateway core
#[derive(Debug, Error)]
pub enum HiveError {
    /// Id/name/address resolution failure
    #[error("not found: {0}")]
    NotFound(String),

    /// Registering an entity whose identity or network key already exists
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// Adding a netcore under a name already present in the pool
    #[error("conflict: {0}")]
    Conflict(String),

    /// A single-target netcore/device call reported an error
    #[error("netcore '{netcore}' failed: {source}")]
    Backend {
        /// Name of the netcore that failed
        netcore: String,
        #[source]
        source: NetcoreError,
    },

    /// One or more netcores failed during a multi-netcore fan-out
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// Persisted store reported an error
    #[error("store error: {0}")]
    Store(String),

    /// Persisted document could not be turned back into an entity
    #[error("bad record: {0}")]
    BadRecord(String),
}

/// A single netcore's failure inside an aggregate operation
#[derive(Debug)]
pub struct NetcoreFault {
    /// Name of the failing netcore
    pub netcore: String,
    /// What the driver reported
    pub error: NetcoreError,
}

/// Composite failure of a multi-netcore fan-out.
///
/// Carries the full per-netcore breakdown: partial success is a legitimate
/// terminal state and the caller is always told which netcores succeeded
/// and which failed. Nothing is rolled back.
#[derive(Debug, Error)]
pub struct AggregateError {
    /// Which operation was fanned out
    pub operation: &'static str,
    /// Netcores that completed successfully
    pub succeeded: Vec<String>,
    /// Netcores that failed, with their driver errors
    pub failed: Vec<NetcoreFault>,
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed on {} of {} netcore(s)",
            self.operation,
            self.failed.len(),
            self.failed.len() + self.succeeded.len()
        )?;
        for fault in &self.failed {
            write!(f, "; {}: {}", fault.netcore, fault.error)?;
        }
        if !self.succeeded.is_empty() {
            write!(f, "; succeeded: {}", self.succeeded.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_display_names_both_sides() {
        let err = AggregateError {
            operation: "start",
            succeeded: vec!["zb0".to_string()],
            failed: vec![NetcoreFault {
                netcore: "ble0".to_string(),
                error: NetcoreError::Timeout,
            }],
        };

        let text = err.to_string();
        assert!(text.contains("start failed on 1 of 2"));
        assert!(text.contains("ble0"));
        assert!(text.contains("succeeded: zb0"));
    }

    #[test]
    fn backend_error_preserves_netcore_name() {
        let err = HiveError::Backend {
            netcore: "zb0".to_string(),
            source: NetcoreError::Unreachable("00:11".to_string()),
        };
        assert!(err.to_string().contains("zb0"));
        assert!(err.to_string().contains("00:11"));
    }
}
