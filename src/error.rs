//! Crate-wide error type for the recommendation and analytics core.

use thiserror::Error;

/// The five error kinds the orchestrator and analytics engine distinguish.
///
/// `InvalidRequest` and `Fatal` are terminal for the operation that raised them;
/// `ModelNotReady`, `ComponentFailure` and `Transient` are recoverable and the
/// caller is expected to degrade gracefully rather than propagate a failure to
/// the end user.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("model not ready: {0}")]
    ModelNotReady(String),

    #[error("component '{component}' failed: {source}")]
    ComponentFailure {
        component: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("fatal: corrupt model snapshot: {0}")]
    Fatal(String),
}

impl EngineError {
    pub fn component(component: &'static str, source: impl Into<anyhow::Error>) -> Self {
        EngineError::ComponentFailure {
            component,
            source: source.into(),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Fatal(format!("snapshot (de)serialization failed: {err}"))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Transient(format!("snapshot I/O failed: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_wraps_anyhow() {
        let err = EngineError::component("cf", anyhow::anyhow!("boom"));
        assert!(matches!(err, EngineError::ComponentFailure { component: "cf", .. }));
        assert!(err.to_string().contains("boom"));
    }
}
