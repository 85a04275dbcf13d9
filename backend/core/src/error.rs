use thiserror::Error;

/// Top-level error type for the Metronome runtime.
#[derive(Debug, Error)]
pub enum MetronomeError {
    #[error("invalid task '{name}': {reason}")]
    InvalidTask { name: String, reason: String },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("installation error: {0}")]
    InstallationError(String),

    #[error("service error ({service}): {message}")]
    ServiceError { service: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MetronomeError {
    /// Process exit code the host reports when this error terminates it.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigError(_) => 3,
            Self::InstallationError(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(MetronomeError::ConfigError("bad".into()).exit_code(), 3);
        assert_eq!(MetronomeError::InstallationError("perm".into()).exit_code(), 2);
        assert_eq!(
            MetronomeError::Other(anyhow::anyhow!("boom")).exit_code(),
            1
        );
    }

    #[test]
    fn invalid_task_message_names_the_task() {
        let err = MetronomeError::InvalidTask {
            name: "ping".into(),
            reason: "interval must be positive".into(),
        };
        assert_eq!(err.to_string(), "invalid task 'ping': interval must be positive");
    }
}
