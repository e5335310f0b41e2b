use thiserror::Error;

/// Failures raised by the infrastructure adapters: filesystem and local
/// store, Postgres, telemetry installation, and configuration.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database failure: {message}")]
    Database { message: String },
    #[error("could not serialize local document `{namespace}`: {message}")]
    Serialization { namespace: String, message: String },
    #[error("telemetry setup failed: {0}")]
    Telemetry(String),
    #[error("invalid configuration: {message}")]
    Configuration { message: String },
}

impl InfraError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn serialization(namespace: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialization {
            namespace: namespace.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
