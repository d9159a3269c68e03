use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Contended: key '{key}' still locked after {attempts} attempts")]
    Contended { key: String, attempts: u32 },

    #[error("Loader failure: {message}")]
    Loader { message: String },

    #[error("Rebuild scheduler unavailable: {message}")]
    SchedulerUnavailable { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn contended(key: impl Into<String>, attempts: u32) -> Self {
        Self::Contended {
            key: key.into(),
            attempts,
        }
    }

    pub fn loader(message: impl Into<String>) -> Self {
        Self::Loader {
            message: message.into(),
        }
    }

    pub fn scheduler_unavailable(message: impl Into<String>) -> Self {
        Self::SchedulerUnavailable {
            message: message.into(),
        }
    }

    /// True for errors caused by unreachable infrastructure rather than bad data
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. } | Self::Contended { .. } | Self::SchedulerUnavailable { .. }
        )
    }
}
