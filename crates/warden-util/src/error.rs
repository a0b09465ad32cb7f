//! Error types for warden

use thiserror::Error;

use crate::MachineId;

/// Core error type for warden operations
#[derive(Debug, Error)]
pub enum WardenError {
    #[error("Fleet enumeration failed: {0}")]
    Enumeration(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Machine not found: {0}")]
    MachineNotFound(MachineId),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cloud error: {0}")]
    CloudError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WardenError {
    pub fn enumeration(msg: impl Into<String>) -> Self {
        Self::Enumeration(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn cloud(msg: impl Into<String>) -> Self {
        Self::CloudError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, WardenError>;
