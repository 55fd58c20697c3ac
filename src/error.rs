//! Unified application error model.
//! Shaping and caching recover from their own failures; the variants here are what
//! reaches a caller, chiefly failures of the query-execution service.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    Upstream { code: String, message: String },
    Decode { code: String, message: String },
    Io { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::Upstream { code, .. }
            | AppError::Decode { code, .. }
            | AppError::Io { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::Upstream { message, .. }
            | AppError::Decode { message, .. }
            | AppError::Io { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn upstream<S: Into<String>>(code: S, msg: S) -> Self { AppError::Upstream { code: code.into(), message: msg.into() } }
    pub fn decode<S: Into<String>>(code: S, msg: S) -> Self { AppError::Decode { code: code.into(), message: msg.into() } }
    pub fn io<S: Into<String>>(code: S, msg: S) -> Self { AppError::Io { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// True for failures raised by the query-execution service (transport or query error).
    pub fn is_upstream(&self) -> bool {
        matches!(self, AppError::Upstream { .. } | AppError::Decode { .. })
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Default mapping: treat as Internal unless mapped explicitly at the call site
        AppError::Internal { code: "internal_error".into(), message: format!("{:#}", err) }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::decode("decode_error".to_string(), err.to_string())
        } else {
            AppError::upstream("transport_error".to_string(), err.to_string())
        }
    }
}

/// Failures of the durable cache tier. These never leave the cache module.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage quota exceeded: need {needed} bytes, quota {quota} bytes")]
    QuotaExceeded { needed: u64, quota: u64 },
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encode: {0}")]
    Encode(String),
}

impl StorageError {
    pub fn is_quota(&self) -> bool { matches!(self, StorageError::QuotaExceeded { .. }) }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self { StorageError::Encode(err.to_string()) }
}
