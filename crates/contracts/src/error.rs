//! Layered error definitions
//!
//! Categorized by source: config / push / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// No tokio runtime available to drive flush timers
    #[error("batch dispatcher must be created inside a tokio runtime")]
    NoRuntime,

    // ===== Push Errors =====
    /// Routing key would corrupt the line-delimited framing
    #[error("{key}: invalid index name")]
    InvalidRoutingKey { key: String },

    /// Record could not be encoded as JSON
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Dispatcher has been shut down
    #[error("batch dispatcher is closed")]
    Closed,

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid routing key error
    pub fn invalid_routing_key(key: impl Into<String>) -> Self {
        Self::InvalidRoutingKey { key: key.into() }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Short reason label, used as a metrics dimension
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ConfigParse { .. } => "config_parse",
            Self::ConfigValidation { .. } => "config_validation",
            Self::NoRuntime => "no_runtime",
            Self::InvalidRoutingKey { .. } => "invalid_routing_key",
            Self::Serialization(_) => "serialization",
            Self::Closed => "closed",
            Self::SinkWrite { .. } => "sink_write",
            Self::Io(_) => "io",
        }
    }
}
