//! Error types for the execution-state ledger and its data sources.

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The id was never taken, or was already consumed by a revert, commit or discard.
    #[error("Snapshot {id} is not on the snapshot stack")]
    SnapshotNotFound { id: u64 },

    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),
}

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("{0}")]
    Rpc(#[from] RpcError),

    #[error("{0}")]
    Custom(String),
}

/// Structured RPC error types for programmatic handling.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Connection to {url} failed: {cause}")]
    ConnectionFailed { url: String, cause: String },

    #[error("{method} timed out after {elapsed_ms}ms")]
    Timeout { method: String, elapsed_ms: u64 },

    #[error("{method} HTTP {status}: {body}")]
    HttpError {
        method: String,
        status: u16,
        body: String,
    },

    #[error("{method} JSON-RPC error {code}: {message}")]
    JsonRpcError {
        method: String,
        code: i64,
        message: String,
    },

    #[error("{method} response parse error in {field}: {cause}")]
    ParseError {
        method: String,
        field: String,
        cause: String,
    },

    #[error("{method} failed after {attempts} attempt(s): {last_error}")]
    RetryExhausted {
        method: String,
        attempts: u32,
        last_error: Box<RpcError>,
    },
}

impl RpcError {
    /// Whether this error is likely transient and retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::ConnectionFailed { .. } => true,
            RpcError::Timeout { .. } => true,
            RpcError::HttpError { status, .. } => {
                // 429 = rate limited, 502/503/504 = server issues
                matches!(*status, 429 | 502 | 503 | 504)
            }
            RpcError::JsonRpcError { .. } => false,
            RpcError::ParseError { .. } => false,
            RpcError::RetryExhausted { .. } => false,
        }
    }

    /// For HTTP 429, extract the Retry-After hint captured in the body field.
    pub fn retry_after_secs(&self) -> Option<u64> {
        if let RpcError::HttpError {
            status: 429, body, ..
        } = self
        {
            body.strip_prefix("retry-after:")
                .and_then(|s| s.trim().parse().ok())
        } else {
            None
        }
    }

    pub(crate) fn parse(method: &str, field: &str, cause: impl ToString) -> Self {
        RpcError::ParseError {
            method: method.into(),
            field: field.into(),
            cause: cause.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        let rate_limited = RpcError::HttpError {
            method: "eth_getBalance".into(),
            status: 429,
            body: "retry-after: 7".into(),
        };
        assert!(rate_limited.is_retryable());
        assert_eq!(rate_limited.retry_after_secs(), Some(7));

        let bad_request = RpcError::HttpError {
            method: "eth_getBalance".into(),
            status: 400,
            body: String::new(),
        };
        assert!(!bad_request.is_retryable());
        assert_eq!(bad_request.retry_after_secs(), None);

        let rpc = RpcError::JsonRpcError {
            method: "eth_getCode".into(),
            code: -32000,
            message: "header not found".into(),
        };
        assert!(!rpc.is_retryable());
    }

    #[test]
    fn snapshot_error_names_the_id() {
        let err = LedgerError::SnapshotNotFound { id: 9 };
        assert_eq!(err.to_string(), "Snapshot 9 is not on the snapshot stack");
    }
}
