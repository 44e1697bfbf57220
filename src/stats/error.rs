/// Errors while decoding the raw statistics stream. All of them end the session.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed stats record: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("stats record exceeds {limit} bytes")]
    RecordTooLarge { limit: usize },
    #[error("stats stream ended inside a record ({pending} bytes pending)")]
    Truncated { pending: usize },
    #[error("failed to read stats stream: {0}")]
    Io(#[from] std::io::Error),
}

/// A raw sample that cannot be turned into a metric. Only the affected sample is skipped.
#[derive(Debug, thiserror::Error)]
pub enum DeriveError {
    #[error("invalid metric input: memory limit is zero")]
    ZeroMemoryLimit,
}
