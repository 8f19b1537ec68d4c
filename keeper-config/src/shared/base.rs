use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The upkeep sync queue must allow at least one concurrent fetch.
    #[error("`sync_upkeep_queue_size` cannot be zero")]
    SyncUpkeepQueueSizeZero,
    /// A zero interval would spin the synchronizer loop.
    #[error("`sync_interval_ms` cannot be zero")]
    SyncIntervalZero,
    /// An address field is not a 20 byte `0x` prefixed hex string.
    #[error("`{field}` is not a valid address: {value}")]
    InvalidAddress { field: &'static str, value: String },
    /// TLS is enabled but no trusted root certificates are provided.
    #[error("Invalid TLS config: `trusted_root_certs` must be set when `enabled` is true")]
    MissingTrustedRootCerts,
}
