// Error Types
//
// One error enum per domain. Nothing here is fatal on its own; callers
// turn every variant into a module log line and return to idle.
//

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Harvest configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Wallet store errors. A wrong password is not one of these.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("no wallet found in {0}")]
    NotFound(PathBuf),

    #[error("wallet is locked")]
    Locked,

    #[error("wallet file is corrupt: {0}")]
    Corrupt(String),

    #[error("wallet I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("wallet JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transaction signing failed: {0}")]
    Signing(String),
}

/// Solana JSON-RPC errors
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("RPC request failed: {0}")]
    Client(Box<solana_client::client_error::ClientError>),

    #[error("invalid address {0}")]
    InvalidAddress(String),

    #[error("unexpected RPC response: {0}")]
    InvalidResponse(String),
}

/// Exchange aggregator errors
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("price not available for {0}")]
    PriceUnavailable(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Mining pool statistics errors
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("pool request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected pool response: {0}")]
    InvalidResponse(String),
}

/// Miner supervision errors. Each aborts only the start attempt.
#[derive(Debug, Error)]
pub enum MinerError {
    #[error("cannot enter miner directory {path}: {reason}")]
    Directory { path: PathBuf, reason: String },

    #[error("failed to start miner {exe}: {source}")]
    Spawn {
        exe: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open {0} pipe")]
    Stream(&'static str),
}

impl From<solana_client::client_error::ClientError> for ChainError {
    fn from(e: solana_client::client_error::ClientError) -> Self {
        ChainError::Client(Box::new(e))
    }
}
