use std::{io, path::PathBuf};
use thiserror::Error;

/// Failures that end a streaming session.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("request to {url} failed: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} did not declare a content length")]
    UnknownLength { url: String },

    #[error("cannot create {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("error closing video stream: {0:?}")]
    Close(Vec<io::Error>),
}

/// Read/write failures while sampling or copying.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("stream ended after {received} of {expected} bytes")]
    Truncated { received: u64, expected: u64 },
}

pub type Result<T, E = StreamError> = std::result::Result<T, E>;
