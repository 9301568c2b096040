use std::path::PathBuf;

use thiserror::Error;

/// The event store could not be opened, or a read/write transaction failed.
#[derive(Debug, Error)]
pub enum StorageFault {
    #[error("failed to open event store at {path}: {source:#}")]
    Open {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("event store transaction failed: {0:#}")]
    Transaction(#[source] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageFault>;
