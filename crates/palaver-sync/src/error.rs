use thiserror::Error;

use palaver_store::StoreError;

/// Errors surfaced by the synchronizer.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The merge's persist failed; the message was not added to the
    /// visible list.
    #[error("Failed to persist message: {0}")]
    Persist(#[from] StoreError),

    /// The synchronizer task is gone.
    #[error("Synchronizer has shut down")]
    Shutdown,
}
