/// Errors raised by an [`AlertStore`](crate::AlertStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying database call failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An alert with the same id is already stored.
    #[error("Alert {0} already exists")]
    Duplicate(String),

    /// A stored row could not be mapped back to an alert.
    #[error("Corrupt alert row: {0}")]
    Corrupt(String),
}
