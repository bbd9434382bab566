use thiserror::Error;

/// Errors that abort a whole dispatch run.
///
/// Per-message delivery failures are not here: they are counted in
/// [`crate::DispatchSummary::failed`] and the run carries on.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("push credential error: {0}")]
    Credential(#[from] dday_push::CredentialError),

    #[error("push provider error: {0}")]
    Push(#[from] dday_push::PushError),

    #[error("database error: {0}")]
    Db(#[from] dday_db::DbError),
}
