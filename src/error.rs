use thiserror::Error;

/// Recoverable, user-visible conditions. Every variant's message is shown
/// to the player verbatim; none of them change any state.
#[derive(Debug, Error)]
pub enum CasinoError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("cell {0} is not on the board")]
    InvalidCell(u8),
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("no active game")]
    NoActiveSession,
    #[error("you already have a game running")]
    SessionAlreadyActive,
    #[error("that cell is already open")]
    CellAlreadyOpen,
    #[error("this game is not yours")]
    NotSessionOwner,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persistence failures are fatal to the triggering operation: the
/// mutation is dropped rather than kept unpersisted.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("database is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
