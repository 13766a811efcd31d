use gridpool_store::StoreError;
use thiserror::Error;

/// Claim outcomes. `AlreadyReserved` and `BoardLocked` are expected
/// results of racing for a square, surfaced to the user as a message;
/// only `Store` is a transport fault.
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("that square is already reserved")]
    AlreadyReserved,
    #[error("the board is locked; no new squares can be reserved")]
    BoardLocked,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Release outcomes. `NotReserved` and `NotOwner` are expected,
/// user-facing results, not faults.
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("this square is not currently reserved")]
    NotReserved,
    #[error("only the original reserver can cancel this square")]
    NotOwner,
    #[error(transparent)]
    Store(#[from] StoreError),
}
