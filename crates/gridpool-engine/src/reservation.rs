use serde_json::Value;
use tracing::{debug, info};

use gridpool_store::{DocPath, DocumentStore, StoreError, TxnSnapshot, TxnVerdict};
use gridpool_types::{Board, BoardId, CellKey, Identity, Reservation, UserId};

use crate::error::{ClaimError, ReleaseError};
use crate::label::derive_label;

const GRIDS_COLLECTION: &str = "grids";
const SHORT_CODES_COLLECTION: &str = "shortCodes";
const USERS_COLLECTION: &str = "users";

/// Claim/release protocol for one board, executed as whole-document
/// conditional writes against the store.
///
/// The transaction functions handed to the store are pure over their
/// snapshot: when two clients race for the same square the store re-runs
/// the loser against the winner's committed state, where it observes the
/// existing reservation and aborts instead of overwriting it.
pub struct ReservationEngine<S> {
    store: S,
    board_id: BoardId,
}

enum ClaimAbort {
    AlreadyReserved,
    Locked,
    Corrupt(serde_json::Error),
}

enum ReleaseAbort {
    NotReserved,
    NotOwner,
    Corrupt(serde_json::Error),
}

fn decode_board(snap: &TxnSnapshot) -> Result<Board, serde_json::Error> {
    match &snap.doc {
        // A board that was never written yet is just an empty board.
        None => Ok(Board::default()),
        Some(value) => serde_json::from_value(value.clone()),
    }
}

impl<S: DocumentStore> ReservationEngine<S> {
    pub fn new(store: S, board_id: BoardId) -> Self {
        Self { store, board_id }
    }

    pub fn board_id(&self) -> &BoardId {
        &self.board_id
    }

    fn doc_path(&self) -> DocPath {
        DocPath::new(GRIDS_COLLECTION, self.board_id.as_str())
    }

    /// Plain read of the current board state. `Ok(None)` when the document
    /// does not exist yet.
    pub async fn load(&self) -> Result<Option<Board>, StoreError> {
        match self.store.get(&self.doc_path()).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Reserve a square for `identity`. At most one claim per cell ever
    /// succeeds; everyone else gets `AlreadyReserved`. Returns the
    /// committed reservation so callers can patch their local cache
    /// without re-fetching the board.
    pub async fn claim(
        &self,
        cell: CellKey,
        identity: &Identity,
    ) -> Result<Reservation, ClaimError> {
        let label = derive_label(identity);
        let mut committed: Option<Reservation> = None;

        let outcome = self
            .store
            .run_atomic(&self.doc_path(), |snap: TxnSnapshot| {
                let mut board = match decode_board(&snap) {
                    Ok(board) => board,
                    Err(err) => return TxnVerdict::Abort(ClaimAbort::Corrupt(err)),
                };
                if board.locked {
                    return TxnVerdict::Abort(ClaimAbort::Locked);
                }
                if board.is_reserved(cell) {
                    return TxnVerdict::Abort(ClaimAbort::AlreadyReserved);
                }
                let reservation = Reservation {
                    user_id: identity.uid.clone(),
                    email: identity.email.clone(),
                    label: label.clone(),
                    reserved_at: snap.server_time,
                };
                board.reservations.insert(cell, reservation.clone());
                board.updated_at = Some(snap.server_time);
                committed = Some(reservation);
                match serde_json::to_value(&board) {
                    Ok(doc) => TxnVerdict::Commit(doc),
                    Err(err) => TxnVerdict::Abort(ClaimAbort::Corrupt(err)),
                }
            })
            .await?;

        match outcome {
            None => {
                info!(board = %self.board_id, cell = %cell, user = %identity.uid, "square reserved");
                committed.take().ok_or_else(|| {
                    ClaimError::Store(StoreError::Backend(
                        "commit reported without a reservation".into(),
                    ))
                })
            }
            Some(ClaimAbort::AlreadyReserved) => {
                debug!(board = %self.board_id, cell = %cell, "claim lost: square already reserved");
                Err(ClaimError::AlreadyReserved)
            }
            Some(ClaimAbort::Locked) => {
                debug!(board = %self.board_id, cell = %cell, "claim refused: board locked");
                Err(ClaimError::BoardLocked)
            }
            Some(ClaimAbort::Corrupt(err)) => {
                Err(ClaimError::Store(StoreError::Serialization(err)))
            }
        }
    }

    /// Cancel a reservation. Only the owner may release; nobody else's
    /// squares are touched.
    pub async fn release(&self, cell: CellKey, user: &UserId) -> Result<(), ReleaseError> {
        let outcome = self
            .store
            .run_atomic(&self.doc_path(), |snap: TxnSnapshot| {
                let mut board = match decode_board(&snap) {
                    Ok(board) => board,
                    Err(err) => return TxnVerdict::Abort(ReleaseAbort::Corrupt(err)),
                };
                match board.reservations.get(&cell) {
                    None => return TxnVerdict::Abort(ReleaseAbort::NotReserved),
                    Some(existing) if existing.user_id != *user => {
                        return TxnVerdict::Abort(ReleaseAbort::NotOwner);
                    }
                    Some(_) => {}
                }
                board.reservations.remove(&cell);
                board.updated_at = Some(snap.server_time);
                match serde_json::to_value(&board) {
                    Ok(doc) => TxnVerdict::Commit(doc),
                    Err(err) => TxnVerdict::Abort(ReleaseAbort::Corrupt(err)),
                }
            })
            .await?;

        match outcome {
            None => {
                info!(board = %self.board_id, cell = %cell, user = %user, "reservation released");
                Ok(())
            }
            Some(ReleaseAbort::NotReserved) => {
                debug!(board = %self.board_id, cell = %cell, "release refused: nothing reserved");
                Err(ReleaseError::NotReserved)
            }
            Some(ReleaseAbort::NotOwner) => {
                debug!(board = %self.board_id, cell = %cell, "release refused: caller is not the owner");
                Err(ReleaseError::NotOwner)
            }
            Some(ReleaseAbort::Corrupt(err)) => {
                Err(ReleaseError::Store(StoreError::Serialization(err)))
            }
        }
    }
}

/// Look up a share code and return the board it points at. Codes are
/// stored lowercased; unknown codes are `Ok(None)`, not an error.
pub async fn resolve_short_code<S: DocumentStore>(
    store: &S,
    code: &str,
) -> Result<Option<BoardId>, StoreError> {
    let code = code.trim().to_lowercase();
    if code.is_empty() {
        return Ok(None);
    }
    let path = DocPath::new(SHORT_CODES_COLLECTION, &code);
    match store.get(&path).await? {
        Some(doc) => Ok(doc
            .get("boardId")
            .and_then(Value::as_str)
            .map(BoardId::from)),
        None => Ok(None),
    }
}

/// Remember that a user opened a board, set-union style: the board id is
/// added to their `accessedBoards` list once, creating the user document
/// if needed. Idempotent.
pub async fn track_access<S: DocumentStore>(
    store: &S,
    user: &UserId,
    board: &BoardId,
) -> Result<(), StoreError> {
    let path = DocPath::new(USERS_COLLECTION, user.as_str());
    let _already_tracked = store
        .run_atomic::<(), _>(&path, |snap| {
            let mut doc = snap
                .doc
                .filter(Value::is_object)
                .unwrap_or_else(|| Value::Object(Default::default()));
            let Some(obj) = doc.as_object_mut() else {
                return TxnVerdict::Abort(());
            };
            let boards = obj
                .entry("accessedBoards")
                .or_insert_with(|| Value::Array(Vec::new()));
            if !boards.is_array() {
                *boards = Value::Array(Vec::new());
            }
            if let Value::Array(items) = boards {
                if items.iter().any(|v| v.as_str() == Some(board.as_str())) {
                    return TxnVerdict::Abort(());
                }
                items.push(Value::String(board.as_str().to_string()));
            }
            TxnVerdict::Commit(doc)
        })
        .await?;
    Ok(())
}
