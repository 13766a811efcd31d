use std::collections::BTreeMap;

use gridpool_types::{Board, CellKey, Reservation, UserId};

use crate::winners::{WinnerMap, winners_for_board};

/// Client-side view of one board between document reads.
///
/// Owns the state a renderer needs (cached reservation map, lock flag,
/// current winner highlights) so nothing lives in globals and the logic
/// is testable without any UI attached.
#[derive(Debug, Default)]
pub struct BoardSession {
    reservations: BTreeMap<CellKey, Reservation>,
    winners: WinnerMap,
    locked: bool,
}

impl BoardSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached view wholesale from a fresh document read.
    /// Winners are always recomputed in full; a changed score can move a
    /// highlight anywhere, so merging would leave stale cells behind.
    pub fn sync(&mut self, board: &Board) {
        self.reservations = board.reservations.clone();
        self.locked = board.locked;
        self.winners = winners_for_board(board);
    }

    /// Record a claim this client just committed, without re-fetching.
    pub fn apply_claim(&mut self, cell: CellKey, reservation: Reservation) {
        self.reservations.insert(cell, reservation);
    }

    /// Record a release this client just committed.
    pub fn apply_release(&mut self, cell: CellKey) {
        self.reservations.remove(&cell);
    }

    pub fn reservation(&self, cell: CellKey) -> Option<&Reservation> {
        self.reservations.get(&cell)
    }

    /// Whether the cell can currently be claimed from this view.
    pub fn is_claimable(&self, cell: CellKey) -> bool {
        !self.locked && !self.reservations.contains_key(&cell)
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn winners(&self) -> &WinnerMap {
        &self.winners
    }

    /// The "Squares for XXXX: n" counter.
    pub fn count_for(&self, user: &UserId) -> usize {
        self.reservations
            .values()
            .filter(|r| r.user_id == *user)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gridpool_types::Quarter;
    use serde_json::json;

    fn reservation(uid: &str) -> Reservation {
        Reservation {
            user_id: UserId::from(uid),
            email: None,
            label: "TESTUSER".into(),
            reserved_at: Utc::now(),
        }
    }

    fn cell(row: u8, col: u8) -> CellKey {
        CellKey::new(row, col).unwrap()
    }

    fn board() -> Board {
        serde_json::from_value(json!({
            "topRow": [7, 2, 9, 0, 4, 6, 1, 3, 8, 5],
            "firstColumn": [1, 0, 8, 3, 5, 9, 2, 7, 4, 6],
            "scoreQ1": "14-7",
            "reservations": {
                "1-1": {
                    "userId": "uid-1",
                    "label": "AAAABBBB",
                    "reservedAt": "2026-02-01T18:00:00Z"
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_sync_replaces_view() {
        let mut session = BoardSession::new();
        session.apply_claim(cell(9, 9), reservation("uid-9"));

        session.sync(&board());
        assert!(session.reservation(cell(9, 9)).is_none());
        assert!(session.reservation(cell(1, 1)).is_some());
        assert_eq!(session.winners()[&cell(8, 5)], vec![Quarter::Q1]);
    }

    #[test]
    fn test_local_patches_without_refetch() {
        let mut session = BoardSession::new();
        session.sync(&board());

        session.apply_claim(cell(2, 3), reservation("uid-2"));
        assert!(!session.is_claimable(cell(2, 3)));
        assert_eq!(session.count_for(&UserId::from("uid-2")), 1);

        session.apply_release(cell(2, 3));
        assert!(session.is_claimable(cell(2, 3)));
        assert_eq!(session.count_for(&UserId::from("uid-2")), 0);
    }

    #[test]
    fn test_locked_board_is_not_claimable() {
        let mut session = BoardSession::new();
        let mut locked_board = board();
        locked_board.locked = true;
        session.sync(&locked_board);
        assert!(session.locked());
        assert!(!session.is_claimable(cell(2, 3)));
        // Existing reservations stay visible.
        assert!(session.reservation(cell(1, 1)).is_some());
    }

    #[test]
    fn test_score_change_fully_replaces_winners() {
        let mut session = BoardSession::new();
        session.sync(&board());
        assert!(session.winners().contains_key(&cell(8, 5)));

        let mut updated = board();
        updated.score_q1 = Some("20-3".into());
        session.sync(&updated);
        assert!(!session.winners().contains_key(&cell(8, 5)));
        assert_eq!(session.winners().len(), 1);
    }
}
