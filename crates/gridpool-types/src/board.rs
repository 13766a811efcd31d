use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cell::CellKey;
use crate::identity::UserId;
use crate::permutation::AxisDigits;
use crate::quarter::Quarter;

/// One reserved square. Created only by a successful claim transaction,
/// never updated in place, removed only by its own `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// 8-character display label, split 4+4 by renderers.
    pub label: String,
    /// Store-assigned commit timestamp.
    pub reserved_at: DateTime<Utc>,
}

/// The whole shared board document.
///
/// Decoding is deliberately forgiving about the fields other writers own:
/// a malformed axis array reads as unassigned, a junk reservation entry or
/// key is skipped, and unknown fields are ignored. Scores are freeform
/// text and stay that way until the winner resolver looks at them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Board {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_a: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_b: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(deserialize_with = "lenient_axis", skip_serializing_if = "Option::is_none")]
    pub top_row: Option<AxisDigits>,
    #[serde(deserialize_with = "lenient_axis", skip_serializing_if = "Option::is_none")]
    pub first_column: Option<AxisDigits>,
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_q1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_q2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_q3: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_final: Option<String>,
    #[serde(deserialize_with = "lenient_reservations")]
    pub reservations: BTreeMap<CellKey, Reservation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Board {
    pub fn score(&self, quarter: Quarter) -> Option<&str> {
        let raw = match quarter {
            Quarter::Q1 => &self.score_q1,
            Quarter::Q2 => &self.score_q2,
            Quarter::Q3 => &self.score_q3,
            Quarter::Final => &self.score_final,
        };
        raw.as_deref().filter(|s| !s.is_empty())
    }

    pub fn is_reserved(&self, cell: CellKey) -> bool {
        self.reservations.contains_key(&cell)
    }

    pub fn reservation_count_for(&self, user: &UserId) -> usize {
        self.reservations
            .values()
            .filter(|r| r.user_id == *user)
            .count()
    }
}

fn lenient_axis<'de, D>(deserializer: D) -> Result<Option<AxisDigits>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(AxisDigits::from_json))
}

fn lenient_reservations<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<CellKey, Reservation>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let mut map = BTreeMap::new();
    let Some(Value::Object(entries)) = raw else {
        return Ok(map);
    };
    for (key, value) in entries {
        let Ok(cell) = key.parse::<CellKey>() else {
            debug!(key = %key, "skipping reservation with malformed cell key");
            continue;
        };
        match serde_json::from_value::<Reservation>(value) {
            Ok(reservation) => {
                map.insert(cell, reservation);
            }
            Err(err) => debug!(key = %key, %err, "skipping malformed reservation entry"),
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_doc() -> Value {
        json!({
            "teamA": "Chiefs",
            "teamB": "Eagles",
            "label": "Big Game 2026",
            "topRow": [7, 2, 9, 0, 4, 6, 1, 3, 8, 5],
            "firstColumn": [1, 0, 8, 3, 5, 9, 2, 7, 4, 6],
            "locked": false,
            "scoreQ1": "14-7",
            "reservations": {
                "3-4": {
                    "userId": "uid-1",
                    "email": "a@example.com",
                    "label": "JOHNSMIT",
                    "reservedAt": "2026-02-01T18:00:00Z"
                }
            },
            "updatedAt": "2026-02-01T18:00:00Z"
        })
    }

    #[test]
    fn test_decodes_document_shape() {
        let board: Board = serde_json::from_value(sample_doc()).unwrap();
        assert_eq!(board.team_a.as_deref(), Some("Chiefs"));
        assert_eq!(board.score(Quarter::Q1), Some("14-7"));
        assert_eq!(board.score(Quarter::Final), None);
        let cell = CellKey::new(3, 4).unwrap();
        assert!(board.is_reserved(cell));
        assert_eq!(board.reservations[&cell].label, "JOHNSMIT");
        assert!(board.top_row.is_some());
    }

    #[test]
    fn test_reservation_keys_round_trip() {
        let board: Board = serde_json::from_value(sample_doc()).unwrap();
        let doc = serde_json::to_value(&board).unwrap();
        assert!(doc["reservations"].get("3-4").is_some());
        let back: Board = serde_json::from_value(doc).unwrap();
        assert_eq!(back.reservations, board.reservations);
    }

    #[test]
    fn test_malformed_axis_reads_as_unassigned() {
        let mut doc = sample_doc();
        doc["topRow"] = json!([1, 2, 3]);
        doc["firstColumn"] = json!("not an array");
        let board: Board = serde_json::from_value(doc).unwrap();
        assert!(board.top_row.is_none());
        assert!(board.first_column.is_none());
    }

    #[test]
    fn test_bad_reservation_entries_are_skipped() {
        let mut doc = sample_doc();
        doc["reservations"]["0-4"] = json!({
            "userId": "uid-2",
            "label": "AAAABBBB",
            "reservedAt": "2026-02-01T18:00:00Z"
        });
        doc["reservations"]["5-5"] = json!("junk");
        let board: Board = serde_json::from_value(doc).unwrap();
        assert_eq!(board.reservations.len(), 1);
    }

    #[test]
    fn test_non_object_reservations_reset_to_empty() {
        let mut doc = sample_doc();
        doc["reservations"] = json!([1, 2, 3]);
        let board: Board = serde_json::from_value(doc).unwrap();
        assert!(board.reservations.is_empty());
    }

    #[test]
    fn test_empty_document_is_empty_board() {
        let board: Board = serde_json::from_value(json!({})).unwrap();
        assert!(!board.locked);
        assert!(board.reservations.is_empty());
        assert!(board.score(Quarter::Q1).is_none());
    }

    #[test]
    fn test_empty_score_string_counts_as_absent() {
        let mut doc = sample_doc();
        doc["scoreQ2"] = json!("");
        let board: Board = serde_json::from_value(doc).unwrap();
        assert_eq!(board.score(Quarter::Q2), None);
    }

    #[test]
    fn test_count_for_user() {
        let mut board: Board = serde_json::from_value(sample_doc()).unwrap();
        let other = Reservation {
            user_id: UserId::from("uid-2"),
            email: None,
            label: "AAAAXXXX".into(),
            reserved_at: Utc::now(),
        };
        board
            .reservations
            .insert(CellKey::new(9, 9).unwrap(), other);
        assert_eq!(board.reservation_count_for(&UserId::from("uid-1")), 1);
        assert_eq!(board.reservation_count_for(&UserId::from("uid-2")), 1);
        assert_eq!(board.reservation_count_for(&UserId::from("uid-3")), 0);
    }
}
