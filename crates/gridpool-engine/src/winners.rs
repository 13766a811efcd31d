use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use gridpool_types::{AxisDigits, Board, CellKey, Quarter};

/// Winning cells, each with its quarter tags in fixed priority order
/// Q1, Q2, Q3, F. Rendering assigns stripe position by list order.
pub type WinnerMap = BTreeMap<CellKey, Vec<Quarter>>;

/// The four freeform score strings, by quarter.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuarterScores<'a> {
    pub q1: Option<&'a str>,
    pub q2: Option<&'a str>,
    pub q3: Option<&'a str>,
    pub final_score: Option<&'a str>,
}

impl<'a> QuarterScores<'a> {
    pub fn of_board(board: &'a Board) -> Self {
        Self {
            q1: board.score(Quarter::Q1),
            q2: board.score(Quarter::Q2),
            q3: board.score(Quarter::Q3),
            final_score: board.score(Quarter::Final),
        }
    }

    fn get(self, quarter: Quarter) -> Option<&'a str> {
        match quarter {
            Quarter::Q1 => self.q1,
            Quarter::Q2 => self.q2,
            Quarter::Q3 => self.q3,
            Quarter::Final => self.final_score,
        }
    }
}

// Two-stage fallback, kept exactly as the scores have always been parsed:
// first a digit-run pair around a non-digit separator, then the last two
// individual digits. The stages can disagree on ambiguous strings like
// "10-21" vs "1021"; that precedence is intentional.
fn run_pair_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\D+(\d+)").expect("literal pattern"))
}

fn last_digits_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d)[^\d]*(\d)$").expect("literal pattern"))
}

/// Reduce a freeform score string to the two trailing digits
/// (team A, team B). `None` means the string is not scorable yet;
/// scores arrive in inconsistent free text, so that is a silent skip.
pub fn parse_score(raw: &str) -> Option<(u8, u8)> {
    let caps = run_pair_pattern()
        .captures(raw)
        .or_else(|| last_digits_pattern().captures(raw))?;
    Some((trailing_digit(&caps[1])?, trailing_digit(&caps[2])?))
}

// A capture is a run of ASCII digits, so its value mod 10 is its last
// character; no numeric parse that an absurd run could overflow.
fn trailing_digit(run: &str) -> Option<u8> {
    run.chars().next_back()?.to_digit(10).map(|d| d as u8)
}

/// Map every present score through the axis permutations to its winning
/// cell. Pure and idempotent: callers recompute the whole map whenever
/// any score or axis changes, never patch it incrementally.
///
/// Missing axes, unparseable scores, and unfound digits all contribute
/// nothing; progressively entered data is expected, not an error.
pub fn resolve_winners(
    top_row: Option<&AxisDigits>,
    first_column: Option<&AxisDigits>,
    scores: QuarterScores<'_>,
) -> WinnerMap {
    let mut winners = WinnerMap::new();
    let (Some(top_row), Some(first_column)) = (top_row, first_column) else {
        return winners;
    };
    for quarter in Quarter::IN_PRIORITY_ORDER {
        let Some(raw) = scores.get(quarter) else {
            continue;
        };
        let Some((a_digit, b_digit)) = parse_score(raw) else {
            debug!(quarter = %quarter, score = raw, "score not parseable yet, skipping");
            continue;
        };
        let (Some(col_idx), Some(row_idx)) =
            (top_row.index_of(a_digit), first_column.index_of(b_digit))
        else {
            continue;
        };
        let Ok(cell) = CellKey::new(row_idx as u8 + 1, col_idx as u8 + 1) else {
            continue;
        };
        // Iterating in priority order keeps each cell's tag list sorted
        // Q1, Q2, Q3, F no matter when each score arrived.
        winners.entry(cell).or_default().push(quarter);
    }
    winners
}

/// Convenience wrapper over a full board document.
pub fn winners_for_board(board: &Board) -> WinnerMap {
    resolve_winners(
        board.top_row.as_ref(),
        board.first_column.as_ref(),
        QuarterScores::of_board(board),
    )
}

/// One horizontal band of a winning cell's highlight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stripe {
    pub quarter: Quarter,
    pub color: &'static str,
    pub start_pct: f32,
    pub end_pct: f32,
}

/// Deterministic visual composition for 1-4 simultaneous winners: equal
/// width stripes in tag-list order, one color per quarter.
pub fn stripes(quarters: &[Quarter]) -> Vec<Stripe> {
    let count = quarters.len();
    if count == 0 {
        return Vec::new();
    }
    let width = 100.0 / count as f32;
    quarters
        .iter()
        .enumerate()
        .map(|(i, &quarter)| Stripe {
            quarter,
            color: quarter.color(),
            start_pct: width * i as f32,
            end_pct: if i + 1 == count {
                100.0
            } else {
                width * (i + 1) as f32
            },
        })
        .collect()
}
