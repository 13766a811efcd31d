use std::fmt;

use serde::{Deserialize, Serialize};

/// Which score event produced a winning cell.
///
/// The declaration order here is the fixed priority order Q1, Q2, Q3, F.
/// When one cell wins multiple quarters its tag list is sorted this way,
/// and the stripe renderer assigns visual position by list order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    #[serde(rename = "F")]
    Final,
}

impl Quarter {
    pub const IN_PRIORITY_ORDER: [Quarter; 4] =
        [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Final];

    /// Short wire/display tag.
    pub fn tag(self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Final => "F",
        }
    }

    /// Fixed highlight color for this quarter.
    pub fn color(self) -> &'static str {
        match self {
            Quarter::Q1 => "#FFE119",
            Quarter::Q2 => "#F032E6",
            Quarter::Q3 => "#3CB44B",
            Quarter::Final => "#E6194B",
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
