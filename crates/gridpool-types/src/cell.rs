use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A reservable grid position. Rows and columns are 1-based; index 0 on
/// either axis is the digit header and is never reservable.
///
/// The canonical string form is `"{row}-{col}"`, which is also how the key
/// appears in the board document's reservation map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    row: u8,
    col: u8,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CellKeyError {
    #[error("cell key must look like \"row-col\", got {0:?}")]
    Malformed(String),
    #[error("cell {row}-{col} is outside the reservable 10x10 grid")]
    OutOfRange { row: u8, col: u8 },
}

impl CellKey {
    pub fn new(row: u8, col: u8) -> Result<Self, CellKeyError> {
        if !(1..=10).contains(&row) || !(1..=10).contains(&col) {
            return Err(CellKeyError::OutOfRange { row, col });
        }
        Ok(Self { row, col })
    }

    pub fn row(self) -> u8 {
        self.row
    }

    pub fn col(self) -> u8 {
        self.col
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.col)
    }
}

impl FromStr for CellKey {
    type Err = CellKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((row, col)) = s.split_once('-') else {
            return Err(CellKeyError::Malformed(s.to_string()));
        };
        let row: u8 = row
            .parse()
            .map_err(|_| CellKeyError::Malformed(s.to_string()))?;
        let col: u8 = col
            .parse()
            .map_err(|_| CellKeyError::Malformed(s.to_string()))?;
        Self::new(row, col)
    }
}

impl Serialize for CellKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CellKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl Visitor<'_> for KeyVisitor {
            type Value = CellKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a cell key of the form \"row-col\"")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<CellKey, E> {
                value.parse().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(KeyVisitor)
    }
}
