pub mod board;
pub mod cell;
pub mod identity;
pub mod permutation;
pub mod quarter;

pub use board::{Board, Reservation};
pub use cell::{CellKey, CellKeyError};
pub use identity::{BoardId, Identity, UserId};
pub use permutation::{AxisDigits, AxisDigitsError};
pub use quarter::Quarter;
