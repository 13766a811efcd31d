pub mod auth;
pub mod error;
pub mod label;
pub mod reservation;
pub mod session;
pub mod winners;

pub use auth::{
    AuthEffect, AuthState, AuthTracker, CredentialCache, IdentityProvider, MemoryCredentialCache,
    PasswordCheck, check_password,
};
pub use error::{ClaimError, ReleaseError};
pub use label::{derive_label, mask_email};
pub use reservation::{ReservationEngine, resolve_short_code, track_access};
pub use session::BoardSession;
pub use winners::{
    QuarterScores, Stripe, WinnerMap, parse_score, resolve_winners, stripes, winners_for_board,
};
