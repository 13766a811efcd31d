use std::collections::HashMap;

use tracing::info;

use gridpool_types::{Board, BoardId, Identity, UserId};

/// The identity provider collaborator. The transport (OAuth, cookies,
/// whatever) is someone else's problem; the core only needs the current
/// identity and a change notification feeding `AuthTracker::observe`.
pub trait IdentityProvider {
    fn current_identity(&self) -> Option<Identity>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// No auth snapshot observed yet. The first observation establishes
    /// state and never clears anything, whatever it is.
    Uninitialized,
    SignedOut,
    SignedInAs(UserId),
}

/// What the caller must do after an auth change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEffect {
    None,
    /// The acting user changed or signed out: drop cached credentials so
    /// the next person at this keyboard starts clean.
    ClearCredentials,
}

/// Explicit state machine over the provider's auth-change stream.
#[derive(Debug, Default)]
pub struct AuthTracker {
    state: AuthState,
}

impl Default for AuthState {
    fn default() -> Self {
        AuthState::Uninitialized
    }
}

impl AuthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Feed the next auth snapshot; returns the required side effect.
    ///
    /// Clears only on SignedInAs(a) -> SignedInAs(b) with a != b and on
    /// SignedInAs(_) -> SignedOut. Everything else, including the very
    /// first observation and same-user re-auth, is a no-op.
    pub fn observe(&mut self, current: Option<UserId>) -> AuthEffect {
        let next = match current {
            Some(uid) => AuthState::SignedInAs(uid),
            None => AuthState::SignedOut,
        };
        let effect = match (&self.state, &next) {
            (AuthState::Uninitialized, _) => AuthEffect::None,
            (AuthState::SignedInAs(a), AuthState::SignedInAs(b)) if a != b => {
                info!(from = %a, to = %b, "user switched, clearing cached credentials");
                AuthEffect::ClearCredentials
            }
            (AuthState::SignedInAs(a), AuthState::SignedOut) => {
                info!(user = %a, "user signed out, clearing cached credentials");
                AuthEffect::ClearCredentials
            }
            _ => AuthEffect::None,
        };
        self.state = next;
        effect
    }
}

/// Per-board shared secrets remembered on this client. Persistence is the
/// embedder's concern; the core only defines the seam and the clearing
/// rules driven by `AuthTracker`.
pub trait CredentialCache {
    fn get(&self, board: &BoardId) -> Option<String>;
    fn store(&mut self, board: &BoardId, secret: &str);
    fn clear_all(&mut self);
}

#[derive(Debug, Default)]
pub struct MemoryCredentialCache {
    secrets: HashMap<BoardId, String>,
}

impl MemoryCredentialCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialCache for MemoryCredentialCache {
    fn get(&self, board: &BoardId) -> Option<String> {
        self.secrets.get(board).cloned()
    }

    fn store(&mut self, board: &BoardId, secret: &str) {
        self.secrets.insert(board.clone(), secret.to_string());
    }

    fn clear_all(&mut self) {
        self.secrets.clear();
    }
}

/// Result of testing access to a password-protected board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    /// Board has no password; everyone may view it.
    Open,
    /// A previously remembered secret still matches.
    Cached,
    /// The freshly entered secret matches and was remembered.
    Accepted,
    Rejected,
}

/// Gate a board behind its shared secret. Exact string comparison, like
/// the secret itself: this is a speed bump for casual visitors, not
/// authorization.
pub fn check_password<C: CredentialCache>(
    board_id: &BoardId,
    board: &Board,
    cache: &mut C,
    entered: Option<&str>,
) -> PasswordCheck {
    let Some(required) = board.password.as_deref().filter(|p| !p.is_empty()) else {
        return PasswordCheck::Open;
    };
    if cache.get(board_id).as_deref() == Some(required) {
        return PasswordCheck::Cached;
    }
    match entered {
        Some(secret) if secret == required => {
            cache.store(board_id, secret);
            PasswordCheck::Accepted
        }
        _ => PasswordCheck::Rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> Option<UserId> {
        Some(UserId::from(s))
    }

    #[test]
    fn test_first_observation_never_clears() {
        let mut tracker = AuthTracker::new();
        assert_eq!(tracker.observe(uid("a")), AuthEffect::None);

        let mut tracker = AuthTracker::new();
        assert_eq!(tracker.observe(None), AuthEffect::None);
    }

    #[test]
    fn test_user_switch_clears() {
        let mut tracker = AuthTracker::new();
        tracker.observe(uid("a"));
        assert_eq!(tracker.observe(uid("b")), AuthEffect::ClearCredentials);
        assert_eq!(tracker.state(), &AuthState::SignedInAs(UserId::from("b")));
    }

    #[test]
    fn test_sign_out_clears() {
        let mut tracker = AuthTracker::new();
        tracker.observe(uid("a"));
        assert_eq!(tracker.observe(None), AuthEffect::ClearCredentials);
    }

    #[test]
    fn test_no_op_transitions() {
        let mut tracker = AuthTracker::new();
        tracker.observe(uid("a"));
        // Same user re-auth.
        assert_eq!(tracker.observe(uid("a")), AuthEffect::None);

        let mut tracker = AuthTracker::new();
        tracker.observe(None);
        // SignedOut -> SignedOut and SignedOut -> SignedIn both keep caches.
        assert_eq!(tracker.observe(None), AuthEffect::None);
        assert_eq!(tracker.observe(uid("a")), AuthEffect::None);
    }

    #[test]
    fn test_provider_snapshots_drive_tracker() {
        struct StaticProvider(Option<Identity>);

        impl IdentityProvider for StaticProvider {
            fn current_identity(&self) -> Option<Identity> {
                self.0.clone()
            }
        }

        let signed_in = StaticProvider(Some(Identity {
            uid: UserId::from("a"),
            email: None,
            display_name: None,
        }));
        let signed_out = StaticProvider(None);

        let mut tracker = AuthTracker::new();
        tracker.observe(signed_in.current_identity().map(|i| i.uid));
        assert_eq!(tracker.state(), &AuthState::SignedInAs(UserId::from("a")));
        assert_eq!(
            tracker.observe(signed_out.current_identity().map(|i| i.uid)),
            AuthEffect::ClearCredentials
        );
    }

    #[test]
    fn test_password_gate() {
        let board_id = BoardId::from("board-1");
        let mut cache = MemoryCredentialCache::new();

        let open: Board = Default::default();
        assert_eq!(
            check_password(&board_id, &open, &mut cache, None),
            PasswordCheck::Open
        );

        let mut gated: Board = Default::default();
        gated.password = Some("hunter2".into());

        assert_eq!(
            check_password(&board_id, &gated, &mut cache, None),
            PasswordCheck::Rejected
        );
        assert_eq!(
            check_password(&board_id, &gated, &mut cache, Some("wrong")),
            PasswordCheck::Rejected
        );
        assert_eq!(
            check_password(&board_id, &gated, &mut cache, Some("hunter2")),
            PasswordCheck::Accepted
        );
        // Remembered for next time.
        assert_eq!(
            check_password(&board_id, &gated, &mut cache, None),
            PasswordCheck::Cached
        );
    }

    #[test]
    fn test_clearing_cache_revokes_cached_access() {
        let board_id = BoardId::from("board-1");
        let mut cache = MemoryCredentialCache::new();
        let mut gated: Board = Default::default();
        gated.password = Some("hunter2".into());

        check_password(&board_id, &gated, &mut cache, Some("hunter2"));

        let mut tracker = AuthTracker::new();
        tracker.observe(Some(UserId::from("a")));
        if tracker.observe(None) == AuthEffect::ClearCredentials {
            cache.clear_all();
        }
        assert_eq!(
            check_password(&board_id, &gated, &mut cache, None),
            PasswordCheck::Rejected
        );
    }
}
