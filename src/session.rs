//! Session Module
//!
//! In-memory session state: the token, the user it belongs to and the
//! derived owner flag.

use tracing::info;

use crate::models::User;

/// Tracks the current session
#[derive(Debug, Default)]
pub struct SessionState {
    token: Option<String>,
    user: Option<User>,
    is_owner: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_owner(&self) -> bool {
        self.is_owner
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Replace the token, returning whether the value changed.
    ///
    /// Clearing the token leaves the user alone; only [`Self::clear`] drops both.
    pub fn set_token(&mut self, token: Option<String>) -> bool {
        let token = token.filter(|t| !t.is_empty());
        if self.token == token {
            return false;
        }
        self.token = token;
        true
    }

    /// Set the user and derive the owner flag from its role
    pub fn set_user(&mut self, user: Option<User>) {
        self.is_owner = user.as_ref().is_some_and(User::is_owner);
        if user.is_some() {
            info!("User loaded (owner: {})", self.is_owner);
        }
        self.user = user;
    }

    /// Override the owner flag without touching the user
    pub fn set_is_owner(&mut self, is_owner: bool) {
        self.is_owner = is_owner;
    }

    /// Drop token, user and owner flag
    pub fn clear(&mut self) {
        info!("Session cleared");
        self.token = None;
        self.user = None;
        self.is_owner = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(role: &str) -> User {
        serde_json::from_value(json!({ "role": role })).unwrap()
    }

    #[test]
    fn set_token_reports_changes_only() {
        let mut session = SessionState::new();
        assert!(session.set_token(Some("a".into())));
        assert!(!session.set_token(Some("a".into())));
        assert!(session.set_token(Some("b".into())));
        assert!(session.set_token(None));
        assert!(!session.set_token(Some(String::new())));
    }

    #[test]
    fn owner_flag_follows_the_user() {
        let mut session = SessionState::new();
        session.set_user(Some(user("owner")));
        assert!(session.is_owner());

        session.set_user(Some(user("user")));
        assert!(!session.is_owner());

        session.set_user(None);
        assert!(!session.is_owner());
    }

    #[test]
    fn dropping_the_token_keeps_the_user() {
        let mut session = SessionState::new();
        session.set_token(Some("t".into()));
        session.set_user(Some(user("owner")));

        session.set_token(None);
        assert!(!session.is_authenticated());
        assert!(session.user().is_some());
    }

    #[test]
    fn clear_resets_everything() {
        let mut session = SessionState::new();
        session.set_token(Some("t".into()));
        session.set_user(Some(user("owner")));

        session.clear();
        assert_eq!(session.token(), None);
        assert!(session.user().is_none());
        assert!(!session.is_owner());
    }
}
