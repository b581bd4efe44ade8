//! Who is making requests on behalf of the learner.

use std::fmt;
use std::sync::{Arc, RwLock};

/// API token issued by the course backend. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Returns `None` for a blank token.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    /// Signed in against the remote API.
    Token(AuthToken),
    /// Offline learner backed by the local store.
    Local,
}

/// Shared, swappable identity for one user session.
///
/// Clones share state, so signing out through one handle is seen by the API
/// client and the progress service alike.
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    identity: Arc<RwLock<Identity>>,
}

impl AuthSession {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: Option<AuthToken>) -> Self {
        let identity = token.map_or(Identity::Anonymous, Identity::Token);
        Self {
            identity: Arc::new(RwLock::new(identity)),
        }
    }

    #[must_use]
    pub fn local_learner() -> Self {
        Self {
            identity: Arc::new(RwLock::new(Identity::Local)),
        }
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        self.identity
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !matches!(self.identity(), Identity::Anonymous)
    }

    #[must_use]
    pub fn token(&self) -> Option<AuthToken> {
        match self.identity() {
            Identity::Token(token) => Some(token),
            Identity::Anonymous | Identity::Local => None,
        }
    }

    pub fn sign_in(&self, token: AuthToken) {
        self.set(Identity::Token(token));
    }

    pub fn sign_out(&self) {
        self.set(Identity::Anonymous);
    }

    fn set(&self, identity: Identity) {
        if let Ok(mut guard) = self.identity.write() {
            *guard = identity;
        }
    }
}
