//! Authentication gate for admin operations
//!
//! The catalog only asks whether somebody is signed in; who that is matters
//! for logging alone.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

/// Errors that can occur while signing in or out.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The email or password did not match
    #[error("Invalid email or password")]
    InvalidCredentials,
}

/// Email and password supplied at sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub email: String,
}

/// Trait for sign-in providers
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Signs in with the given credentials
    async fn login(&self, credentials: &Credentials) -> Result<User, AuthError>;

    /// Signs the current user out
    async fn logout(&self) -> Result<(), AuthError>;

    /// Subscribes to sign-in state changes
    ///
    /// The receiver holds the current user right away and is updated on every
    /// login and logout.
    fn observe_auth(&self) -> watch::Receiver<Option<User>>;

    /// The currently signed-in user, if any
    fn current_user(&self) -> Option<User> {
        self.observe_auth().borrow().clone()
    }
}

/// Provider accepting one configured admin account
pub struct AdminCredentialsProvider {
    email: String,
    password: String,
    state: watch::Sender<Option<User>>,
}

impl AdminCredentialsProvider {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            email: email.into(),
            password: password.into(),
            state,
        }
    }
}

#[async_trait]
impl AuthProvider for AdminCredentialsProvider {
    async fn login(&self, credentials: &Credentials) -> Result<User, AuthError> {
        let email_matches = credentials.email.trim().eq_ignore_ascii_case(&self.email);
        if !email_matches || credentials.password != self.password {
            tracing::warn!(email = %credentials.email, "Rejected sign-in");
            return Err(AuthError::InvalidCredentials);
        }

        let user = User {
            email: self.email.clone(),
        };
        tracing::info!(email = %user.email, "Signed in");
        self.state.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn logout(&self) -> Result<(), AuthError> {
        if let Some(user) = self.state.send_replace(None) {
            tracing::info!(email = %user.email, "Signed out");
        }
        Ok(())
    }

    fn observe_auth(&self) -> watch::Receiver<Option<User>> {
        self.state.subscribe()
    }

    fn current_user(&self) -> Option<User> {
        self.state.borrow().clone()
    }
}
