//! Input forms that gate session transitions. The store accepts whatever it
//! is given; these forms are where names get checked.

use session_store::{SessionState, SessionStore, StoreError};
use shared::protocol::SessionAction;
use thiserror::Error;
use tracing::debug;

const MIN_CREDENTIAL_LEN: usize = 3;
const MIN_UPDATED_NAME_LEN: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Please enter both username and password")]
    MissingCredentials,
    #[error("Username and password must be at least 3 characters")]
    CredentialsTooShort,
    #[error("Username must be at least 3 characters")]
    NameTooShort,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), FormError> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(FormError::MissingCredentials);
        }
        if self.username.chars().count() < MIN_CREDENTIAL_LEN
            || self.password.chars().count() < MIN_CREDENTIAL_LEN
        {
            return Err(FormError::CredentialsTooShort);
        }
        Ok(())
    }

    /// Any well-formed credentials are accepted; there is no backend check.
    pub fn submit(&self, store: &SessionStore) -> Result<SessionState, FormError> {
        self.validate()?;
        Ok(store.dispatch(SessionAction::login(self.username.clone()))?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateNameForm {
    pub new_username: String,
    visible: bool,
}

impl UpdateNameForm {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        if !self.visible {
            self.new_username.clear();
        }
    }

    /// Dispatches the trimmed name. A short name leaves the store and the
    /// form untouched.
    pub fn submit(&mut self, store: &SessionStore) -> Result<SessionState, FormError> {
        let trimmed = self.new_username.trim();
        if trimmed.chars().count() < MIN_UPDATED_NAME_LEN {
            debug!(len = trimmed.chars().count(), "rejected short user name");
            return Err(FormError::NameTooShort);
        }

        let state = store.dispatch(SessionAction::update_user_name(trimmed))?;
        self.new_username.clear();
        self.visible = false;
        Ok(state)
    }
}
