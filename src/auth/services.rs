use tower_sessions::session::Error as SessionError;
use tracing::{debug, warn};

use super::{
    dto::RegisterForm,
    extractors::Auth,
    password::{hash_password, verify_password, PasswordError},
};
use crate::{
    db::{DbError, Repository},
    error::AppError,
    session::{remove_user_id, set_user_id},
    users::{Lookup, User},
};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid name")]
    InvalidName,
    #[error("Invalid password")]
    InvalidPassword,
    #[error("Name is required")]
    NameRequired,
    #[error("E-mail address is invalid")]
    InvalidEmail,
    #[error("Password is required")]
    PasswordRequired,
    #[error("The two passwords do not match")]
    PasswordMismatch,
    #[error("The name is already taken")]
    NameTaken,
    #[error(transparent)]
    Store(#[from] DbError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl AuthError {
    /// Whether the message belongs on the re-rendered form.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            AuthError::Store(_) | AuthError::Password(_) | AuthError::Session(_)
        )
    }
}

impl Auth {
    pub fn authorized(&self) -> bool {
        self.user.is_some()
    }

    /// The logged-in user, or 401.
    pub fn require_user(&self) -> Result<&User, AppError> {
        self.user.as_ref().ok_or(AppError::Unauthorized)
    }

    /// Checks credentials and records the user in the session.
    pub async fn login(
        &mut self,
        db: &dyn Repository,
        name: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let user = User::find_by(db, Lookup::Name(name))
            .await?
            .ok_or(AuthError::InvalidName)?;
        if !verify_password(password, &user.pw_hash)? {
            return Err(AuthError::InvalidPassword);
        }
        self.start(user.clone()).await?;
        Ok(user)
    }

    /// Attaches `user` to this session without checking a password.
    pub async fn start(&mut self, user: User) -> Result<(), SessionError> {
        set_user_id(&self.session, user.id).await?;
        debug!(user_id = user.id, "session started");
        self.user = Some(user);
        Ok(())
    }

    pub async fn logout(&mut self) -> Result<(), SessionError> {
        remove_user_id(&self.session).await?;
        self.user = None;
        Ok(())
    }

    /// Validates the form and creates the account. The first failing rule
    /// decides the error. Does not log the new user in.
    pub async fn register(&self, db: &dyn Repository, form: &RegisterForm) -> Result<User, AuthError> {
        if form.name.is_empty() {
            return Err(AuthError::NameRequired);
        }
        if form.email.is_empty() || !form.email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        if form.password.is_empty() {
            return Err(AuthError::PasswordRequired);
        }
        if form.password != form.password2 {
            return Err(AuthError::PasswordMismatch);
        }
        if User::find_by(db, Lookup::Name(&form.name)).await?.is_some() {
            return Err(AuthError::NameTaken);
        }

        let pw_hash = hash_password(&form.password)?;
        match User::create(db, &form.name, &form.email, &pw_hash).await {
            Ok(user) => Ok(user),
            // Lost a race with a concurrent registration.
            Err(DbError::UniqueViolation(constraint)) => {
                warn!(%constraint, "name taken between check and insert");
                Err(AuthError::NameTaken)
            }
            Err(e) => Err(e.into()),
        }
    }
}
