use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use tracing::debug;

use crate::{
    error::AppError,
    session,
    state::AppState,
    users::{Lookup, User},
};

/// The caller's identity for this request, resolved from the session.
///
/// A session pointing at a user that no longer exists is treated as
/// anonymous; the stale id is left in place.
pub struct Auth {
    pub session: Session,
    pub user: Option<User>,
}

#[async_trait]
impl FromRequestParts<AppState> for Auth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::MissingSession)?;

        let user = match session::user_id(&session).await? {
            Some(id) => {
                let user = User::find_by(state.db.as_ref(), Lookup::Id(id)).await?;
                if user.is_none() {
                    debug!(user_id = id, "session refers to a missing user");
                }
                user
            }
            None => None,
        };

        Ok(Auth { session, user })
    }
}
