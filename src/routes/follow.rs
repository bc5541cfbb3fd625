use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::get,
    Router,
};
use tracing::{info, instrument};

use crate::{
    auth::Auth,
    error::AppError,
    session::flash,
    state::AppState,
    users::{Lookup, User},
};

pub fn follow_routes() -> Router<AppState> {
    Router::new()
        .route("/:name/follow", get(follow_user))
        .route("/:name/unfollow", get(unfollow_user))
}

async fn target(state: &AppState, auth: &Auth, name: &str) -> Result<(User, User), AppError> {
    let viewer = auth.require_user()?.clone();
    let whom = User::find_by(state.db.as_ref(), Lookup::Name(name))
        .await?
        .ok_or(AppError::NotFound)?;
    Ok((viewer, whom))
}

#[instrument(skip(state, auth))]
pub async fn follow_user(
    State(state): State<AppState>,
    auth: Auth,
    Path(name): Path<String>,
) -> Result<Redirect, AppError> {
    let (viewer, whom) = target(&state, &auth, &name).await?;
    viewer.follow(state.db.as_ref(), &whom).await?;
    info!(who = viewer.id, whom = whom.id, "followed");
    flash(&auth.session, format!("You are now following \"{name}\"")).await?;
    Ok(Redirect::to(&whom.profile_path()))
}

#[instrument(skip(state, auth))]
pub async fn unfollow_user(
    State(state): State<AppState>,
    auth: Auth,
    Path(name): Path<String>,
) -> Result<Redirect, AppError> {
    let (viewer, whom) = target(&state, &auth, &name).await?;
    viewer.unfollow(state.db.as_ref(), &whom).await?;
    info!(who = viewer.id, whom = whom.id, "unfollowed");
    flash(&auth.session, format!("You are no longer following \"{name}\"")).await?;
    Ok(Redirect::to(&whom.profile_path()))
}
