use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use tracing::instrument;

use crate::{
    auth::Auth,
    error::AppError,
    state::AppState,
    timeline::Timeline,
    users::{Lookup, User},
    views::{render, TimelinePage},
};

pub fn timeline_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/public", get(public_timeline))
        .route("/:name", get(user_timeline))
}

/// The viewer's own messages and those of everyone they follow.
#[instrument(skip_all)]
pub async fn home(State(state): State<AppState>, auth: Auth) -> Result<Response, AppError> {
    let Some(user) = auth.user.as_ref() else {
        return Ok(Redirect::to("/public").into_response());
    };
    let timeline = Timeline::following(state.db.as_ref(), user, state.config.per_page).await?;
    render(&TimelinePage::new(&auth, timeline, false).await?)
}

#[instrument(skip_all)]
pub async fn public_timeline(
    State(state): State<AppState>,
    auth: Auth,
) -> Result<Response, AppError> {
    let timeline = Timeline::public(state.db.as_ref(), state.config.per_page).await?;
    render(&TimelinePage::new(&auth, timeline, false).await?)
}

#[instrument(skip(state, auth))]
pub async fn user_timeline(
    State(state): State<AppState>,
    auth: Auth,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let db = state.db.as_ref();
    let profile = User::find_by(db, Lookup::Name(&name))
        .await?
        .ok_or(AppError::NotFound)?;

    let followed = match auth.user.as_ref() {
        Some(viewer) => viewer.is_following(db, &profile).await?,
        None => false,
    };

    let timeline = Timeline::user(db, &profile, state.config.per_page).await?;
    render(&TimelinePage::new(&auth, timeline, followed).await?)
}
