use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod follow;
pub mod messages;
pub mod timeline;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(timeline::timeline_routes())
        .merge(follow::follow_routes())
        .merge(messages::message_routes())
        .merge(auth::auth_routes())
}
