use axum::{extract::State, response::Redirect, routing::post, Form, Router};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::{auth::Auth, error::AppError, session::flash, state::AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MessageForm {
    pub text: String,
}

pub fn message_routes() -> Router<AppState> {
    Router::new().route("/add_message", post(add_message))
}

/// Empty text is ignored without an error.
#[instrument(skip_all)]
pub async fn add_message(
    State(state): State<AppState>,
    auth: Auth,
    form: Option<Form<MessageForm>>,
) -> Result<Redirect, AppError> {
    let user = auth.require_user()?;
    let text = form.map(|Form(f)| f.text).unwrap_or_default();
    if !text.is_empty() {
        let message = user.post_message(state.db.as_ref(), &text).await?;
        info!(message_id = message.id, user_id = user.id, "message posted");
        flash(&auth.session, "Your message was recorded").await?;
    }
    Ok(Redirect::to("/"))
}
