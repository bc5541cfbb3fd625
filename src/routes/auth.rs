use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{Auth, LoginForm, RegisterForm},
    error::AppError,
    session::flash,
    state::AppState,
    views::{render, LoginPage, RegisterPage},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_form).post(login))
        .route("/register", get(register_form).post(register))
        .route("/logout", get(logout))
}

fn already_logged_in() -> Result<Response, AppError> {
    Ok(Redirect::to("/").into_response())
}

#[instrument(skip_all)]
pub async fn login_form(auth: Auth) -> Result<Response, AppError> {
    if auth.authorized() {
        return already_logged_in();
    }
    render(&LoginPage::new(&auth, None).await?)
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    mut auth: Auth,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if auth.authorized() {
        return already_logged_in();
    }
    match auth.login(state.db.as_ref(), &form.name, &form.password).await {
        Ok(user) => {
            info!(user_id = user.id, "user logged in");
            flash(&auth.session, "You were logged in").await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) if e.is_user_facing() => {
            warn!(name = %form.name, reason = %e, "login rejected");
            render(&LoginPage::new(&auth, Some(e.to_string())).await?)
        }
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip_all)]
pub async fn register_form(auth: Auth) -> Result<Response, AppError> {
    if auth.authorized() {
        return already_logged_in();
    }
    render(&RegisterPage::new(&auth, None).await?)
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    mut auth: Auth,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if auth.authorized() {
        return already_logged_in();
    }
    match auth.register(state.db.as_ref(), &form).await {
        Ok(user) => {
            info!(user_id = user.id, "user registered");
            auth.start(user).await?;
            flash(&auth.session, "You were successfully registered").await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) if e.is_user_facing() => {
            warn!(name = %form.name, reason = %e, "registration rejected");
            render(&RegisterPage::new(&auth, Some(e.to_string())).await?)
        }
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip_all)]
pub async fn logout(mut auth: Auth) -> Result<Redirect, AppError> {
    if let Some(user) = auth.user.as_ref() {
        info!(user_id = user.id, "user logged out");
    }
    auth.logout().await?;
    flash(&auth.session, "You were logged out").await?;
    Ok(Redirect::to("/public"))
}
