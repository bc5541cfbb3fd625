use anyhow::Context;
use sha2::{Digest, Sha512};
use time::Duration;
use tower_sessions::{
    cookie::{Key, SameSite},
    service::SignedCookie,
    session, ExpiredDeletion, Expiry, Session, SessionManagerLayer, SessionStore,
};
use tower_sessions_sqlx_store::PostgresStore;

use crate::{config::SessionConfig, db};

const SESSION_COOKIE: &str = "session";

const USER_ID_KEY: &str = "user_id";
const FLASHES_KEY: &str = "_flashes";

/// Signed `session` cookie, sliding expiry of `ttl_minutes`.
pub fn layer<S: SessionStore + Clone>(
    store: S,
    config: &SessionConfig,
) -> SessionManagerLayer<S, SignedCookie> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE)
        .with_same_site(SameSite::Lax)
        .with_secure(config.secure_cookie)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(config.ttl_minutes)))
        .with_signed(cookie_key(&config.secret_key))
}

/// Connects the session database and creates its table if needed.
pub async fn postgres_store(config: &SessionConfig, max_connections: u32) -> anyhow::Result<PostgresStore> {
    let pool = db::connect(&config.database_url, max_connections).await?;
    let store = PostgresStore::new(pool);
    store.migrate().await.context("migrate session store")?;
    Ok(store)
}

/// Removes expired session rows every minute for the life of the process.
pub fn spawn_expired_deletion(store: PostgresStore) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let period = tokio::time::Duration::from_secs(60);
        if let Err(e) = store.continuously_delete_expired(period).await {
            tracing::error!(error = %e, "session cleanup stopped");
        }
    })
}

/// Stretches the configured secret to the 64 bytes the cookie key needs.
fn cookie_key(secret: &str) -> Key {
    Key::from(Sha512::digest(secret.as_bytes()).as_slice())
}

pub async fn user_id(session: &Session) -> Result<Option<i64>, session::Error> {
    session.get(USER_ID_KEY).await
}

/// Records a login. The session id is rotated first.
pub async fn set_user_id(session: &Session, user_id: i64) -> Result<(), session::Error> {
    session.cycle_id().await?;
    session.insert(USER_ID_KEY, user_id).await
}

pub async fn remove_user_id(session: &Session) -> Result<(), session::Error> {
    session.remove::<i64>(USER_ID_KEY).await?;
    Ok(())
}

/// Queue a one-time notice for the next rendered page.
pub async fn flash(session: &Session, message: impl Into<String>) -> Result<(), session::Error> {
    let mut flashes: Vec<String> = session.get(FLASHES_KEY).await?.unwrap_or_default();
    flashes.push(message.into());
    session.insert(FLASHES_KEY, flashes).await
}

pub async fn take_flashes(session: &Session) -> Result<Vec<String>, session::Error> {
    let flashes: Vec<String> = session.get(FLASHES_KEY).await?.unwrap_or_default();
    if !flashes.is_empty() {
        session.remove::<Vec<String>>(FLASHES_KEY).await?;
    }
    Ok(flashes)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn fresh() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn flashes_are_drained_once() {
        let s = fresh();
        flash(&s, "one").await.unwrap();
        flash(&s, "two").await.unwrap();
        assert_eq!(take_flashes(&s).await.unwrap(), ["one", "two"]);
        assert!(take_flashes(&s).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn user_id_set_and_removed() {
        let s = fresh();
        assert_eq!(user_id(&s).await.unwrap(), None);
        set_user_id(&s, 7).await.unwrap();
        assert_eq!(user_id(&s).await.unwrap(), Some(7));
        remove_user_id(&s).await.unwrap();
        assert_eq!(user_id(&s).await.unwrap(), None);
        // Removing again is harmless.
        remove_user_id(&s).await.unwrap();
    }

    #[tokio::test]
    async fn flashes_survive_login() {
        let s = fresh();
        flash(&s, "You were logged in").await.unwrap();
        set_user_id(&s, 1).await.unwrap();
        assert_eq!(take_flashes(&s).await.unwrap(), ["You were logged in"]);
        assert_eq!(user_id(&s).await.unwrap(), Some(1));
    }

    #[test]
    fn cookie_key_is_deterministic_per_secret() {
        let a = cookie_key("one");
        assert_eq!(a.master(), cookie_key("one").master());
        assert_ne!(a.master(), cookie_key("two").master());
    }
}
