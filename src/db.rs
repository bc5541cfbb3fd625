use anyhow::Context;
use async_trait::async_trait;
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, FromRow, PgPool};

use crate::messages::Message;
use crate::users::{Lookup, User};

mod memory;
mod pg;

pub use memory::MemoryRepository;
pub use pg::PgRepository;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("connect to database")
}

/// Applies pending migrations. Failures are logged, not fatal.
pub async fn migrate(pool: &PgPool) {
    if let Err(e) = MIGRATOR.run(pool).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DbError {
    /// Connectivity problems as opposed to a failed statement.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DbError::Sqlx(
                sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::WorkerCrashed
            )
        )
    }
}

/// Which authors a timeline query selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineFilter {
    Public,
    Author(i64),
    /// The viewer's own messages plus those of everyone they follow.
    FollowedBy(i64),
}

/// A message joined with its author's name and email.
#[derive(Debug, Clone, FromRow)]
pub struct TimelineRow {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub pub_date: i64,
    pub name: String,
    pub email: String,
}

/// Relational store used by the models. Every write is committed on its own.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn find_user(&self, lookup: Lookup<'_>) -> Result<Option<User>, DbError>;

    /// Fails with [`DbError::UniqueViolation`] if the name is taken.
    async fn insert_user(&self, name: &str, email: &str, pw_hash: &str) -> Result<User, DbError>;

    async fn is_following(&self, who_id: i64, whom_id: i64) -> Result<bool, DbError>;

    /// Idempotent: following twice leaves a single relationship.
    async fn insert_follower(&self, who_id: i64, whom_id: i64) -> Result<(), DbError>;

    async fn delete_follower(&self, who_id: i64, whom_id: i64) -> Result<(), DbError>;

    async fn insert_message(&self, user_id: i64, text: &str, pub_date: i64)
        -> Result<Message, DbError>;

    /// Latest `limit` messages matching `filter`, newest first.
    async fn timeline(&self, filter: TimelineFilter, limit: i64)
        -> Result<Vec<TimelineRow>, DbError>;
}
