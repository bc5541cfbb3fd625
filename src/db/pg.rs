use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::{DbError, Repository, TimelineFilter, TimelineRow};
use crate::messages::Message;
use crate::users::{Lookup, User};

/// Postgres-backed store. Each call checks a connection out of the pool.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_unique(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DbError::UniqueViolation(db.constraint().unwrap_or("unknown").to_string())
        }
        other => DbError::Sqlx(other),
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn find_user(&self, lookup: Lookup<'_>) -> Result<Option<User>, DbError> {
        // The column comes from a closed enum, never from request input.
        let sql = format!(
            "SELECT id, name, email, pw_hash FROM users WHERE {} = $1 LIMIT 1",
            lookup.column().as_str()
        );
        let query = sqlx::query_as::<_, User>(&sql);
        let query = match lookup {
            Lookup::Id(id) => query.bind(id),
            Lookup::Name(name) => query.bind(name),
            Lookup::Email(email) => query.bind(email),
        };
        Ok(query.fetch_optional(&self.pool).await?)
    }

    async fn insert_user(&self, name: &str, email: &str, pw_hash: &str) -> Result<User, DbError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, pw_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, pw_hash
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(pw_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique)?;
        debug!(user_id = user.id, "user row inserted");
        Ok(user)
    }

    async fn is_following(&self, who_id: i64, whom_id: i64) -> Result<bool, DbError> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"SELECT 1 FROM followers WHERE who_id = $1 AND whom_id = $2"#,
        )
        .bind(who_id)
        .bind(whom_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn insert_follower(&self, who_id: i64, whom_id: i64) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO followers (who_id, whom_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(who_id)
        .bind(whom_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_follower(&self, who_id: i64, whom_id: i64) -> Result<(), DbError> {
        sqlx::query(r#"DELETE FROM followers WHERE who_id = $1 AND whom_id = $2"#)
            .bind(who_id)
            .bind(whom_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_message(
        &self,
        user_id: i64,
        text: &str,
        pub_date: i64,
    ) -> Result<Message, DbError> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (user_id, text, pub_date)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, text, pub_date
            "#,
        )
        .bind(user_id)
        .bind(text)
        .bind(pub_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(message)
    }

    async fn timeline(
        &self,
        filter: TimelineFilter,
        limit: i64,
    ) -> Result<Vec<TimelineRow>, DbError> {
        let rows = match filter {
            TimelineFilter::Public => {
                sqlx::query_as::<_, TimelineRow>(
                    r#"
                    SELECT m.id, m.user_id, m.text, m.pub_date, u.name, u.email
                    FROM messages m
                    JOIN users u ON m.user_id = u.id
                    ORDER BY m.pub_date DESC, m.id DESC
                    LIMIT $1
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            TimelineFilter::Author(user_id) => {
                sqlx::query_as::<_, TimelineRow>(
                    r#"
                    SELECT m.id, m.user_id, m.text, m.pub_date, u.name, u.email
                    FROM messages m
                    JOIN users u ON m.user_id = u.id
                    WHERE u.id = $1
                    ORDER BY m.pub_date DESC, m.id DESC
                    LIMIT $2
                    "#,
                )
                .bind(user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            TimelineFilter::FollowedBy(user_id) => {
                sqlx::query_as::<_, TimelineRow>(
                    r#"
                    SELECT m.id, m.user_id, m.text, m.pub_date, u.name, u.email
                    FROM messages m
                    JOIN users u ON m.user_id = u.id
                    WHERE u.id = $1
                       OR u.id IN (SELECT whom_id FROM followers WHERE who_id = $1)
                    ORDER BY m.pub_date DESC, m.id DESC
                    LIMIT $2
                    "#,
                )
                .bind(user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }
}
