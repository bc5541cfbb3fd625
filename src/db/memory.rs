use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DbError, Repository, TimelineFilter, TimelineRow};
use crate::messages::Message;
use crate::users::{Lookup, User};

/// In-process store for `serve --in-memory` and tests. Same semantics as
/// [`super::PgRepository`], including the unique name constraint.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    messages: Vec<Message>,
    followers: HashSet<(i64, i64)>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_user(&self, lookup: Lookup<'_>) -> Result<Option<User>, DbError> {
        let tables = self.tables.read().await;
        let found = tables.users.iter().find(|u| match lookup {
            Lookup::Id(id) => u.id == id,
            Lookup::Name(name) => u.name == name,
            Lookup::Email(email) => u.email == email,
        });
        Ok(found.cloned())
    }

    async fn insert_user(&self, name: &str, email: &str, pw_hash: &str) -> Result<User, DbError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.name == name) {
            return Err(DbError::UniqueViolation("users_name_key".into()));
        }
        let user = User {
            id: tables.users.len() as i64 + 1,
            name: name.to_string(),
            email: email.to_string(),
            pw_hash: pw_hash.to_string(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn is_following(&self, who_id: i64, whom_id: i64) -> Result<bool, DbError> {
        Ok(self.tables.read().await.followers.contains(&(who_id, whom_id)))
    }

    async fn insert_follower(&self, who_id: i64, whom_id: i64) -> Result<(), DbError> {
        self.tables.write().await.followers.insert((who_id, whom_id));
        Ok(())
    }

    async fn delete_follower(&self, who_id: i64, whom_id: i64) -> Result<(), DbError> {
        self.tables.write().await.followers.remove(&(who_id, whom_id));
        Ok(())
    }

    async fn insert_message(
        &self,
        user_id: i64,
        text: &str,
        pub_date: i64,
    ) -> Result<Message, DbError> {
        let mut tables = self.tables.write().await;
        let message = Message {
            id: tables.messages.len() as i64 + 1,
            user_id,
            text: text.to_string(),
            pub_date,
        };
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn timeline(
        &self,
        filter: TimelineFilter,
        limit: i64,
    ) -> Result<Vec<TimelineRow>, DbError> {
        let tables = self.tables.read().await;
        let visible = |author: i64| match filter {
            TimelineFilter::Public => true,
            TimelineFilter::Author(id) => author == id,
            TimelineFilter::FollowedBy(id) => {
                author == id || tables.followers.contains(&(id, author))
            }
        };

        let mut selected: Vec<&Message> = tables
            .messages
            .iter()
            .filter(|m| visible(m.user_id))
            .collect();
        selected.sort_by(|a, b| (b.pub_date, b.id).cmp(&(a.pub_date, a.id)));

        let rows = selected
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .filter_map(|m| {
                let author = tables.users.iter().find(|u| u.id == m.user_id)?;
                Some(TimelineRow {
                    id: m.id,
                    user_id: m.user_id,
                    text: m.text.clone(),
                    pub_date: m.pub_date,
                    name: author.name.clone(),
                    email: author.email.clone(),
                })
            })
            .collect();
        Ok(rows)
    }
}
