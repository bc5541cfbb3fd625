use md5::{Digest, Md5};

use super::repo_types::{User, UserSummary};
use super::Lookup;
use crate::db::{DbError, Repository};
use crate::messages::Message;

impl User {
    /// Find a single user by one of the lookup columns.
    pub async fn find_by(db: &dyn Repository, lookup: Lookup<'_>) -> Result<Option<User>, DbError> {
        db.find_user(lookup).await
    }

    /// Create a new user from an already hashed password.
    pub async fn create(
        db: &dyn Repository,
        name: &str,
        email: &str,
        pw_hash: &str,
    ) -> Result<User, DbError> {
        db.insert_user(name, email, pw_hash).await
    }

    pub async fn is_following(&self, db: &dyn Repository, other: &User) -> Result<bool, DbError> {
        db.is_following(self.id, other.id).await
    }

    pub async fn follow(&self, db: &dyn Repository, other: &User) -> Result<(), DbError> {
        db.insert_follower(self.id, other.id).await
    }

    pub async fn unfollow(&self, db: &dyn Repository, other: &User) -> Result<(), DbError> {
        db.delete_follower(self.id, other.id).await
    }

    pub async fn post_message(&self, db: &dyn Repository, text: &str) -> Result<Message, DbError> {
        Message::create(db, self, text).await
    }

    pub fn gravatar_url(&self, size: u32) -> String {
        gravatar_url(&self.email, size)
    }

    pub fn profile_path(&self) -> String {
        profile_path(&self.name)
    }
}

impl UserSummary {
    pub fn gravatar_url(&self, size: u32) -> String {
        gravatar_url(&self.email, size)
    }

    pub fn profile_path(&self) -> String {
        profile_path(&self.name)
    }
}

/// `/<name>` with the name percent-encoded as a single path segment.
pub fn profile_path(name: &str) -> String {
    format!("/{}", url_escape::encode_component(name))
}

/// Identicon avatar URL for an email address.
pub fn gravatar_url(email: &str, size: u32) -> String {
    let digest = Md5::digest(email.trim().to_lowercase().as_bytes());
    format!(
        "https://www.gravatar.com/avatar/{}?d=identicon&s={}",
        hex::encode(digest),
        size
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRepository;

    #[test]
    fn gravatar_normalizes_email() {
        let expected =
            "https://www.gravatar.com/avatar/743173788aa9166801df2e18f0e7ff24?d=identicon&s=80";
        assert_eq!(gravatar_url("a@x.com", 80), expected);
        assert_eq!(gravatar_url("  A@X.com \n", 80), expected);
    }

    #[test]
    fn profile_path_encodes_name() {
        assert_eq!(profile_path("alice"), "/alice");
        assert_eq!(profile_path("a b/c"), "/a%20b%2Fc");
    }

    #[tokio::test]
    async fn follow_then_unfollow() {
        let db = MemoryRepository::new();
        let a = User::create(&db, "a", "a@x.com", "h").await.unwrap();
        let b = User::create(&db, "b", "b@x.com", "h").await.unwrap();

        assert!(!a.is_following(&db, &b).await.unwrap());
        a.follow(&db, &b).await.unwrap();
        assert!(a.is_following(&db, &b).await.unwrap());
        assert!(!b.is_following(&db, &a).await.unwrap());

        a.unfollow(&db, &b).await.unwrap();
        assert!(!a.is_following(&db, &b).await.unwrap());
        // Unfollowing again is harmless.
        a.unfollow(&db, &b).await.unwrap();
    }

    #[tokio::test]
    async fn find_by_each_column() {
        let db = MemoryRepository::new();
        let created = User::create(&db, "carol", "c@x.com", "h").await.unwrap();

        let by_id = User::find_by(&db, Lookup::Id(created.id)).await.unwrap().unwrap();
        assert_eq!(by_id.name, "carol");
        let by_email = User::find_by(&db, Lookup::Email("c@x.com")).await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(created.id));
        assert!(User::find_by(&db, Lookup::Name("nobody")).await.unwrap().is_none());
    }
}
