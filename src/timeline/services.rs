use super::dto::{Timeline, TimelineEntry, TimelineKind};
use crate::db::{DbError, Repository, TimelineFilter};
use crate::users::{User, UserSummary};

impl Timeline {
    /// Latest messages from everyone.
    pub async fn public(db: &dyn Repository, per_page: i64) -> Result<Timeline, DbError> {
        Self::load(db, TimelineFilter::Public, TimelineKind::Public, None, per_page).await
    }

    /// Latest messages authored by `target`.
    pub async fn user(db: &dyn Repository, target: &User, per_page: i64) -> Result<Timeline, DbError> {
        Self::load(
            db,
            TimelineFilter::Author(target.id),
            TimelineKind::User,
            Some(target),
            per_page,
        )
        .await
    }

    /// Latest messages by `viewer` and everyone `viewer` follows.
    pub async fn following(
        db: &dyn Repository,
        viewer: &User,
        per_page: i64,
    ) -> Result<Timeline, DbError> {
        Self::load(
            db,
            TimelineFilter::FollowedBy(viewer.id),
            TimelineKind::Following,
            Some(viewer),
            per_page,
        )
        .await
    }

    async fn load(
        db: &dyn Repository,
        filter: TimelineFilter,
        kind: TimelineKind,
        owner: Option<&User>,
        per_page: i64,
    ) -> Result<Timeline, DbError> {
        let rows = db.timeline(filter, per_page).await?;
        Ok(Timeline {
            kind,
            entries: rows.into_iter().map(TimelineEntry::from).collect(),
            user: owner.map(UserSummary::from),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
