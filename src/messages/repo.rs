use time::OffsetDateTime;
use tracing::debug;

use super::repo_types::Message;
use crate::db::{DbError, Repository};
use crate::users::User;

impl Message {
    /// Insert a message stamped with the current time. Callers have already
    /// rejected empty text.
    pub async fn create(db: &dyn Repository, owner: &User, text: &str) -> Result<Message, DbError> {
        let pub_date = OffsetDateTime::now_utc().unix_timestamp();
        let message = db.insert_message(owner.id, text, pub_date).await?;
        debug!(message_id = message.id, user_id = owner.id, "message stored");
        Ok(message)
    }
}
