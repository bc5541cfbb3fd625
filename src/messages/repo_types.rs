use sqlx::FromRow;
use time::{macros::format_description, OffsetDateTime};

/// Message record in the database.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Message {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub pub_date: i64, // unix seconds
}

impl Message {
    /// `YYYY-MM-DD @ HH:MM` in UTC.
    pub fn formatted_date(&self) -> String {
        let format = format_description!("[year]-[month]-[day] @ [hour]:[minute]");
        OffsetDateTime::from_unix_timestamp(self.pub_date)
            .ok()
            .and_then(|dt| dt.format(format).ok())
            .unwrap_or_else(|| self.pub_date.to_string())
    }
}
