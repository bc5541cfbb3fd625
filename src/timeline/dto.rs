use crate::db::TimelineRow;
use crate::messages::Message;
use crate::users::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineKind {
    Public,
    User,
    Following,
}

#[derive(Debug, Clone)]
pub struct TimelineEntry {
    pub message: Message,
    pub user: UserSummary,
}

impl From<TimelineRow> for TimelineEntry {
    fn from(r: TimelineRow) -> Self {
        Self {
            message: Message {
                id: r.id,
                user_id: r.user_id,
                text: r.text,
                pub_date: r.pub_date,
            },
            user: UserSummary {
                id: r.user_id,
                name: r.name,
                email: r.email,
            },
        }
    }
}

/// A page of messages, newest first. `user` is the timeline's owner for the
/// user and following kinds.
#[derive(Debug, Clone)]
pub struct Timeline {
    pub kind: TimelineKind,
    pub entries: Vec<TimelineEntry>,
    pub user: Option<UserSummary>,
}
