use anyhow::Context;
use askama::Template;
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;

use crate::{
    auth::Auth,
    error::AppError,
    session,
    timeline::{Timeline, TimelineEntry, TimelineKind},
};

/// Data every page needs for the layout. Building it drains pending flashes.
pub struct PageContext {
    pub viewer: Option<String>,
    pub flashes: Vec<String>,
}

impl PageContext {
    pub async fn new(auth: &Auth) -> Result<Self, AppError> {
        Ok(Self {
            viewer: auth.user.as_ref().map(|u| u.name.clone()),
            flashes: session::take_flashes(&auth.session).await?,
        })
    }
}

/// A timeline entry as published to client scripts. Emails stay server-side.
#[derive(Serialize)]
struct EmbeddedMessage<'a> {
    id: i64,
    text: &'a str,
    pub_date: i64,
    author: EmbeddedAuthor<'a>,
}

#[derive(Serialize)]
struct EmbeddedAuthor<'a> {
    id: i64,
    name: &'a str,
    gravatar_url: String,
    profile_path: String,
}

impl<'a> From<&'a TimelineEntry> for EmbeddedMessage<'a> {
    fn from(e: &'a TimelineEntry) -> Self {
        Self {
            id: e.message.id,
            text: &e.message.text,
            pub_date: e.message.pub_date,
            author: EmbeddedAuthor {
                id: e.user.id,
                name: &e.user.name,
                gravatar_url: e.user.gravatar_url(48),
                profile_path: e.user.profile_path(),
            },
        }
    }
}

/// JSON for a raw `<script>` element, so no literal `<` may survive.
fn embed_json(entries: &[TimelineEntry]) -> Result<String, AppError> {
    let messages: Vec<EmbeddedMessage<'_>> = entries.iter().map(EmbeddedMessage::from).collect();
    let json = serde_json::to_string(&messages).context("serialize timeline")?;
    Ok(json.replace('<', "\\u003c"))
}

#[derive(Template)]
#[template(path = "timeline.html")]
pub struct TimelinePage {
    pub page: PageContext,
    pub title: String,
    pub timeline: Timeline,
    /// Owner of a user timeline, or the viewer on their own timeline.
    pub profile_name: String,
    pub profile_path: String,
    pub show_follow: bool,
    pub followed: bool,
    pub show_composer: bool,
    pub data_json: String,
}

impl TimelinePage {
    pub async fn new(auth: &Auth, timeline: Timeline, followed: bool) -> Result<Self, AppError> {
        let (profile_name, profile_path) = timeline
            .user
            .as_ref()
            .map(|u| (u.name.clone(), u.profile_path()))
            .unwrap_or_default();
        let is_own = match (&auth.user, &timeline.user) {
            (Some(viewer), Some(owner)) => viewer.id == owner.id,
            _ => false,
        };

        let (title, show_follow, show_composer) = match timeline.kind {
            TimelineKind::Public => ("Public Timeline".to_string(), false, false),
            TimelineKind::Following => ("My Timeline".to_string(), false, true),
            TimelineKind::User => (
                format!("{profile_name}'s Timeline"),
                auth.authorized() && !is_own,
                false,
            ),
        };

        let data_json = embed_json(&timeline.entries)?;

        Ok(Self {
            page: PageContext::new(auth).await?,
            title,
            timeline,
            profile_name,
            profile_path,
            show_follow,
            followed,
            show_composer,
            data_json,
        })
    }
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub page: PageContext,
    pub error: Option<String>,
}

impl LoginPage {
    pub async fn new(auth: &Auth, error: Option<String>) -> Result<Self, AppError> {
        Ok(Self {
            page: PageContext::new(auth).await?,
            error,
        })
    }
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterPage {
    pub page: PageContext,
    pub error: Option<String>,
}

impl RegisterPage {
    pub async fn new(auth: &Auth, error: Option<String>) -> Result<Self, AppError> {
        Ok(Self {
            page: PageContext::new(auth).await?,
            error,
        })
    }
}

pub fn render(template: &impl Template) -> Result<Response, AppError> {
    Ok(Html(template.render()?).into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::{MemoryStore, Session};

    use super::*;
    use crate::messages::Message;
    use crate::users::{User, UserSummary};

    fn auth_as(user: Option<User>) -> Auth {
        Auth {
            session: Session::new(None, Arc::new(MemoryStore::default()), None),
            user,
        }
    }

    fn user(id: i64, name: &str) -> User {
        User {
            id,
            name: name.into(),
            email: format!("{name}@x.com"),
            pw_hash: String::new(),
        }
    }

    fn timeline_of(owner: &User, text: &str) -> Timeline {
        Timeline {
            kind: TimelineKind::User,
            entries: vec![TimelineEntry {
                message: Message {
                    id: 1,
                    user_id: owner.id,
                    text: text.into(),
                    pub_date: 0,
                },
                user: UserSummary::from(owner),
            }],
            user: Some(UserSummary::from(owner)),
        }
    }

    #[tokio::test]
    async fn user_timeline_offers_follow_only_to_other_viewers() {
        let bob = user(2, "bob");

        let page = TimelinePage::new(&auth_as(None), timeline_of(&bob, "x"), false).await.unwrap();
        assert!(!page.show_follow);
        assert_eq!(page.title, "bob's Timeline");

        let viewer = auth_as(Some(user(1, "al")));
        let page = TimelinePage::new(&viewer, timeline_of(&bob, "x"), true).await.unwrap();
        assert!(page.show_follow);
        let html = page.render().unwrap();
        assert!(html.contains("Unfollow user"));

        let owner = auth_as(Some(bob.clone()));
        let page = TimelinePage::new(&owner, timeline_of(&bob, "x"), false).await.unwrap();
        assert!(!page.show_follow);
    }

    #[tokio::test]
    async fn message_text_is_escaped_everywhere() {
        let eve = user(3, "eve");
        let timeline = timeline_of(&eve, "<script>alert(1)</script>");
        let page = TimelinePage::new(&auth_as(None), timeline, false).await.unwrap();
        assert!(!page.data_json.contains("</script>"));
        let html = page.render().unwrap();
        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn embedded_json_has_no_email() {
        let frank = user(4, "frank");
        let page = TimelinePage::new(&auth_as(None), timeline_of(&frank, "hi"), false)
            .await
            .unwrap();
        assert!(!page.data_json.contains("frank@x.com"));
        assert!(page.data_json.contains(r#""name":"frank""#));
        assert!(page.data_json.contains("gravatar.com/avatar/"));
    }

    #[tokio::test]
    async fn flashes_render_once() {
        let auth = auth_as(None);
        session::flash(&auth.session, "You were logged out").await.unwrap();
        let html = LoginPage::new(&auth, None).await.unwrap().render().unwrap();
        assert!(html.contains("You were logged out"));
        let html = LoginPage::new(&auth, Some("Invalid name".into()))
            .await
            .unwrap()
            .render()
            .unwrap();
        assert!(!html.contains("You were logged out"));
        assert!(html.contains("Invalid name"));
    }
}
