use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::{routes, session, state::AppState};

pub fn build_app<S: SessionStore + Clone>(state: AppState, sessions: S) -> Router {
    let session_layer = session::layer(sessions, &state.config.session);
    Router::new()
        .merge(routes::router())
        .layer(session_layer)
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;

    /// Replays the session cookie between requests like a browser would.
    struct Client {
        app: Router,
        cookie: Option<String>,
    }

    impl Client {
        fn new() -> Self {
            Self {
                app: build_app(AppState::fake(), MemoryStore::default()),
                cookie: None,
            }
        }

        async fn send(&mut self, req: axum::http::request::Builder, body: Body) -> Response {
            let req = match &self.cookie {
                Some(c) => req.header(header::COOKIE, c),
                None => req,
            };
            let res = self.app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
            if let Some(set) = res.headers().get(header::SET_COOKIE) {
                let pair = set.to_str().unwrap().split(';').next().unwrap().to_string();
                self.cookie = if pair.ends_with('=') { None } else { Some(pair) };
            }
            res
        }

        async fn get(&mut self, uri: &str) -> Response {
            self.send(Request::get(uri), Body::empty()).await
        }

        async fn post(&mut self, uri: &str, form: &str) -> Response {
            let req = Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
            self.send(req, Body::from(form.to_string())).await
        }

        async fn register(&mut self, name: &str) -> Response {
            let form = format!("name={name}&email={name}%40x.com&password=pw&password2=pw");
            self.post("/register", &form).await
        }
    }

    async fn text(res: Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(res: &Response) -> &str {
        res.headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn health_check() {
        let res = Client::new().get("/health").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(text(res).await, "ok");
    }

    #[tokio::test]
    async fn anonymous_home_redirects_to_public() {
        let res = Client::new().get("/").await;
        assert!(res.status().is_redirection());
        assert_eq!(location(&res), "/public");
    }

    #[tokio::test]
    async fn register_post_and_read_back() {
        let mut alice = Client::new();
        let res = alice.register("alice").await;
        assert!(res.status().is_redirection());
        assert_eq!(location(&res), "/");

        let home = text(alice.get("/").await).await;
        assert!(home.contains("You were successfully registered"));
        assert!(home.contains("My Timeline"));

        alice.get("/logout").await;
        let res = alice.post("/login", "name=alice&password=pw").await;
        assert_eq!(location(&res), "/");

        let res = alice.post("/add_message", "text=hello+world").await;
        assert_eq!(location(&res), "/");
        let home = text(alice.get("/").await).await;
        assert!(home.contains("Your message was recorded"));

        // Fresh client, same app.
        let mut anon = Client {
            app: alice.app.clone(),
            cookie: None,
        };
        let page = text(anon.get("/alice").await).await;
        assert_eq!(page.matches("class=\"text\">hello world<").count(), 1);
        assert!(!page.contains("Follow user"));
    }

    #[tokio::test]
    async fn empty_message_is_ignored() {
        let mut c = Client::new();
        c.register("quiet").await;
        c.get("/").await;
        let res = c.post("/add_message", "text=").await;
        assert!(res.status().is_redirection());
        let page = text(c.get("/quiet").await).await;
        assert!(!page.contains("class=\"text\">"));
    }

    #[tokio::test]
    async fn follow_and_unfollow_change_the_home_timeline() {
        let mut a = Client::new();
        let mut b = Client {
            app: a.app.clone(),
            cookie: None,
        };
        a.register("ann").await;
        b.register("ben").await;
        b.post("/add_message", "text=hi+from+ben").await;

        let res = a.get("/ben/follow").await;
        assert_eq!(location(&res), "/ben");
        let page = text(a.get("/ben").await).await;
        assert!(page.contains("You are now following &quot;ben&quot;")
            || page.contains("You are now following &#34;ben&#34;"));
        assert!(page.contains("Unfollow user"));
        assert!(text(a.get("/").await).await.contains("hi from ben"));

        a.get("/ben/unfollow").await;
        assert!(!text(a.get("/").await).await.contains("hi from ben"));
    }

    #[tokio::test]
    async fn anonymous_follow_is_unauthorized() {
        let mut c = Client::new();
        c.register("target").await;
        let mut anon = Client {
            app: c.app.clone(),
            cookie: None,
        };
        let res = anon.get("/target/follow").await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let res = anon.post("/add_message", "text=nope").await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let mut c = Client::new();
        assert_eq!(c.get("/nobody").await.status(), StatusCode::NOT_FOUND);
        c.register("someone").await;
        assert_eq!(c.get("/nobody/follow").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn login_logout_cycle() {
        let mut c = Client::new();
        c.register("carl").await;
        let res = c.get("/logout").await;
        assert_eq!(location(&res), "/public");
        assert!(text(c.get("/public").await).await.contains("You were logged out"));
        assert_eq!(location(&c.get("/").await), "/public");

        let page = text(c.post("/login", "name=carl&password=wrong").await).await;
        assert!(page.contains("Invalid password"));
        let page = text(c.post("/login", "name=karl&password=pw").await).await;
        assert!(page.contains("Invalid name"));

        let res = c.post("/login", "name=carl&password=pw").await;
        assert_eq!(location(&res), "/");
        assert!(text(c.get("/").await).await.contains("You were logged in"));
    }

    #[tokio::test]
    async fn registration_errors_are_shown() {
        let mut c = Client::new();
        c.register("dup").await;
        c.get("/logout").await;

        let page = text(c.register("dup").await).await;
        assert!(page.contains("The name is already taken"));

        let page = text(
            c.post("/register", "name=x&email=x%40x.com&password=a&password2=b")
                .await,
        )
        .await;
        assert!(page.contains("The two passwords do not match"));

        let page = text(c.post("/register", "name=y&email=nope&password=a&password2=a").await).await;
        assert!(page.contains("E-mail address is invalid"));
    }

    #[tokio::test]
    async fn public_page_does_not_publish_emails() {
        let mut c = Client::new();
        c.post(
            "/register",
            "name=priv&email=secret.alice%40corp.example&password=pw&password2=pw",
        )
        .await;
        c.post("/add_message", "text=visible+text").await;

        let mut anon = Client {
            app: c.app.clone(),
            cookie: None,
        };
        let page = text(anon.get("/public").await).await;
        assert!(page.contains("visible text"));
        assert!(!page.contains("secret.alice"));
        assert!(!page.contains("corp.example"));
        let page = text(anon.get("/priv").await).await;
        assert!(!page.contains("corp.example"));
    }

    #[tokio::test]
    async fn logged_in_users_skip_login_and_register() {
        let mut c = Client::new();
        c.register("gina").await;
        c.get("/").await;

        for uri in ["/login", "/register"] {
            let res = c.get(uri).await;
            assert!(res.status().is_redirection(), "GET {uri}");
            assert_eq!(location(&res), "/");
        }
        let res = c.post("/login", "name=gina&password=wrong").await;
        assert_eq!(location(&res), "/");
        let res = c
            .post("/register", "name=other&email=o%40x.com&password=pw&password2=pw")
            .await;
        assert_eq!(location(&res), "/");

        // Nothing was registered by the redirected POST.
        let mut anon = Client {
            app: c.app.clone(),
            cookie: None,
        };
        assert_eq!(anon.get("/other").await.status(), StatusCode::NOT_FOUND);
    }
}
