//! Router-level tests: the full middleware pipeline against an in-memory
//! database, driven request by request with a small cookie-keeping client.

use crate::config::Config;
use crate::db;
use crate::routes::{self, SESSION_COOKIE_NAME};
use crate::state::AppState;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    routing::get,
    Router,
};
use http_body_util::BodyExt;
use regex::Regex;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tower::ServiceExt;
use tower_sessions::cookie::{Cookie, SameSite};
use tower_sessions_sqlx_store::SqliteStore;

fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        static_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/ui/static")),
        cookie_secure: true,
        request_timeout: Duration::from_secs(10),
    }
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl TestResponse {
    fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    fn location(&self) -> Option<&str> {
        self.header(header::LOCATION)
    }

    /// The `Set-Cookie` entry for `name`, if this response sets it
    fn set_cookie(&self, name: &str) -> Option<Cookie<'static>> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| Cookie::parse(value.to_str().ok()?.to_string()).ok())
            .find(|cookie| cookie.name() == name)
    }

    /// Masked CSRF token embedded in the page's forms
    fn csrf_token(&self) -> String {
        let rx = Regex::new(r#"name="csrf_token" value="([^"]+)""#).unwrap();
        rx.captures(&self.body)
            .map(|captures| captures[1].to_string())
            .unwrap_or_else(|| panic!("no CSRF token in page:\n{}", self.body))
    }

    fn assert_security_headers(&self) {
        for name in [
            header::CONTENT_SECURITY_POLICY,
            header::REFERRER_POLICY,
            header::X_CONTENT_TYPE_OPTIONS,
            header::X_FRAME_OPTIONS,
            header::X_XSS_PROTECTION,
        ] {
            assert!(
                self.headers.contains_key(&name),
                "missing {} on {} response",
                name,
                self.status
            );
        }
    }
}

/// Minimal browser: sends back every cookie it was given
struct TestClient {
    router: Router,
    cookies: HashMap<String, String>,
}

impl TestClient {
    fn new(router: Router) -> Self {
        TestClient {
            router,
            cookies: HashMap::new(),
        }
    }

    async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = serde_urlencoded::to_string(fields).unwrap();
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn send(&mut self, method: Method, uri: &str, form: Option<String>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if !self.cookies.is_empty() {
            let cookie_header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, cookie_header);
        }
        let body = match form {
            Some(form) => {
                builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
                Body::from(form)
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        for value in response.headers().get_all(header::SET_COOKIE) {
            let cookie = Cookie::parse(value.to_str().unwrap().to_string()).unwrap();
            let expired = cookie
                .max_age()
                .is_some_and(|max_age| max_age.is_zero() || max_age.is_negative());
            if expired {
                self.cookies.remove(cookie.name());
            } else {
                self.cookies
                    .insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    /// Sign up and log in, leaving the client with an authenticated session
    async fn signup_and_login(&mut self, email: &str) {
        let token = self.get("/user/signup").await.csrf_token();
        let response = self
            .post_form(
                "/user/signup",
                &[
                    ("name", "Alice"),
                    ("email", email),
                    ("password", "pa$$word"),
                    ("csrf_token", &token),
                ],
            )
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        assert_eq!(response.location(), Some("/user/login"));

        let response = self
            .post_form(
                "/user/login",
                &[
                    ("email", email),
                    ("password", "pa$$word"),
                    ("csrf_token", &token),
                ],
            )
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        assert_eq!(response.location(), Some("/snippet/create"));
    }
}

async fn test_app() -> (TestClient, SqlitePool) {
    let pool = db::test_pool().await;
    let store = SqliteStore::new(pool.clone());
    store.migrate().await.unwrap();

    let router = routes::routes(AppState::new(pool.clone(), test_config()), store);
    (TestClient::new(router), pool)
}

async fn snippet_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM snippets")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn ping_answers_ok_with_security_headers() {
    let (mut client, _) = test_app().await;

    let response = client.get("/ping").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "OK");
    response.assert_security_headers();
}

#[tokio::test]
async fn home_page_renders_and_issues_csrf_cookie() {
    let (mut client, pool) = test_app().await;
    db::snippets::insert(&pool, "First <snippet>", "content", 7)
        .await
        .unwrap();

    let response = client.get("/").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("First &lt;snippet&gt;"));
    response.assert_security_headers();

    let set_cookie: Vec<_> = response
        .headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect();
    let csrf_cookie = set_cookie
        .iter()
        .find(|value| value.starts_with("csrf_token="))
        .expect("CSRF base cookie issued");
    assert!(csrf_cookie.contains("HttpOnly"));
    assert!(csrf_cookie.contains("Secure"));
    assert!(csrf_cookie.contains("Path=/"));
}

#[tokio::test]
async fn unmatched_route_is_not_found_with_security_headers() {
    let (mut client, _) = test_app().await;

    let response = client.get("/no/such/page").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    response.assert_security_headers();
}

#[tokio::test]
async fn static_files_are_served_and_missing_ones_are_not_found() {
    let (mut client, _) = test_app().await;

    let response = client.get("/static/css/main.css").await;
    assert_eq!(response.status, StatusCode::OK);
    response.assert_security_headers();

    let response = client.get("/static/missing-file").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    response.assert_security_headers();
    assert!(!client.cookies.contains_key(SESSION_COOKIE_NAME));
    assert!(!client.cookies.contains_key("csrf_token"));
}

#[tokio::test]
async fn snippet_view_rejects_bad_and_unknown_ids() {
    let (mut client, pool) = test_app().await;
    let id = db::snippets::insert(&pool, "Visible", "Body text", 1)
        .await
        .unwrap();

    let response = client.get(&format!("/snippet/view/{}", id)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Body text"));

    for uri in ["/snippet/view/0", "/snippet/view/-1", "/snippet/view/abc", "/snippet/view/99"] {
        let response = client.get(uri).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{}", uri);
        response.assert_security_headers();
    }
}

#[tokio::test]
async fn protected_routes_redirect_anonymous_users_to_login() {
    let (mut client, _) = test_app().await;

    let response = client.get("/snippet/create").await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/login"));
    response.assert_security_headers();
}

#[tokio::test]
async fn anonymous_post_with_valid_token_still_redirects_to_login() {
    let (mut client, pool) = test_app().await;
    // The logged-out home page has no forms; the login page does
    let token = client.get("/user/login").await.csrf_token();

    let response = client
        .post_form(
            "/snippet/create",
            &[
                ("title", "t"),
                ("content", "c"),
                ("expires", "7"),
                ("csrf_token", &token),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/login"));
    assert_eq!(snippet_count(&pool).await, 0);
}

#[tokio::test]
async fn csrf_protected_posts_without_token_are_rejected() {
    let (mut client, pool) = test_app().await;
    client.signup_and_login("alice@example.com").await;

    let response = client
        .post_form(
            "/snippet/create",
            &[("title", "t"), ("content", "c"), ("expires", "7")],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(snippet_count(&pool).await, 0);

    let response = client
        .post_form("/snippet/create", &[("title", "t"), ("csrf_token", "forged")])
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = client.post_form("/user/logout", &[]).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    // Still logged in: the rejected logout never reached its handler
    let response = client.get("/snippet/create").await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn post_without_csrf_cookie_is_rejected() {
    let (mut client, _) = test_app().await;
    let token = client.get("/user/login").await.csrf_token();
    client.cookies.remove("csrf_token");

    let response = client
        .post_form(
            "/user/login",
            &[("email", "a@example.com"), ("password", "x"), ("csrf_token", &token)],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    // A new base cookie is issued for the next attempt
    assert!(client.cookies.contains_key("csrf_token"));
}

#[tokio::test]
async fn authenticated_user_creates_and_views_snippet() {
    let (mut client, pool) = test_app().await;
    client.signup_and_login("alice@example.com").await;

    let form = client.get("/snippet/create").await;
    assert_eq!(form.status, StatusCode::OK);
    assert_eq!(form.header(header::CACHE_CONTROL), Some("no-store"));
    assert!(form.body.contains("action=\"/user/logout\""));

    let response = client
        .post_form(
            "/snippet/create",
            &[
                ("title", "O snail"),
                ("content", "Climb Mount Fuji,\nBut slowly, slowly!"),
                ("expires", "7"),
                ("csrf_token", &form.csrf_token()),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let location = response.location().unwrap().to_string();
    assert!(location.starts_with("/snippet/view/"));
    assert_eq!(snippet_count(&pool).await, 1);

    let page = client.get(&location).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("O snail"));
    assert!(page.body.contains("Snippet successfully created!"));

    // The flash message is shown only once
    let page = client.get(&location).await;
    assert!(!page.body.contains("Snippet successfully created!"));
}

#[tokio::test]
async fn invalid_snippet_form_is_rerendered() {
    let (mut client, pool) = test_app().await;
    client.signup_and_login("alice@example.com").await;
    let token = client.get("/snippet/create").await.csrf_token();

    let response = client
        .post_form(
            "/snippet/create",
            &[
                ("title", ""),
                ("content", "kept"),
                ("expires", "30"),
                ("csrf_token", &token),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("This field cannot be blank"));
    assert!(response.body.contains("This field must equal 1, 7 or 365"));
    assert!(response.body.contains(">kept</textarea>"));
    assert_eq!(snippet_count(&pool).await, 0);

    let response = client
        .post_form(
            "/snippet/create",
            &[("title", "t"), ("content", "c"), ("expires", "soon"), ("csrf_token", &token)],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_shows_generic_error() {
    let (mut client, _) = test_app().await;
    client.signup_and_login("alice@example.com").await;

    let mut other = TestClient::new(client.router.clone());
    let token = other.get("/user/login").await.csrf_token();
    let response = other
        .post_form(
            "/user/login",
            &[
                ("email", "alice@example.com"),
                ("password", "not-the-password"),
                ("csrf_token", &token),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Email or password is incorrect"));
    assert_eq!(other.get("/snippet/create").await.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn duplicate_signup_is_reported_on_the_email_field() {
    let (mut client, _) = test_app().await;
    client.signup_and_login("alice@example.com").await;

    let mut other = TestClient::new(client.router.clone());
    let token = other.get("/user/signup").await.csrf_token();
    let response = other
        .post_form(
            "/user/signup",
            &[
                ("name", "Impostor"),
                ("email", "alice@example.com"),
                ("password", "another-password"),
                ("csrf_token", &token),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Email address is already in use"));
    assert!(response.body.contains("value=\"Impostor\""));
}

#[tokio::test]
async fn logout_ends_the_authenticated_session() {
    let (mut client, _) = test_app().await;
    client.signup_and_login("alice@example.com").await;
    let token = client.get("/snippet/create").await.csrf_token();

    let response = client
        .post_form("/user/logout", &[("csrf_token", &token)])
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/"));

    let home = client.get("/").await;
    assert!(home.body.contains("You&#39;ve been logged out successfully!"));
    assert!(home.body.contains("href=\"/user/login\""));

    let response = client.get("/snippet/create").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/login"));
}

#[tokio::test]
async fn deleted_user_loses_access_but_session_value_is_kept() {
    let (mut client, pool) = test_app().await;
    client.signup_and_login("alice@example.com").await;

    let (id, name, email, hashed_password, created): (i64, String, String, String, String) =
        sqlx::query_as("SELECT id, name, email, hashed_password, created FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();

    // Checked again on every request, redirected each time
    for _ in 0..2 {
        let response = client.get("/snippet/create").await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        assert_eq!(response.location(), Some("/user/login"));
    }

    // Restoring the row restores access: the session still holds the id
    sqlx::query(
        "INSERT INTO users (id, name, email, hashed_password, created) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(hashed_password)
    .bind(created)
    .execute(&pool)
    .await
    .unwrap();

    let response = client.get("/snippet/create").await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn session_cookie_attributes_and_id_renewal() {
    let (mut client, _) = test_app().await;
    let token = client.get("/user/signup").await.csrf_token();

    // The signup flash is the first thing stored, so it creates the session
    let response = client
        .post_form(
            "/user/signup",
            &[
                ("name", "Alice"),
                ("email", "alice@example.com"),
                ("password", "pa$$word"),
                ("csrf_token", &token),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let cookie = response
        .set_cookie(SESSION_COOKIE_NAME)
        .expect("session cookie issued");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.max_age(), Some(time::Duration::hours(12)));
    let signup_id = cookie.value().to_string();

    let response = client
        .post_form(
            "/user/login",
            &[
                ("email", "alice@example.com"),
                ("password", "pa$$word"),
                ("csrf_token", &token),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let cookie = response
        .set_cookie(SESSION_COOKIE_NAME)
        .expect("session cookie reissued on login");
    assert_eq!(cookie.max_age(), Some(time::Duration::hours(12)));
    let login_id = cookie.value().to_string();
    assert_ne!(login_id, signup_id);

    let token = client.get("/snippet/create").await.csrf_token();
    let response = client
        .post_form("/user/logout", &[("csrf_token", &token)])
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let cookie = response
        .set_cookie(SESSION_COOKIE_NAME)
        .expect("session cookie reissued on logout");
    assert_eq!(cookie.max_age(), Some(time::Duration::hours(12)));
    assert_ne!(cookie.value(), login_id);
    assert_ne!(cookie.value(), signup_id);
}

#[tokio::test]
async fn failed_user_lookup_stops_the_chain_with_500() {
    let (mut client, pool) = test_app().await;
    client.signup_and_login("alice@example.com").await;

    sqlx::query("DROP TABLE users").execute(&pool).await.unwrap();

    for uri in ["/", "/snippet/create"] {
        let response = client.get(uri).await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
        assert_eq!(response.body, "Internal Server Error", "{}", uri);
        response.assert_security_headers();
    }
}

async fn exploding_handler() -> &'static str {
    panic!("handler exploded")
}

#[tokio::test]
async fn panic_in_handler_becomes_500_and_server_keeps_serving() {
    let router = Router::new()
        .route("/boom", get(exploding_handler))
        .route("/fine", get(|| async { "still here" }));
    let mut client = TestClient::new(routes::standard_chain(router, Duration::from_secs(10)));

    let response = client.get("/boom").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.header(header::CONNECTION), Some("close"));
    assert_eq!(response.body, "Internal Server Error");
    response.assert_security_headers();

    let response = client.get("/fine").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "still here");
}

async fn slow_handler() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "too late"
}

#[tokio::test]
async fn slow_request_times_out_with_408() {
    let router = Router::new().route("/slow", get(slow_handler));
    let mut client = TestClient::new(routes::standard_chain(router, Duration::from_millis(50)));

    let response = client.get("/slow").await;

    assert_eq!(response.status, StatusCode::REQUEST_TIMEOUT);
    response.assert_security_headers();
}
