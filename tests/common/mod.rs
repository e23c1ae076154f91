#![allow(dead_code)]

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use melotiket_server::db::models::{Event, Profile, RecordId, Role, Ticket, User};
use melotiket_server::{AppState, Settings};
use serde_json::{json, Value};
use std::sync::Arc;

/// Builds the full application over `$state` the same way the binary does.
macro_rules! init_app {
    ($state:expr) => {{
        let state: &melotiket_server::AppState = &$state;
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(melotiket_server::auth::RouteGuardLayer::new(state.guard.clone()))
                .app_data(actix_web::web::Data::new(state.clone()))
                .configure(melotiket_server::routes::configure(state.rate_limiter.clone())),
        )
        .await
    }};
}

pub fn test_state() -> AppState {
    let config = Settings::new_for_test().expect("Failed to load test config");
    AppState::with_store(config, Arc::new(melotiket_server::MemoryStore::new()))
}

pub fn registration(email: &str) -> Value {
    json!({
        "email": email,
        "password": "password123",
        "confirmPassword": "password123",
        "name": "Test User",
        "idNumber": "3174012345678901"
    })
}

/// Session cookies set by a response, ready to be sent back.
pub fn session_cookies<B>(resp: &ServiceResponse<B>) -> Vec<Cookie<'static>> {
    resp.response()
        .cookies()
        .map(|cookie| cookie.into_owned())
        .collect()
}

pub fn find_cookie<'a>(cookies: &'a [Cookie<'static>], name: &str) -> &'a Cookie<'static> {
    cookies
        .iter()
        .find(|cookie| cookie.name() == name)
        .unwrap_or_else(|| panic!("cookie {} not set", name))
}

/// Creates an active user directly in the store.
pub async fn seed_user(state: &AppState, email: &str, role: Role) -> User {
    let hash = melotiket_server::auth::service::hash_password("password123").unwrap();
    let user = User::new(
        email.to_string(),
        hash,
        "Seeded User".into(),
        role,
        Profile::default(),
        "3174012345678901".into(),
    );
    state.store.create_user(&user).await.unwrap()
}

/// Cookies of a signed-in session for `user`, minted without going through
/// the login endpoint.
pub fn cookies_for(state: &AppState, user: &User) -> Vec<Cookie<'static>> {
    let tokens = state
        .auth_service
        .codec()
        .issue_pair(&user.id, user.role)
        .unwrap();
    state
        .cookies
        .session_cookies(&tokens, &melotiket_server::auth::UserHint::from(user))
}

/// One event with a single ticket type.
pub async fn seed_ticket(state: &AppState, price: i64, stock: i64) -> Ticket {
    let now = chrono::Utc::now();
    let event = Event {
        id: RecordId::new(),
        name: "Java Jazz".into(),
        description: Some("Three nights of jazz".into()),
        location: "JIExpo Kemayoran".into(),
        date: now + chrono::Duration::days(30),
        category_id: None,
        image_url: None,
        created_at: now,
        updated_at: now,
    };
    state.store.create_event(&event).await.unwrap();

    let ticket = Ticket {
        id: RecordId::new(),
        event_id: event.id,
        name: "Daily Pass".into(),
        price,
        stock,
        created_at: now,
        updated_at: now,
    };
    state.store.create_ticket(&ticket).await.unwrap()
}
