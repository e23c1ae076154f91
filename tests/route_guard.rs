#[macro_use]
mod common;

use actix_web::cookie::Cookie;
use actix_web::http::{header, StatusCode};
use actix_web::test;
use common::{cookies_for, seed_user, test_state};
use melotiket_server::auth::cookies::UserHint;
use melotiket_server::db::models::Role;
use serde_json::Value;

fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

fn get(uri: &str, cookies: &[Cookie<'static>]) -> test::TestRequest {
    cookies
        .iter()
        .cloned()
        .fold(test::TestRequest::get().uri(uri), |req, cookie| req.cookie(cookie))
}

#[actix_web::test]
async fn test_anonymous_profile_redirects_to_login() {
    let state = test_state();
    let app = init_app!(state);

    for uri in ["/user/profile", "/user/profile/history", "/admin/dashboard/summary"] {
        let resp = get(uri, &[]).send_request(&app).await;
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT, "{}", uri);
        assert_eq!(location(&resp), "/auth/login");
    }
}

#[actix_web::test]
async fn test_public_pages_are_not_guarded() {
    let state = test_state();
    let app = init_app!(state);

    let resp = get("/events", &[]).send_request(&app).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Shares a prefix with /admin but is a different segment
    let resp = get("/administrator", &[]).send_request(&app).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_garbage_token_counts_as_signed_out() {
    let state = test_state();
    let app = init_app!(state);

    let resp = get("/user/profile", &[Cookie::new("accessToken", "garbage")])
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/auth/login");
}

#[actix_web::test]
async fn test_signed_in_user_sees_profile() {
    let state = test_state();
    let app = init_app!(state);
    let user = seed_user(&state, "member@example.com", Role::User).await;

    let resp = get("/user/profile", &cookies_for(&state, &user))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["email"], "member@example.com");
}

#[actix_web::test]
async fn test_regular_user_is_sent_home_from_admin() {
    let state = test_state();
    let app = init_app!(state);
    let user = seed_user(&state, "member@example.com", Role::User).await;

    let resp = get("/admin/dashboard/summary", &cookies_for(&state, &user))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/");
}

#[actix_web::test]
async fn test_elevated_roles_reach_admin() {
    let state = test_state();
    let app = init_app!(state);

    for (email, role) in [
        ("super@example.com", Role::Superadmin),
        ("admin@example.com", Role::Admin),
        ("operator@example.com", Role::Operator),
    ] {
        let user = seed_user(&state, email, role).await;
        let resp = get("/admin/dashboard/summary", &cookies_for(&state, &user))
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), StatusCode::OK, "{}", role);
    }
}

#[actix_web::test]
async fn test_forged_role_cookie_is_ignored() {
    let state = test_state();
    let app = init_app!(state);
    let user = seed_user(&state, "member@example.com", Role::User).await;

    let forged = serde_json::to_string(&UserHint {
        id: Some(user.id.clone()),
        name: Some(user.name.clone()),
        email: Some(user.email.clone()),
        role: Role::Superadmin,
    })
    .unwrap();
    let cookies: Vec<_> = cookies_for(&state, &user)
        .into_iter()
        .map(|cookie| {
            if cookie.name() == "user" {
                Cookie::new("user", forged.clone())
            } else {
                cookie
            }
        })
        .collect();

    let resp = get("/admin/users", &cookies).send_request(&app).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/");
}

#[actix_web::test]
async fn test_checkout_requires_session_as_json() {
    let state = test_state();
    let app = init_app!(state);

    let resp = test::TestRequest::post()
        .uri("/transactions")
        .set_json(serde_json::json!({}))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["message"], "Authentication required");
}
