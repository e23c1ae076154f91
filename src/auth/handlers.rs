use actix_web::cookie::Cookie;
use actix_web::{web, HttpRequest, HttpResponse, HttpResponseBuilder, ResponseError};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::auth::cookies::{CookiePolicy, UserHint, REFRESH_TOKEN_COOKIE};
use crate::auth::guard::AuthenticatedUser;
use crate::auth::service::Session;
use crate::db::models::Role;
use crate::error::{AppError, AuthError};
use crate::handlers::envelope;
use crate::validation;
use crate::{AppState, Result};

fn with_session(
    mut builder: HttpResponseBuilder,
    state: &AppState,
    session: &Session,
    message: &str,
) -> HttpResponse {
    let cookies = state
        .cookies
        .session_cookies(&session.tokens, &UserHint::from(&session.user));
    CookiePolicy::apply(&mut builder, cookies);
    builder.json(envelope(&session.user, message))
}

fn with_cleared_cookies(mut response: HttpResponse, cookies: Vec<Cookie<'static>>) -> HttpResponse {
    for cookie in &cookies {
        if let Err(e) = response.add_cookie(cookie) {
            error!(error = %e, cookie = cookie.name(), "Failed to clear cookie");
        }
    }
    response
}

pub async fn login(body: web::Json<Value>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let input = validation::auth::login(&body)?;
    info!(email = %input.email, "Received login request");

    match state.auth_service.login(&input).await {
        Ok(session) => Ok(with_session(HttpResponse::Ok(), &state, &session, "Login successful")),
        Err(e) => {
            warn!(email = %input.email, error = %e, "Login failed");
            Err(e)
        }
    }
}

/// Public sign-up. Only user managers may ask for a role other than `user`;
/// when one does, the account is created without touching the caller's
/// session.
pub async fn register(
    body: web::Json<Value>,
    caller: Option<AuthenticatedUser>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let registration = validation::auth::register(&body)?;
    let on_behalf = caller.filter(|c| c.role.can_manage_users());

    if registration.role != Role::User && on_behalf.is_none() {
        warn!(email = %registration.email, role = %registration.role, "Rejected elevated self-registration");
        return Err(AuthError::Forbidden.into());
    }

    let user = state.auth_service.register(registration).await?;

    if on_behalf.is_some() {
        return Ok(HttpResponse::Created().json(envelope(&user, "Registration successful")));
    }

    let tokens = state.auth_service.codec().issue_pair(&user.id, user.role)?;
    let session = Session { user, tokens };
    Ok(with_session(HttpResponse::Created(), &state, &session, "Registration successful"))
}

pub async fn logout(state: web::Data<AppState>) -> HttpResponse {
    let mut builder = HttpResponse::Ok();
    CookiePolicy::apply(&mut builder, state.cookies.cleared_cookies());
    builder.json(envelope(Value::Null, "Logout successful"))
}

/// Rotates both tokens. Any failure also clears the session cookies so the
/// browser does not keep retrying with a dead refresh token.
pub async fn refresh(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let result = match req.cookie(REFRESH_TOKEN_COOKIE) {
        Some(cookie) => state.auth_service.refresh(cookie.value()).await,
        None => Err(AppError::AuthError(AuthError::MissingToken)),
    };

    match result {
        Ok(session) => with_session(HttpResponse::Ok(), &state, &session, "Token refreshed"),
        Err(e) => {
            warn!(error = %e, "Refresh rejected");
            with_cleared_cookies(e.error_response(), state.cookies.cleared_cookies())
        }
    }
}
