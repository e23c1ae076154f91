//! Route protection.
//!
//! [`RouteGuard`] decides, per request, whether a page under a protected
//! prefix may be served or the browser has to be sent elsewhere.
//! [`RouteGuardLayer`] runs it in front of the app. JSON endpoints outside
//! the protected prefixes use the [`AuthenticatedUser`] extractor instead.

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{web, Error, FromRequest, HttpRequest, HttpResponse};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::cookies::{parse_user_hint, ACCESS_TOKEN_COOKIE, USER_COOKIE};
use crate::auth::token::{Claims, TokenCodec, TokenKind};
use crate::db::models::{RecordId, Role};
use crate::error::{AppError, AuthError};
use crate::AppState;

#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub protected_prefixes: Vec<String>,
    pub exempt_prefixes: Vec<String>,
    pub admin_prefix: String,
    pub login_path: String,
    pub fallback_path: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            protected_prefixes: vec!["/user/profile".into(), "/admin".into()],
            exempt_prefixes: vec!["/auth".into()],
            admin_prefix: "/admin".into(),
            login_path: "/auth/login".into(),
            fallback_path: "/".into(),
        }
    }
}

/// `/admin` matches `/admin` and `/admin/...` but not `/administrator`.
pub fn path_has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

pub struct RouteGuard {
    config: GuardConfig,
    codec: TokenCodec,
}

impl RouteGuard {
    pub fn new(config: GuardConfig, codec: TokenCodec) -> Self {
        Self { config, codec }
    }

    /// Whether the middleware should evaluate `path` at all.
    pub fn covers(&self, path: &str) -> bool {
        self.config
            .protected_prefixes
            .iter()
            .any(|prefix| path_has_prefix(path, prefix))
    }

    pub fn evaluate(
        &self,
        path: &str,
        access_token: Option<&str>,
        user_cookie: Option<&str>,
    ) -> GuardDecision {
        if self
            .config
            .exempt_prefixes
            .iter()
            .any(|prefix| path_has_prefix(path, prefix))
        {
            return GuardDecision::Allow;
        }

        // An unverifiable token counts as no token
        let claims = match access_token.map(|token| self.codec.verify(token, TokenKind::Access)) {
            Some(Ok(claims)) => claims,
            Some(Err(e)) => {
                debug!(path, error = %e, "Rejecting access token");
                return GuardDecision::Redirect(self.config.login_path.clone());
            }
            None => return GuardDecision::Redirect(self.config.login_path.clone()),
        };

        if !path_has_prefix(path, &self.config.admin_prefix) {
            return GuardDecision::Allow;
        }

        let hinted = user_cookie.and_then(parse_user_hint).map(|hint| hint.role);
        match hinted {
            Some(role) if role.is_elevated() && claims.role.is_elevated() && role == claims.role => {
                GuardDecision::Allow
            }
            _ => {
                warn!(
                    path,
                    user = %claims.sub,
                    claimed = %claims.role,
                    hinted = ?hinted,
                    "Blocking back-office request"
                );
                GuardDecision::Redirect(self.config.fallback_path.clone())
            }
        }
    }
}

/// Middleware running a [`RouteGuard`] over every request whose path it
/// covers.
#[derive(Clone)]
pub struct RouteGuardLayer {
    guard: Arc<RouteGuard>,
}

impl RouteGuardLayer {
    pub fn new(guard: Arc<RouteGuard>) -> Self {
        Self { guard }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RouteGuardLayer
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RouteGuardMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RouteGuardMiddleware {
            service: Rc::new(service),
            guard: self.guard.clone(),
        }))
    }
}

pub struct RouteGuardMiddleware<S> {
    service: Rc<S>,
    guard: Arc<RouteGuard>,
}

impl<S, B> Service<ServiceRequest> for RouteGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        let decision = if self.guard.covers(req.path()) {
            let access = req.cookie(ACCESS_TOKEN_COOKIE);
            let user = req.cookie(USER_COOKIE);
            self.guard.evaluate(
                req.path(),
                access.as_ref().map(|c| c.value()),
                user.as_ref().map(|c| c.value()),
            )
        } else {
            GuardDecision::Allow
        };

        Box::pin(async move {
            match decision {
                GuardDecision::Allow => {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                GuardDecision::Redirect(location) => {
                    debug!(path = req.path(), location = %location, "Redirecting guarded request");
                    let response = HttpResponse::TemporaryRedirect()
                        .insert_header((header::LOCATION, location))
                        .finish();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

/// Caller identity taken from a verified `accessToken` cookie.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: RecordId,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: &Claims) -> Result<Self, AuthError> {
        Ok(Self {
            id: claims.user_id()?,
            role: claims.role,
        })
    }

    pub fn require_elevated(&self) -> Result<(), AuthError> {
        if self.role.is_elevated() {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }

    pub fn require_user_manager(&self) -> Result<(), AuthError> {
        if self.role.can_manage_users() {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::InternalError("application state missing".into()))?;
    let cookie = req
        .cookie(ACCESS_TOKEN_COOKIE)
        .ok_or(AuthError::MissingToken)?;
    let claims = state
        .auth_service
        .codec()
        .verify(cookie.value(), TokenKind::Access)?;
    Ok(AuthenticatedUser::from_claims(&claims)?)
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req).map_err(Error::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::cookies::UserHint;
    use chrono::{Duration, Utc};

    fn guard() -> RouteGuard {
        RouteGuard::new(
            GuardConfig::default(),
            TokenCodec::new("guard_secret", Duration::hours(1), Duration::days(30)),
        )
    }

    fn access_token(guard: &RouteGuard, role: Role) -> String {
        guard
            .codec
            .issue_pair(&RecordId::new(), role)
            .unwrap()
            .access
            .token
    }

    fn hint(role: Role) -> String {
        serde_json::to_string(&UserHint {
            id: None,
            name: None,
            email: None,
            role,
        })
        .unwrap()
    }

    #[test]
    fn test_segment_aware_prefixes() {
        assert!(path_has_prefix("/admin", "/admin"));
        assert!(path_has_prefix("/admin/events", "/admin"));
        assert!(!path_has_prefix("/administrator", "/admin"));
        assert!(!path_has_prefix("/events", "/admin"));

        let guard = guard();
        assert!(guard.covers("/user/profile/history"));
        assert!(!guard.covers("/user"));
        assert!(!guard.covers("/events"));
    }

    #[test]
    fn test_missing_token_redirects_to_login() {
        let guard = guard();
        for path in ["/user/profile", "/admin/dashboard", "/cart"] {
            assert_eq!(
                guard.evaluate(path, None, None),
                GuardDecision::Redirect("/auth/login".into())
            );
        }
    }

    #[test]
    fn test_exempt_paths_are_allowed() {
        let guard = guard();
        assert_eq!(guard.evaluate("/auth/login", None, None), GuardDecision::Allow);
        assert_eq!(guard.evaluate("/auth", None, None), GuardDecision::Allow);
    }

    #[test]
    fn test_invalid_or_expired_token_counts_as_absent() {
        let guard = guard();
        assert_eq!(
            guard.evaluate("/user/profile", Some("not-a-jwt"), None),
            GuardDecision::Redirect("/auth/login".into())
        );

        let expired = guard
            .codec
            .issue_at(
                &RecordId::new(),
                Role::User,
                TokenKind::Access,
                Utc::now() - Duration::hours(2),
            )
            .unwrap()
            .token;
        assert_eq!(
            guard.evaluate("/user/profile", Some(&expired), None),
            GuardDecision::Redirect("/auth/login".into())
        );

        let refresh = guard
            .codec
            .issue_pair(&RecordId::new(), Role::User)
            .unwrap()
            .refresh
            .token;
        assert_eq!(
            guard.evaluate("/user/profile", Some(&refresh), None),
            GuardDecision::Redirect("/auth/login".into())
        );
    }

    #[test]
    fn test_signed_in_user_reaches_profile() {
        let guard = guard();
        let token = access_token(&guard, Role::User);
        assert_eq!(
            guard.evaluate("/user/profile", Some(&token), None),
            GuardDecision::Allow
        );
    }

    #[test]
    fn test_admin_area_requires_elevated_role() {
        let guard = guard();
        let user_token = access_token(&guard, Role::User);
        assert_eq!(
            guard.evaluate("/admin/events", Some(&user_token), Some(&hint(Role::User))),
            GuardDecision::Redirect("/".into())
        );

        for role in [Role::Admin, Role::Superadmin, Role::Operator] {
            let token = access_token(&guard, role);
            assert_eq!(
                guard.evaluate("/admin/events", Some(&token), Some(&hint(role))),
                GuardDecision::Allow
            );
        }

        let voucher = access_token(&guard, Role::OperatorVoucher);
        assert_eq!(
            guard.evaluate("/admin", Some(&voucher), Some(&hint(Role::OperatorVoucher))),
            GuardDecision::Redirect("/".into())
        );
    }

    #[test]
    fn test_admin_area_rejects_missing_or_malformed_hint() {
        let guard = guard();
        let token = access_token(&guard, Role::Admin);
        assert_eq!(
            guard.evaluate("/admin", Some(&token), None),
            GuardDecision::Redirect("/".into())
        );
        assert_eq!(
            guard.evaluate("/admin", Some(&token), Some("{broken")),
            GuardDecision::Redirect("/".into())
        );
    }

    #[test]
    fn test_forged_role_cookie_is_not_trusted() {
        let guard = guard();
        let token = access_token(&guard, Role::User);
        assert_eq!(
            guard.evaluate("/admin", Some(&token), Some(&hint(Role::Admin))),
            GuardDecision::Redirect("/".into())
        );

        let operator = access_token(&guard, Role::Operator);
        assert_eq!(
            guard.evaluate("/admin", Some(&operator), Some(&hint(Role::Superadmin))),
            GuardDecision::Redirect("/".into())
        );
    }

    #[test]
    fn test_manager_check() {
        let user = AuthenticatedUser {
            id: RecordId::new(),
            role: Role::Operator,
        };
        assert!(user.require_elevated().is_ok());
        assert!(matches!(user.require_user_manager(), Err(AuthError::Forbidden)));
    }
}
