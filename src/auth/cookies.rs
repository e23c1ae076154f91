//! Session cookies.
//!
//! Browsers only delete a cookie when the clearing `Set-Cookie` carries the
//! same name, path and attributes it was set with, so both issuing and
//! clearing go through [`CookiePolicy::build`].

use actix_web::cookie::time::{Duration as CookieDuration, OffsetDateTime};
use actix_web::cookie::{Cookie, SameSite};
use actix_web::HttpResponseBuilder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::token::TokenPair;
use crate::db::models::{RecordId, Role, User};

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";
pub const USER_COOKIE: &str = "user";
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Identity hint for the presentation layer, stored as JSON in the `user`
/// cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserHint {
    pub id: Option<RecordId>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Role,
}

impl From<&User> for UserHint {
    fn from(user: &User) -> Self {
        Self {
            id: Some(user.id.clone()),
            name: Some(user.name.clone()),
            email: Some(user.email.clone()),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
}

/// Path and script visibility for each session cookie.
fn attributes(name: &str) -> (&'static str, bool) {
    match name {
        REFRESH_TOKEN_COOKIE => (REFRESH_PATH, true),
        USER_COOKIE => ("/", false),
        _ => ("/", true),
    }
}

fn to_offset(at: DateTime<Utc>) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(at.timestamp()).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

impl CookiePolicy {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    fn build(&self, name: &'static str, value: String) -> Cookie<'static> {
        let (path, http_only) = attributes(name);
        Cookie::build(name, value)
            .path(path)
            .http_only(http_only)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .finish()
    }

    fn expiring(&self, name: &'static str, value: String, expires_at: DateTime<Utc>) -> Cookie<'static> {
        let mut cookie = self.build(name, value);
        let remaining = (expires_at - Utc::now()).num_seconds().max(0);
        cookie.set_max_age(CookieDuration::seconds(remaining));
        cookie.set_expires(to_offset(expires_at));
        cookie
    }

    /// `accessToken`, `refreshToken` and `user` for a fresh session.
    pub fn session_cookies(&self, tokens: &TokenPair, hint: &UserHint) -> Vec<Cookie<'static>> {
        let hint = serde_json::to_string(hint).unwrap_or_default();
        vec![
            self.expiring(ACCESS_TOKEN_COOKIE, tokens.access.token.clone(), tokens.access.expires_at),
            self.expiring(REFRESH_TOKEN_COOKIE, tokens.refresh.token.clone(), tokens.refresh.expires_at),
            self.expiring(USER_COOKIE, hint, tokens.refresh.expires_at),
        ]
    }

    /// Empty, already-expired counterparts of [`Self::session_cookies`].
    pub fn cleared_cookies(&self) -> Vec<Cookie<'static>> {
        [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, USER_COOKIE]
            .into_iter()
            .map(|name| {
                let mut cookie = self.build(name, String::new());
                cookie.set_max_age(CookieDuration::ZERO);
                cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
                cookie
            })
            .collect()
    }

    pub fn apply(builder: &mut HttpResponseBuilder, cookies: Vec<Cookie<'static>>) {
        for cookie in cookies {
            builder.cookie(cookie);
        }
    }
}

/// Reads the role out of a `user` cookie value. Anything unparsable yields
/// `None`.
pub fn parse_user_hint(raw: &str) -> Option<UserHint> {
    match serde_json::from_str::<UserHint>(raw) {
        Ok(hint) => Some(hint),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed user cookie");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::TokenCodec;
    use chrono::Duration;

    fn pair() -> TokenPair {
        TokenCodec::new("secret", Duration::hours(1), Duration::days(30))
            .issue_pair(&RecordId::new(), Role::User)
            .unwrap()
    }

    fn hint() -> UserHint {
        UserHint {
            id: None,
            name: Some("Budi".into()),
            email: None,
            role: Role::User,
        }
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookies = CookiePolicy::new(true).session_cookies(&pair(), &hint());
        let access = &cookies[0];
        assert_eq!(access.name(), ACCESS_TOKEN_COOKIE);
        assert_eq!(access.path(), Some("/"));
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.secure(), Some(true));
        assert_eq!(access.same_site(), Some(SameSite::Strict));
        let max_age = access.max_age().unwrap().whole_seconds();
        assert!((3590..=3600).contains(&max_age));

        let refresh = &cookies[1];
        assert_eq!(refresh.path(), Some(REFRESH_PATH));
        assert!(refresh.max_age().unwrap().whole_days() >= 29);

        let user = &cookies[2];
        assert_eq!(user.http_only(), Some(false));
        assert_eq!(parse_user_hint(user.value()).unwrap().role, Role::User);
    }

    #[test]
    fn test_development_cookies_are_not_secure() {
        let cookies = CookiePolicy::new(false).session_cookies(&pair(), &hint());
        assert!(cookies.iter().all(|c| c.secure() == Some(false)));
    }

    #[test]
    fn test_clear_matches_issue_attributes() {
        let policy = CookiePolicy::new(true);
        let issued = policy.session_cookies(&pair(), &hint());
        let cleared = policy.cleared_cookies();
        assert_eq!(issued.len(), cleared.len());
        for (set, clear) in issued.iter().zip(cleared.iter()) {
            assert_eq!(set.name(), clear.name());
            assert_eq!(set.path(), clear.path());
            assert_eq!(set.http_only(), clear.http_only());
            assert_eq!(set.secure(), clear.secure());
            assert_eq!(set.same_site(), clear.same_site());
            assert_eq!(clear.value(), "");
            assert_eq!(clear.max_age(), Some(CookieDuration::ZERO));
        }
    }

    #[test]
    fn test_malformed_hint() {
        assert!(parse_user_hint("{not json").is_none());
        assert!(parse_user_hint(r#"{"role":"wizard"}"#).is_none());
        assert_eq!(
            parse_user_hint(r#"{"role":"admin"}"#).unwrap().role,
            Role::Admin
        );
    }
}
