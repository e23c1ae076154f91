//! Authentication and request gating.
//!
//! Passwords and token issuance live in [`service`] and [`token`], session
//! cookies in [`cookies`], route protection in [`guard`] and per-client
//! throttling in [`rate_limit`].

pub mod cookies;
pub mod guard;
pub mod handlers;
pub mod rate_limit;
pub mod service;
pub mod token;

pub use cookies::{CookiePolicy, UserHint};
pub use guard::{AuthenticatedUser, GuardConfig, GuardDecision, RouteGuard, RouteGuardLayer};
pub use rate_limit::{RateLimit, RateLimitConfig, RateLimiter};
pub use service::{AuthService, Session};
pub use token::{Claims, TokenCodec, TokenKind, TokenPair};
