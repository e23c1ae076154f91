use actix_web::web;
use std::sync::Arc;

use crate::auth::handlers as auth;
use crate::auth::rate_limit::{RateLimit, RateLimiter};
use crate::handlers::{admin, profile, storefront};
use crate::health_check;

/// Registers every endpoint. `/auth` and checkout share one limiter so a
/// client's budget covers both.
pub fn configure(limiter: Arc<RateLimiter>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.route("/health", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .wrap(RateLimit::new(limiter.clone()))
                    .route("/login", web::post().to(auth::login))
                    .route("/register", web::post().to(auth::register))
                    .route("/logout", web::post().to(auth::logout))
                    .route("/refresh", web::post().to(auth::refresh)),
            )
            .route("/categories", web::get().to(storefront::list_categories))
            .service(
                web::scope("/events")
                    .route("", web::get().to(storefront::list_events))
                    .route("/{id}", web::get().to(storefront::get_event))
                    .route("/{id}/tickets", web::get().to(storefront::list_event_tickets)),
            )
            .service(
                web::resource("/transactions")
                    .wrap(RateLimit::new(limiter))
                    .route(web::post().to(storefront::checkout)),
            )
            .service(
                web::scope("/user/profile")
                    .route("", web::get().to(profile::get_profile))
                    .route("/update", web::patch().to(profile::update_profile))
                    .route("/forgot-password", web::patch().to(profile::change_password))
                    .route("/history", web::get().to(profile::history)),
            )
            .service(
                web::scope("/admin")
                    .route("/dashboard/summary", web::get().to(admin::dashboard_summary))
                    .route("/categories", web::post().to(admin::create_category))
                    .service(
                        web::resource("/categories/{id}")
                            .route(web::put().to(admin::update_category))
                            .route(web::delete().to(admin::delete_category)),
                    )
                    .service(
                        web::resource("/events")
                            .route(web::get().to(admin::list_events))
                            .route(web::post().to(admin::create_event)),
                    )
                    .service(
                        web::resource("/events/{id}")
                            .route(web::put().to(admin::update_event))
                            .route(web::delete().to(admin::delete_event)),
                    )
                    .route("/tickets", web::post().to(admin::create_ticket))
                    .service(
                        web::resource("/tickets/{id}")
                            .route(web::put().to(admin::update_ticket))
                            .route(web::delete().to(admin::delete_ticket)),
                    )
                    .route("/tickets/{id}/stock", web::patch().to(admin::adjust_ticket_stock))
                    .route("/transactions", web::get().to(admin::list_transactions))
                    .route("/transactions/{id}", web::get().to(admin::get_transaction))
                    .route(
                        "/transactions/{id}/status",
                        web::patch().to(admin::update_transaction_status),
                    )
                    .service(
                        web::resource("/users")
                            .route(web::get().to(admin::list_users))
                            .route(web::post().to(admin::create_user)),
                    )
                    .route("/users/{id}/role", web::patch().to(admin::update_user_role))
                    .route("/users/{id}", web::delete().to(admin::delete_user)),
            );
    }
}
