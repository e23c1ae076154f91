use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde_json::Value;
use tracing::info;

use super::ok;
use crate::auth::guard::AuthenticatedUser;
use crate::db::models::User;
use crate::error::AppError;
use crate::validation;
use crate::{AppState, Result};

async fn load_user(state: &AppState, caller: &AuthenticatedUser) -> Result<User> {
    state
        .store
        .get_user_by_id(&caller.id)
        .await?
        .filter(User::is_active)
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

pub async fn get_profile(caller: AuthenticatedUser, state: web::Data<AppState>) -> Result<HttpResponse> {
    let user = load_user(&state, &caller).await?;
    Ok(ok(user, "Profile fetched"))
}

pub async fn update_profile(
    caller: AuthenticatedUser,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let update = validation::auth::profile_update(&body)?;
    let mut user = load_user(&state, &caller).await?;

    if let Some(profile) = update.profile {
        user.profile = profile;
    }
    if let Some(name) = update.name {
        user.name = name;
    }
    // The display name is the single source for the profile's full name
    user.profile.fullname = user.name.clone();
    user.updated_at = Utc::now();

    let user = state.store.update_user(&user).await?;
    info!(user = %user.id, "Profile updated");
    Ok(ok(user, "Profile updated"))
}

pub async fn change_password(
    caller: AuthenticatedUser,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let change = validation::auth::password_change(&body)?;
    let user = load_user(&state, &caller).await?;
    state
        .auth_service
        .change_password(&user, &change.password)
        .await?;
    Ok(ok(Value::Null, "Password updated"))
}

pub async fn history(caller: AuthenticatedUser, state: web::Data<AppState>) -> Result<HttpResponse> {
    let transactions = state.store.list_user_transactions(&caller.id).await?;
    Ok(ok(transactions, "Transaction history fetched"))
}
