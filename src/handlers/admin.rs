//! Back-office endpoints under `/admin`.
//!
//! The route guard already keeps non-elevated browsers out; every handler
//! still checks the verified caller so the API is safe on its own.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{created, ok, parse_id};
use crate::auth::guard::AuthenticatedUser;
use crate::db::models::{Category, Event, RecordId, Ticket, TransactionStatus, User};
use crate::error::AppError;
use crate::validation::{self, ValidationErrors};
use crate::{AppState, Result};

fn elevated(caller: &AuthenticatedUser) -> Result<()> {
    Ok(caller.require_elevated()?)
}

fn manager(caller: &AuthenticatedUser) -> Result<()> {
    Ok(caller.require_user_manager()?)
}

fn not_found(what: &str) -> AppError {
    AppError::NotFound(format!("{} not found", what))
}

pub async fn dashboard_summary(
    caller: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    elevated(&caller)?;
    let summary = state.store.dashboard_summary().await?;
    Ok(ok(summary, "Dashboard summary fetched"))
}

// Categories

async fn find_category(state: &AppState, id: &RecordId) -> Result<Category> {
    state
        .store
        .list_categories()
        .await?
        .into_iter()
        .find(|category| &category.id == id)
        .ok_or_else(|| not_found("Category"))
}

pub async fn create_category(
    caller: AuthenticatedUser,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    elevated(&caller)?;
    let input = validation::catalog::category(&body)?;
    let category = state.store.create_category(&Category::new(input.name)).await?;
    info!(category = %category.id, by = %caller.id, "Category created");
    Ok(created(category, "Category created"))
}

pub async fn update_category(
    caller: AuthenticatedUser,
    path: web::Path<String>,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    elevated(&caller)?;
    let id = parse_id(&path, "id")?;
    let input = validation::catalog::category(&body)?;
    let mut category = find_category(&state, &id).await?;
    category.name = input.name;
    category.updated_at = Utc::now();
    let category = state.store.update_category(&category).await?;
    Ok(ok(category, "Category updated"))
}

pub async fn delete_category(
    caller: AuthenticatedUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    elevated(&caller)?;
    let id = parse_id(&path, "id")?;
    if !state.store.delete_category(&id).await? {
        return Err(not_found("Category"));
    }
    info!(category = %id, by = %caller.id, "Category deleted");
    Ok(ok(Value::Null, "Category deleted"))
}

// Events

async fn ensure_category(state: &AppState, id: Option<&RecordId>) -> Result<()> {
    if let Some(id) = id {
        if find_category(state, id).await.is_err() {
            return Err(ValidationErrors::single("categoryId", "Category not found").into());
        }
    }
    Ok(())
}

pub async fn list_events(caller: AuthenticatedUser, state: web::Data<AppState>) -> Result<HttpResponse> {
    elevated(&caller)?;
    let events = state.store.list_events(None).await?;
    Ok(ok(events, "Events fetched"))
}

pub async fn create_event(
    caller: AuthenticatedUser,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    elevated(&caller)?;
    let input = validation::catalog::event(&body)?;
    ensure_category(&state, input.category_id.as_ref()).await?;

    let now = Utc::now();
    let event = Event {
        id: RecordId::new(),
        name: input.name,
        description: input.description,
        location: input.location,
        date: input.date,
        category_id: input.category_id,
        image_url: input.image_url,
        created_at: now,
        updated_at: now,
    };
    let event = state.store.create_event(&event).await?;
    info!(event = %event.id, by = %caller.id, "Event created");
    Ok(created(event, "Event created"))
}

pub async fn update_event(
    caller: AuthenticatedUser,
    path: web::Path<String>,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    elevated(&caller)?;
    let id = parse_id(&path, "id")?;
    let input = validation::catalog::event(&body)?;
    ensure_category(&state, input.category_id.as_ref()).await?;

    let mut event = state.store.get_event(&id).await?.ok_or_else(|| not_found("Event"))?;
    event.name = input.name;
    event.description = input.description;
    event.location = input.location;
    event.date = input.date;
    event.category_id = input.category_id;
    event.image_url = input.image_url;
    event.updated_at = Utc::now();

    let event = state.store.update_event(&event).await?;
    Ok(ok(event, "Event updated"))
}

pub async fn delete_event(
    caller: AuthenticatedUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    elevated(&caller)?;
    let id = parse_id(&path, "id")?;
    if !state.store.delete_event(&id).await? {
        return Err(not_found("Event"));
    }
    info!(event = %id, by = %caller.id, "Event deleted");
    Ok(ok(Value::Null, "Event deleted"))
}

// Tickets

pub async fn create_ticket(
    caller: AuthenticatedUser,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    elevated(&caller)?;
    let input = validation::catalog::ticket(&body)?;
    if state.store.get_event(&input.event_id).await?.is_none() {
        return Err(ValidationErrors::single("eventId", "Event not found").into());
    }

    let now = Utc::now();
    let ticket = Ticket {
        id: RecordId::new(),
        event_id: input.event_id,
        name: input.name,
        price: input.price,
        stock: input.stock,
        created_at: now,
        updated_at: now,
    };
    let ticket = state.store.create_ticket(&ticket).await?;
    info!(ticket = %ticket.id, event = %ticket.event_id, stock = ticket.stock, "Ticket created");
    Ok(created(ticket, "Ticket created"))
}

pub async fn update_ticket(
    caller: AuthenticatedUser,
    path: web::Path<String>,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    elevated(&caller)?;
    let id = parse_id(&path, "id")?;
    let input = validation::catalog::ticket_details(&body)?;
    if state.store.get_event(&input.event_id).await?.is_none() {
        return Err(ValidationErrors::single("eventId", "Event not found").into());
    }

    let mut ticket = state.store.get_ticket(&id).await?.ok_or_else(|| not_found("Ticket"))?;
    ticket.event_id = input.event_id;
    ticket.name = input.name;
    ticket.price = input.price;
    ticket.updated_at = Utc::now();

    let ticket = state.store.update_ticket(&ticket).await?;
    Ok(ok(ticket, "Ticket updated"))
}

/// Restocks or withdraws seats relative to whatever is left right now, so
/// reservations made in the meantime are kept.
pub async fn adjust_ticket_stock(
    caller: AuthenticatedUser,
    path: web::Path<String>,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    elevated(&caller)?;
    let id = parse_id(&path, "id")?;
    let delta = validation::catalog::stock_adjustment(&body)?;

    let ticket = state.store.adjust_ticket_stock(&id, delta).await?;
    info!(ticket = %ticket.id, delta, stock = ticket.stock, "Ticket stock adjusted");
    Ok(ok(ticket, "Ticket stock adjusted"))
}

pub async fn delete_ticket(
    caller: AuthenticatedUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    elevated(&caller)?;
    let id = parse_id(&path, "id")?;
    if !state.store.delete_ticket(&id).await? {
        return Err(not_found("Ticket"));
    }
    Ok(ok(Value::Null, "Ticket deleted"))
}

// Transactions

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    pub status: Option<String>,
}

pub async fn list_transactions(
    caller: AuthenticatedUser,
    query: web::Query<TransactionQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    elevated(&caller)?;
    let status = query
        .status
        .as_deref()
        .map(|raw| {
            raw.parse::<TransactionStatus>()
                .map_err(|_| ValidationErrors::single("status", "Invalid status"))
        })
        .transpose()?;
    let transactions = state.store.list_transactions(status).await?;
    Ok(ok(transactions, "Transactions fetched"))
}

pub async fn get_transaction(
    caller: AuthenticatedUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    elevated(&caller)?;
    let id = parse_id(&path, "id")?;
    let transaction = state
        .store
        .get_transaction(&id)
        .await?
        .ok_or_else(|| not_found("Transaction"))?;
    Ok(ok(transaction, "Transaction fetched"))
}

/// Settles a pending transaction. Loses cleanly against the expiry sweep:
/// whichever transition lands first wins and the other gets 409.
pub async fn update_transaction_status(
    caller: AuthenticatedUser,
    path: web::Path<String>,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    elevated(&caller)?;
    let id = parse_id(&path, "id")?;
    let update = validation::transaction::status_update(&body)?;

    let transaction = state
        .store
        .transition_pending(&id, update.status)
        .await?
        .ok_or_else(|| AppError::Conflict("Transaction is no longer pending".into()))?;

    info!(
        transaction = %transaction.id,
        status = %transaction.status,
        by = %caller.id,
        "Transaction settled"
    );
    Ok(ok(transaction, "Transaction status updated"))
}

// Users

pub async fn list_users(caller: AuthenticatedUser, state: web::Data<AppState>) -> Result<HttpResponse> {
    manager(&caller)?;
    let users = state.store.list_users().await?;
    Ok(ok(users, "Users fetched"))
}

pub async fn create_user(
    caller: AuthenticatedUser,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    manager(&caller)?;
    let registration = validation::auth::register(&body)?;
    let user = state.auth_service.register(registration).await?;
    info!(user = %user.id, role = %user.role, by = %caller.id, "Back-office user created");
    Ok(created(user, "User created"))
}

pub async fn update_user_role(
    caller: AuthenticatedUser,
    path: web::Path<String>,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    manager(&caller)?;
    let id = parse_id(&path, "id")?;
    let update = validation::auth::role_update(&body)?;

    let mut user = state
        .store
        .get_user_by_id(&id)
        .await?
        .filter(User::is_active)
        .ok_or_else(|| not_found("User"))?;
    user.role = update.role;
    user.updated_at = Utc::now();

    let user = state.store.update_user(&user).await?;
    info!(user = %user.id, role = %user.role, by = %caller.id, "Role changed");
    Ok(ok(user, "User role updated"))
}

pub async fn delete_user(
    caller: AuthenticatedUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    manager(&caller)?;
    let id = parse_id(&path, "id")?;
    if id == caller.id {
        return Err(AppError::Conflict("Cannot delete your own account".into()));
    }
    if !state.store.soft_delete_user(&id, Utc::now()).await? {
        return Err(not_found("User"));
    }
    info!(user = %id, by = %caller.id, "User deleted");
    Ok(ok(Value::Null, "User deleted"))
}
