use actix_web::{web, HttpResponse};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{created, ok, parse_id};
use crate::auth::guard::AuthenticatedUser;
use crate::db::models::{Transaction, TransactionStatus};
use crate::error::AppError;
use crate::validation::{self, Issue, TransactionInput, ValidationErrors};
use crate::{AppState, Result};

#[derive(Debug, Deserialize)]
pub struct EventQuery {
    pub category: Option<String>,
}

pub async fn list_events(
    query: web::Query<EventQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let category = query
        .category
        .as_deref()
        .map(|raw| parse_id(raw, "category"))
        .transpose()?;
    let events = state.store.list_events(category).await?;
    Ok(ok(events, "Events fetched"))
}

pub async fn get_event(path: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let id = parse_id(&path, "id")?;
    let event = state
        .store
        .get_event(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))?;
    Ok(ok(event, "Event fetched"))
}

pub async fn list_event_tickets(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let id = parse_id(&path, "id")?;
    if state.store.get_event(&id).await?.is_none() {
        return Err(AppError::NotFound("Event not found".into()));
    }
    let tickets = state.store.list_tickets_by_event(&id).await?;
    Ok(ok(tickets, "Tickets fetched"))
}

pub async fn list_categories(state: web::Data<AppState>) -> Result<HttpResponse> {
    let categories = state.store.list_categories().await?;
    Ok(ok(categories, "Categories fetched"))
}

/// Cross-field rules of a checkout that the schema alone cannot express:
/// the order starts pending and both totals agree with the line items.
async fn check_order(state: &AppState, input: &TransactionInput) -> Result<()> {
    let mut issues = Vec::new();

    if input.status != TransactionStatus::Pending {
        issues.push(Issue::new("status", "Checkout must start as pending"));
    }

    let quantity: i64 = input.tickets.iter().map(|item| item.quantity).sum();
    if quantity != input.total_ticket {
        issues.push(Issue::new(
            "totalTicket",
            format!("Expected {} ticket(s) in total", quantity),
        ));
    }

    let mut price = 0i64;
    for (index, item) in input.tickets.iter().enumerate() {
        match state.store.get_ticket(&item.ticket_id).await? {
            Some(ticket) => price = price.saturating_add(ticket.price.saturating_mul(item.quantity)),
            None => issues.push(Issue::new(
                format!("tickets.{}.ticketId", index),
                "Ticket not found",
            )),
        }
    }
    if issues.iter().all(|issue| !issue.path.starts_with("tickets.")) && price != input.total_price {
        issues.push(Issue::new(
            "totalPrice",
            format!("Expected a total price of {}", price),
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors::from(issues).into())
    }
}

pub async fn checkout(
    user: AuthenticatedUser,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let input = validation::transaction::transaction(&body)?;
    check_order(&state, &input).await?;

    let expired_at = Utc::now() + Duration::minutes(state.config.expiry.reservation_minutes);
    let transaction = Transaction::pending(
        user.id.clone(),
        input.tickets,
        input.total_ticket,
        input.total_price,
        expired_at,
    );
    let transaction = state.store.create_pending_transaction(&transaction).await?;

    info!(
        transaction = %transaction.id,
        user = %user.id,
        total_ticket = transaction.total_ticket,
        expired_at = %transaction.expired_at,
        "Reserved tickets"
    );
    Ok(created(transaction, "Transaction created"))
}
