//! Persistence layer.
//!
//! Handlers and the expiry job only see the [`Store`] trait. `DbOperations`
//! backs it with Postgres; `MemoryStore` keeps everything in process for
//! tests and local runs.

pub mod memory;
pub mod models;
pub mod operations;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;

pub use memory::MemoryStore;
pub use models::{
    Category, DashboardSummary, Event, RecordId, Role, Ticket, TicketItem, Transaction,
    TransactionStatus, User,
};
pub use operations::DbOperations;

pub type DbResult<T> = std::result::Result<T, DatabaseError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    // Users

    /// Fails with `Duplicate` when the email is taken.
    async fn create_user(&self, user: &User) -> DbResult<User>;
    async fn get_user_by_id(&self, id: &RecordId) -> DbResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> DbResult<Option<User>>;
    async fn update_user(&self, user: &User) -> DbResult<User>;
    async fn list_users(&self) -> DbResult<Vec<User>>;
    /// Returns `false` when the user does not exist or is already deleted.
    async fn soft_delete_user(&self, id: &RecordId, at: DateTime<Utc>) -> DbResult<bool>;

    // Categories
    async fn create_category(&self, category: &Category) -> DbResult<Category>;
    async fn list_categories(&self) -> DbResult<Vec<Category>>;
    async fn update_category(&self, category: &Category) -> DbResult<Category>;
    async fn delete_category(&self, id: &RecordId) -> DbResult<bool>;

    // Events
    async fn create_event(&self, event: &Event) -> DbResult<Event>;
    async fn get_event(&self, id: &RecordId) -> DbResult<Option<Event>>;
    async fn list_events(&self, category: Option<RecordId>) -> DbResult<Vec<Event>>;
    async fn update_event(&self, event: &Event) -> DbResult<Event>;
    async fn delete_event(&self, id: &RecordId) -> DbResult<bool>;

    // Tickets
    async fn create_ticket(&self, ticket: &Ticket) -> DbResult<Ticket>;
    async fn get_ticket(&self, id: &RecordId) -> DbResult<Option<Ticket>>;
    async fn list_tickets_by_event(&self, event_id: &RecordId) -> DbResult<Vec<Ticket>>;
    /// Writes the ticket's details. The stored `stock` is left untouched.
    async fn update_ticket(&self, ticket: &Ticket) -> DbResult<Ticket>;
    /// Adds `delta` to the current stock in one conditional write.
    /// `InsufficientStock` when the result would drop below zero.
    async fn adjust_ticket_stock(&self, id: &RecordId, delta: i64) -> DbResult<Ticket>;
    async fn delete_ticket(&self, id: &RecordId) -> DbResult<bool>;

    // Transactions

    /// Reserves stock for every line item and records the pending
    /// transaction as one unit: either all reservations succeed or nothing
    /// changes (`InsufficientStock` / `NotFound`). The transaction id is
    /// appended to the owner's history.
    async fn create_pending_transaction(&self, transaction: &Transaction) -> DbResult<Transaction>;
    async fn get_transaction(&self, id: &RecordId) -> DbResult<Option<Transaction>>;
    async fn list_transactions(
        &self,
        status: Option<TransactionStatus>,
    ) -> DbResult<Vec<Transaction>>;
    async fn list_user_transactions(&self, user_id: &RecordId) -> DbResult<Vec<Transaction>>;
    /// Pending transactions whose `expired_at` is at or before `now`.
    async fn find_expired_pending(&self, now: DateTime<Utc>) -> DbResult<Vec<Transaction>>;
    /// Moves a transaction out of `pending` only if it is still pending.
    /// When the target status releases stock, every line item's quantity is
    /// added back to its ticket in the same unit of work. Returns `None`
    /// when the transaction was no longer pending.
    async fn transition_pending(
        &self,
        id: &RecordId,
        to: TransactionStatus,
    ) -> DbResult<Option<Transaction>>;

    async fn dashboard_summary(&self) -> DbResult<DashboardSummary>;
}
