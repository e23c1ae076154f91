use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres};
use std::sync::Arc;
use std::time::Duration;

use super::models::{
    Category, DashboardSummary, Event, Profile, RecordId, Ticket, TicketItem, Transaction,
    TransactionStatus, User,
};
use super::{DbResult, Store};
use crate::error::DatabaseError;

const USER_COLUMNS: &str = "id, email, password_hash, name, role, profile, id_number, \
     history_transaction, created_at, updated_at, deleted_at";
const EVENT_COLUMNS: &str =
    "id, name, description, location, date, category_id, image_url, created_at, updated_at";
const TICKET_COLUMNS: &str = "id, event_id, name, price, stock, created_at, updated_at";
const TRANSACTION_COLUMNS: &str = "id, user_id, tickets, total_ticket, total_price, status, \
     expired_at, created_at, updated_at";

/// Postgres-backed [`Store`]. Nested documents (profile, line items) live in
/// JSONB columns.
#[derive(Clone)]
pub struct DbOperations {
    pool: Arc<PgPool>,
}

fn corrupt(field: &str, err: String) -> DatabaseError {
    DatabaseError::QueryError(format!("stored {} is invalid: {}", field, err))
}

fn parse_id(raw: String) -> DbResult<RecordId> {
    raw.parse().map_err(|e| corrupt("id", e))
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    password_hash: String,
    name: String,
    role: String,
    profile: Json<Profile>,
    id_number: String,
    history_transaction: Json<Vec<RecordId>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> DbResult<Self> {
        Ok(User {
            id: parse_id(row.id)?,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            role: row.role.parse().map_err(|e| corrupt("role", e))?,
            profile: row.profile.0,
            id_number: row.id_number,
            history_transaction: row.history_transaction.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(FromRow)]
struct CategoryRow {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CategoryRow> for Category {
    type Error = DatabaseError;

    fn try_from(row: CategoryRow) -> DbResult<Self> {
        Ok(Category {
            id: parse_id(row.id)?,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct EventRow {
    id: String,
    name: String,
    description: Option<String>,
    location: String,
    date: DateTime<Utc>,
    category_id: Option<String>,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = DatabaseError;

    fn try_from(row: EventRow) -> DbResult<Self> {
        Ok(Event {
            id: parse_id(row.id)?,
            name: row.name,
            description: row.description,
            location: row.location,
            date: row.date,
            category_id: row.category_id.map(parse_id).transpose()?,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TicketRow {
    id: String,
    event_id: String,
    name: String,
    price: i64,
    stock: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = DatabaseError;

    fn try_from(row: TicketRow) -> DbResult<Self> {
        Ok(Ticket {
            id: parse_id(row.id)?,
            event_id: parse_id(row.event_id)?,
            name: row.name,
            price: row.price,
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TransactionRow {
    id: String,
    user_id: String,
    tickets: Json<Vec<TicketItem>>,
    total_ticket: i64,
    total_price: i64,
    status: String,
    expired_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DatabaseError;

    fn try_from(row: TransactionRow) -> DbResult<Self> {
        Ok(Transaction {
            id: parse_id(row.id)?,
            user_id: parse_id(row.user_id)?,
            tickets: row.tickets.0,
            total_ticket: row.total_ticket,
            total_price: row.total_price,
            status: row.status.parse().map_err(|e| corrupt("status", e))?,
            expired_at: row.expired_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> DbResult<Vec<T>>
where
    T: TryFrom<R, Error = DatabaseError>,
{
    rows.into_iter().map(T::try_from).collect()
}

impl DbOperations {
    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub async fn migrate(&self) -> DbResult<()> {
        sqlx::migrate!("./migrations")
            .run(self.pool.as_ref())
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn ticket_exists(
        &self,
        executor: &mut sqlx::Transaction<'_, Postgres>,
        id: &RecordId,
    ) -> DbResult<bool> {
        Ok(
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM tickets WHERE id = $1)")
                .bind(id.as_str())
                .fetch_one(&mut **executor)
                .await?,
        )
    }
}

#[async_trait]
impl Store for DbOperations {
    async fn create_user(&self, user: &User) -> DbResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id.as_str())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(Json(&user.profile))
        .bind(&user.id_number)
        .bind(Json(&user.history_transaction))
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.deleted_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        row.try_into()
    }

    async fn get_user_by_id(&self, id: &RecordId) -> DbResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn update_user(&self, user: &User) -> DbResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET email = $2, password_hash = $3, name = $4, role = $5, \
             profile = $6, id_number = $7, updated_at = $8, deleted_at = $9 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id.as_str())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(Json(&user.profile))
        .bind(&user.id_number)
        .bind(user.updated_at)
        .bind(user.deleted_at)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(DatabaseError::NotFound)?;

        row.try_into()
    }

    async fn list_users(&self) -> DbResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY created_at"
        ))
        .fetch_all(self.pool.as_ref())
        .await?;

        convert_all(rows)
    }

    async fn soft_delete_user(&self, id: &RecordId, at: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = $2, updated_at = $2 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_str())
        .bind(at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn create_category(&self, category: &Category) -> DbResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO categories (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4) \
             RETURNING id, name, created_at, updated_at",
        )
        .bind(category.id.as_str())
        .bind(&category.name)
        .bind(category.created_at)
        .bind(category.updated_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        row.try_into()
    }

    async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, created_at, updated_at FROM categories ORDER BY name",
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        convert_all(rows)
    }

    async fn update_category(&self, category: &Category) -> DbResult<Category> {
        sqlx::query_as::<_, CategoryRow>(
            "UPDATE categories SET name = $2, updated_at = $3 WHERE id = $1 \
             RETURNING id, name, created_at, updated_at",
        )
        .bind(category.id.as_str())
        .bind(&category.name)
        .bind(category.updated_at)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(DatabaseError::NotFound)?
        .try_into()
    }

    async fn delete_category(&self, id: &RecordId) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_str())
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn create_event(&self, event: &Event) -> DbResult<Event> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "INSERT INTO events ({EVENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(event.id.as_str())
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.date)
        .bind(event.category_id.as_ref().map(RecordId::as_str))
        .bind(&event.image_url)
        .bind(event.created_at)
        .bind(event.updated_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        row.try_into()
    }

    async fn get_event(&self, id: &RecordId) -> DbResult<Option<Event>> {
        sqlx::query_as::<_, EventRow>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(Event::try_from)
            .transpose()
    }

    async fn list_events(&self, category: Option<RecordId>) -> DbResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE ($1::TEXT IS NULL OR category_id = $1) ORDER BY date"
        ))
        .bind(category.as_ref().map(RecordId::as_str))
        .fetch_all(self.pool.as_ref())
        .await?;

        convert_all(rows)
    }

    async fn update_event(&self, event: &Event) -> DbResult<Event> {
        sqlx::query_as::<_, EventRow>(&format!(
            "UPDATE events SET name = $2, description = $3, location = $4, date = $5, \
             category_id = $6, image_url = $7, updated_at = $8 \
             WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(event.id.as_str())
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.date)
        .bind(event.category_id.as_ref().map(RecordId::as_str))
        .bind(&event.image_url)
        .bind(event.updated_at)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(DatabaseError::NotFound)?
        .try_into()
    }

    async fn delete_event(&self, id: &RecordId) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id.as_str())
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn create_ticket(&self, ticket: &Ticket) -> DbResult<Ticket> {
        let result = sqlx::query_as::<_, TicketRow>(&format!(
            "INSERT INTO tickets ({TICKET_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {TICKET_COLUMNS}"
        ))
        .bind(ticket.id.as_str())
        .bind(ticket.event_id.as_str())
        .bind(&ticket.name)
        .bind(ticket.price)
        .bind(ticket.stock)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .fetch_one(self.pool.as_ref())
        .await;

        match result {
            Ok(row) => row.try_into(),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                Err(DatabaseError::NotFound)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_ticket(&self, id: &RecordId) -> DbResult<Option<Ticket>> {
        sqlx::query_as::<_, TicketRow>(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(Ticket::try_from)
            .transpose()
    }

    async fn list_tickets_by_event(&self, event_id: &RecordId) -> DbResult<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE event_id = $1 ORDER BY price"
        ))
        .bind(event_id.as_str())
        .fetch_all(self.pool.as_ref())
        .await?;

        convert_all(rows)
    }

    async fn update_ticket(&self, ticket: &Ticket) -> DbResult<Ticket> {
        sqlx::query_as::<_, TicketRow>(&format!(
            "UPDATE tickets SET event_id = $2, name = $3, price = $4, updated_at = $5 \
             WHERE id = $1 RETURNING {TICKET_COLUMNS}"
        ))
        .bind(ticket.id.as_str())
        .bind(ticket.event_id.as_str())
        .bind(&ticket.name)
        .bind(ticket.price)
        .bind(ticket.updated_at)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(DatabaseError::NotFound)?
        .try_into()
    }

    async fn delete_ticket(&self, id: &RecordId) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id.as_str())
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn adjust_ticket_stock(&self, id: &RecordId, delta: i64) -> DbResult<Ticket> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "UPDATE tickets SET stock = stock + $2, updated_at = NOW() \
             WHERE id = $1 AND stock + $2 >= 0 RETURNING {TICKET_COLUMNS}"
        ))
        .bind(id.as_str())
        .bind(delta)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            let err = if self.ticket_exists(&mut tx, id).await? {
                DatabaseError::InsufficientStock(id.to_string())
            } else {
                DatabaseError::NotFound
            };
            tx.rollback().await?;
            return Err(err);
        };

        tx.commit().await?;
        row.try_into()
    }

    async fn create_pending_transaction(&self, transaction: &Transaction) -> DbResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        for item in &transaction.tickets {
            // Conditional decrement: never drives stock below zero
            let reserved = sqlx::query(
                "UPDATE tickets SET stock = stock - $2, updated_at = NOW() \
                 WHERE id = $1 AND stock >= $2",
            )
            .bind(item.ticket_id.as_str())
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;

            if reserved.rows_affected() == 0 {
                let err = if self.ticket_exists(&mut tx, &item.ticket_id).await? {
                    DatabaseError::InsufficientStock(item.ticket_id.to_string())
                } else {
                    DatabaseError::NotFound
                };
                tx.rollback().await?;
                return Err(err);
            }
        }

        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "INSERT INTO transactions ({TRANSACTION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(transaction.id.as_str())
        .bind(transaction.user_id.as_str())
        .bind(Json(&transaction.tickets))
        .bind(transaction.total_ticket)
        .bind(transaction.total_price)
        .bind(transaction.status.as_str())
        .bind(transaction.expired_at)
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .fetch_one(&mut *tx)
        .await;

        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tx.rollback().await?;
                return Err(match e {
                    sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                        DatabaseError::NotFound
                    }
                    other => other.into(),
                });
            }
        };

        sqlx::query(
            "UPDATE users SET history_transaction = history_transaction || to_jsonb($2::TEXT) \
             WHERE id = $1",
        )
        .bind(transaction.user_id.as_str())
        .bind(transaction.id.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn get_transaction(&self, id: &RecordId) -> DbResult<Option<Transaction>> {
        sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(id.as_str())
        .fetch_optional(self.pool.as_ref())
        .await?
        .map(Transaction::try_from)
        .transpose()
    }

    async fn list_transactions(&self, status: Option<TransactionStatus>) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at"
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(self.pool.as_ref())
        .await?;

        convert_all(rows)
    }

    async fn list_user_transactions(&self, user_id: &RecordId) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = $1 ORDER BY created_at"
        ))
        .bind(user_id.as_str())
        .fetch_all(self.pool.as_ref())
        .await?;

        convert_all(rows)
    }

    async fn find_expired_pending(&self, now: DateTime<Utc>) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE status = 'pending' AND expired_at <= $1 ORDER BY expired_at"
        ))
        .bind(now)
        .fetch_all(self.pool.as_ref())
        .await?;

        convert_all(rows)
    }

    async fn transition_pending(
        &self,
        id: &RecordId,
        to: TransactionStatus,
    ) -> DbResult<Option<Transaction>> {
        let mut tx = self.pool.begin().await?;

        // Row lock + status predicate: concurrent transitions serialize and
        // only the first one matches
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "UPDATE transactions SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND status = 'pending' RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(id.as_str())
        .bind(to.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM transactions WHERE id = $1)",
            )
            .bind(id.as_str())
            .fetch_one(&mut *tx)
            .await?;
            tx.rollback().await?;
            return if exists { Ok(None) } else { Err(DatabaseError::NotFound) };
        };
        let transaction = Transaction::try_from(row)?;

        if to.releases_stock() {
            for item in &transaction.tickets {
                sqlx::query("UPDATE tickets SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
                    .bind(item.ticket_id.as_str())
                    .bind(item.quantity)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(Some(transaction))
    }

    async fn dashboard_summary(&self) -> DbResult<DashboardSummary> {
        Ok(sqlx::query_as::<_, DashboardSummary>(
            "SELECT \
               (SELECT COUNT(*) FROM users WHERE deleted_at IS NULL) AS total_users, \
               (SELECT COUNT(*) FROM events) AS total_events, \
               (SELECT COUNT(*) FROM transactions WHERE status = 'pending') AS pending_transactions, \
               (SELECT COALESCE(SUM(total_ticket), 0)::BIGINT FROM transactions WHERE status = 'paid') AS tickets_sold, \
               (SELECT COALESCE(SUM(total_price), 0)::BIGINT FROM transactions WHERE status = 'paid') AS revenue",
        )
        .fetch_one(self.pool.as_ref())
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;

    fn user_row(role: &str) -> UserRow {
        let now = Utc::now();
        UserRow {
            id: RecordId::new().to_string(),
            email: "a@b.com".into(),
            password_hash: "hash".into(),
            name: "Alice".into(),
            role: role.into(),
            profile: Json(Profile::default()),
            id_number: "3174012345678901".into(),
            history_transaction: Json(vec![]),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_user_row_conversion() {
        let user = User::try_from(user_row("operator_voucher")).unwrap();
        assert_eq!(user.role, Role::OperatorVoucher);
    }

    #[test]
    fn test_corrupt_role_is_reported() {
        assert!(matches!(
            User::try_from(user_row("wizard")),
            Err(DatabaseError::QueryError(_))
        ));
    }

    #[test]
    fn test_transaction_row_conversion() {
        let now = Utc::now();
        let ticket_id = RecordId::new();
        let row = TransactionRow {
            id: RecordId::new().to_string(),
            user_id: RecordId::new().to_string(),
            tickets: Json(vec![TicketItem {
                ticket_id: ticket_id.clone(),
                quantity: 2,
            }]),
            total_ticket: 2,
            total_price: 0,
            status: "expired".into(),
            expired_at: now,
            created_at: now,
            updated_at: now,
        };
        let tx = Transaction::try_from(row).unwrap();
        assert_eq!(tx.status, TransactionStatus::Expired);
        assert_eq!(tx.tickets[0].ticket_id, ticket_id);
    }
}
