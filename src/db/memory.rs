use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::models::{
    Category, DashboardSummary, Event, RecordId, Ticket, Transaction, TransactionStatus, User,
};
use super::{DbResult, Store};
use crate::error::DatabaseError;

#[derive(Debug, Default)]
struct Collections {
    users: HashMap<RecordId, User>,
    categories: HashMap<RecordId, Category>,
    events: HashMap<RecordId, Event>,
    tickets: HashMap<RecordId, Ticket>,
    transactions: HashMap<RecordId, Transaction>,
}

/// In-process [`Store`]. A single lock guards all collections, so each trait
/// call is atomic with respect to every other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(key);
    items
}

fn replace<T: Clone>(map: &mut HashMap<RecordId, T>, id: &RecordId, value: &T) -> DbResult<T> {
    match map.get_mut(id) {
        Some(slot) => {
            *slot = value.clone();
            Ok(value.clone())
        }
        None => Err(DatabaseError::NotFound),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: &User) -> DbResult<User> {
        let mut db = self.inner.write().await;
        if db.users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::Duplicate(format!("email {} already registered", user.email)));
        }
        db.users.insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    async fn get_user_by_id(&self, id: &RecordId) -> DbResult<Option<User>> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let db = self.inner.read().await;
        Ok(db.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> DbResult<User> {
        let mut db = self.inner.write().await;
        let slot = db.users.get_mut(&user.id).ok_or(DatabaseError::NotFound)?;
        // History is only appended by reservations
        let history = std::mem::take(&mut slot.history_transaction);
        *slot = User {
            history_transaction: history,
            ..user.clone()
        };
        Ok(slot.clone())
    }

    async fn list_users(&self) -> DbResult<Vec<User>> {
        let db = self.inner.read().await;
        let users = db.users.values().filter(|u| u.is_active()).cloned().collect();
        Ok(sorted_by(users, |u: &User| u.created_at))
    }

    async fn soft_delete_user(&self, id: &RecordId, at: DateTime<Utc>) -> DbResult<bool> {
        let mut db = self.inner.write().await;
        match db.users.get_mut(id) {
            Some(user) if user.is_active() => {
                user.deleted_at = Some(at);
                user.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_category(&self, category: &Category) -> DbResult<Category> {
        let mut db = self.inner.write().await;
        if db.categories.values().any(|c| c.name == category.name) {
            return Err(DatabaseError::Duplicate(format!("category {}", category.name)));
        }
        db.categories.insert(category.id.clone(), category.clone());
        Ok(category.clone())
    }

    async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let db = self.inner.read().await;
        let categories = db.categories.values().cloned().collect();
        Ok(sorted_by(categories, |c: &Category| c.name.clone()))
    }

    async fn update_category(&self, category: &Category) -> DbResult<Category> {
        let mut db = self.inner.write().await;
        replace(&mut db.categories, &category.id, category)
    }

    async fn delete_category(&self, id: &RecordId) -> DbResult<bool> {
        Ok(self.inner.write().await.categories.remove(id).is_some())
    }

    async fn create_event(&self, event: &Event) -> DbResult<Event> {
        let mut db = self.inner.write().await;
        db.events.insert(event.id.clone(), event.clone());
        Ok(event.clone())
    }

    async fn get_event(&self, id: &RecordId) -> DbResult<Option<Event>> {
        Ok(self.inner.read().await.events.get(id).cloned())
    }

    async fn list_events(&self, category: Option<RecordId>) -> DbResult<Vec<Event>> {
        let db = self.inner.read().await;
        let events = db
            .events
            .values()
            .filter(|e| category.is_none() || e.category_id == category)
            .cloned()
            .collect();
        Ok(sorted_by(events, |e: &Event| e.date))
    }

    async fn update_event(&self, event: &Event) -> DbResult<Event> {
        let mut db = self.inner.write().await;
        replace(&mut db.events, &event.id, event)
    }

    async fn delete_event(&self, id: &RecordId) -> DbResult<bool> {
        let mut db = self.inner.write().await;
        let removed = db.events.remove(id).is_some();
        if removed {
            db.tickets.retain(|_, t| &t.event_id != id);
        }
        Ok(removed)
    }

    async fn create_ticket(&self, ticket: &Ticket) -> DbResult<Ticket> {
        let mut db = self.inner.write().await;
        if !db.events.contains_key(&ticket.event_id) {
            return Err(DatabaseError::NotFound);
        }
        db.tickets.insert(ticket.id.clone(), ticket.clone());
        Ok(ticket.clone())
    }

    async fn get_ticket(&self, id: &RecordId) -> DbResult<Option<Ticket>> {
        Ok(self.inner.read().await.tickets.get(id).cloned())
    }

    async fn list_tickets_by_event(&self, event_id: &RecordId) -> DbResult<Vec<Ticket>> {
        let db = self.inner.read().await;
        let tickets = db
            .tickets
            .values()
            .filter(|t| &t.event_id == event_id)
            .cloned()
            .collect();
        Ok(sorted_by(tickets, |t: &Ticket| t.price))
    }

    async fn update_ticket(&self, ticket: &Ticket) -> DbResult<Ticket> {
        let mut db = self.inner.write().await;
        let slot = db.tickets.get_mut(&ticket.id).ok_or(DatabaseError::NotFound)?;
        *slot = Ticket {
            stock: slot.stock,
            ..ticket.clone()
        };
        Ok(slot.clone())
    }

    async fn adjust_ticket_stock(&self, id: &RecordId, delta: i64) -> DbResult<Ticket> {
        let mut db = self.inner.write().await;
        let ticket = db.tickets.get_mut(id).ok_or(DatabaseError::NotFound)?;
        match ticket.stock.checked_add(delta) {
            Some(stock) if stock >= 0 => {
                ticket.stock = stock;
                ticket.updated_at = Utc::now();
                Ok(ticket.clone())
            }
            _ => Err(DatabaseError::InsufficientStock(id.to_string())),
        }
    }

    async fn delete_ticket(&self, id: &RecordId) -> DbResult<bool> {
        Ok(self.inner.write().await.tickets.remove(id).is_some())
    }

    async fn create_pending_transaction(&self, transaction: &Transaction) -> DbResult<Transaction> {
        let mut db = self.inner.write().await;

        // Check every reservation before touching any stock
        let mut wanted: HashMap<&RecordId, i64> = HashMap::new();
        for item in &transaction.tickets {
            *wanted.entry(&item.ticket_id).or_default() += item.quantity;
        }
        for (ticket_id, quantity) in &wanted {
            let ticket = db.tickets.get(*ticket_id).ok_or(DatabaseError::NotFound)?;
            if ticket.stock < *quantity {
                return Err(DatabaseError::InsufficientStock(ticket_id.to_string()));
            }
        }
        let user = db
            .users
            .get_mut(&transaction.user_id)
            .ok_or(DatabaseError::NotFound)?;
        user.history_transaction.push(transaction.id.clone());

        for item in &transaction.tickets {
            if let Some(ticket) = db.tickets.get_mut(&item.ticket_id) {
                ticket.stock -= item.quantity;
            }
        }
        db.transactions.insert(transaction.id.clone(), transaction.clone());
        Ok(transaction.clone())
    }

    async fn get_transaction(&self, id: &RecordId) -> DbResult<Option<Transaction>> {
        Ok(self.inner.read().await.transactions.get(id).cloned())
    }

    async fn list_transactions(&self, status: Option<TransactionStatus>) -> DbResult<Vec<Transaction>> {
        let db = self.inner.read().await;
        let transactions = db
            .transactions
            .values()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        Ok(sorted_by(transactions, |t: &Transaction| t.created_at))
    }

    async fn list_user_transactions(&self, user_id: &RecordId) -> DbResult<Vec<Transaction>> {
        let db = self.inner.read().await;
        let transactions = db
            .transactions
            .values()
            .filter(|t| &t.user_id == user_id)
            .cloned()
            .collect();
        Ok(sorted_by(transactions, |t: &Transaction| t.created_at))
    }

    async fn find_expired_pending(&self, now: DateTime<Utc>) -> DbResult<Vec<Transaction>> {
        let db = self.inner.read().await;
        let expired = db
            .transactions
            .values()
            .filter(|t| t.is_expired_at(now))
            .cloned()
            .collect();
        Ok(sorted_by(expired, |t: &Transaction| t.expired_at))
    }

    async fn transition_pending(
        &self,
        id: &RecordId,
        to: TransactionStatus,
    ) -> DbResult<Option<Transaction>> {
        let mut db = self.inner.write().await;
        let Some(transaction) = db.transactions.get(id).cloned() else {
            return Err(DatabaseError::NotFound);
        };
        if transaction.status != TransactionStatus::Pending {
            return Ok(None);
        }

        let now = Utc::now();
        if to.releases_stock() {
            for item in &transaction.tickets {
                // Tickets deleted since checkout have nothing to restore
                if let Some(ticket) = db.tickets.get_mut(&item.ticket_id) {
                    ticket.stock += item.quantity;
                    ticket.updated_at = now;
                }
            }
        }

        let updated = Transaction {
            status: to,
            updated_at: now,
            ..transaction
        };
        db.transactions.insert(id.clone(), updated.clone());
        Ok(Some(updated))
    }

    async fn dashboard_summary(&self) -> DbResult<DashboardSummary> {
        let db = self.inner.read().await;
        let paid = db
            .transactions
            .values()
            .filter(|t| t.status == TransactionStatus::Paid);
        let (tickets_sold, revenue) = paid.fold((0, 0), |(sold, revenue), t| {
            (sold + t.total_ticket, revenue + t.total_price)
        });
        Ok(DashboardSummary {
            total_users: db.users.values().filter(|u| u.is_active()).count() as i64,
            total_events: db.events.len() as i64,
            pending_transactions: db
                .transactions
                .values()
                .filter(|t| t.status == TransactionStatus::Pending)
                .count() as i64,
            tickets_sold,
            revenue,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Profile, Role, TicketItem};
    use chrono::Duration;

    async fn seeded() -> (MemoryStore, User, Ticket) {
        let store = MemoryStore::new();
        let user = User::new(
            "buyer@example.com".into(),
            "hash".into(),
            "Buyer".into(),
            Role::User,
            Profile::default(),
            "3174012345678901".into(),
        );
        store.create_user(&user).await.unwrap();

        let now = Utc::now();
        let event = Event {
            id: RecordId::new(),
            name: "Konser".into(),
            description: None,
            location: "Jakarta".into(),
            date: now,
            category_id: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        };
        store.create_event(&event).await.unwrap();
        let ticket = Ticket {
            id: RecordId::new(),
            event_id: event.id.clone(),
            name: "Festival".into(),
            price: 100_000,
            stock: 3,
            created_at: now,
            updated_at: now,
        };
        store.create_ticket(&ticket).await.unwrap();
        (store, user, ticket)
    }

    fn order(user: &User, ticket: &Ticket, quantity: i64) -> Transaction {
        Transaction::pending(
            user.id.clone(),
            vec![TicketItem {
                ticket_id: ticket.id.clone(),
                quantity,
            }],
            quantity,
            quantity * ticket.price,
            Utc::now() + Duration::minutes(15),
        )
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (store, user, _) = seeded().await;
        let mut twin = user.clone();
        twin.id = RecordId::new();
        assert!(matches!(
            store.create_user(&twin).await,
            Err(DatabaseError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn test_reservation_deducts_stock_and_records_history() {
        let (store, user, ticket) = seeded().await;
        let tx = store.create_pending_transaction(&order(&user, &ticket, 2)).await.unwrap();

        assert_eq!(store.get_ticket(&ticket.id).await.unwrap().unwrap().stock, 1);
        let user = store.get_user_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(user.history_transaction, vec![tx.id]);
    }

    #[tokio::test]
    async fn test_failed_reservation_changes_nothing() {
        let (store, user, ticket) = seeded().await;
        let mut tx = order(&user, &ticket, 2);
        tx.tickets.push(TicketItem {
            ticket_id: ticket.id.clone(),
            quantity: 2,
        });
        assert!(matches!(
            store.create_pending_transaction(&tx).await,
            Err(DatabaseError::InsufficientStock(_))
        ));
        assert_eq!(store.get_ticket(&ticket.id).await.unwrap().unwrap().stock, 3);
        assert!(store.list_transactions(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transition_is_compare_and_swap() {
        let (store, user, ticket) = seeded().await;
        let tx = store.create_pending_transaction(&order(&user, &ticket, 2)).await.unwrap();

        let paid = store.transition_pending(&tx.id, TransactionStatus::Paid).await.unwrap();
        assert_eq!(paid.unwrap().status, TransactionStatus::Paid);

        // The loser of the race is a no-op
        let expired = store.transition_pending(&tx.id, TransactionStatus::Expired).await.unwrap();
        assert!(expired.is_none());
        assert_eq!(store.get_ticket(&ticket.id).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_cancellation_restores_stock() {
        let (store, user, ticket) = seeded().await;
        let tx = store.create_pending_transaction(&order(&user, &ticket, 3)).await.unwrap();
        assert_eq!(store.get_ticket(&ticket.id).await.unwrap().unwrap().stock, 0);

        store.transition_pending(&tx.id, TransactionStatus::Cancelled).await.unwrap();
        assert_eq!(store.get_ticket(&ticket.id).await.unwrap().unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_soft_deleted_users_are_hidden() {
        let (store, user, _) = seeded().await;
        assert!(store.soft_delete_user(&user.id, Utc::now()).await.unwrap());
        assert!(!store.soft_delete_user(&user.id, Utc::now()).await.unwrap());
        assert!(store.list_users().await.unwrap().is_empty());
        assert_eq!(store.dashboard_summary().await.unwrap().total_users, 0);
    }

    #[tokio::test]
    async fn test_profile_update_keeps_history_from_concurrent_checkout() {
        let (store, user, ticket) = seeded().await;
        let stale = store.get_user_by_id(&user.id).await.unwrap().unwrap();
        let tx = store.create_pending_transaction(&order(&user, &ticket, 1)).await.unwrap();

        let renamed = store
            .update_user(&User {
                name: "Renamed".into(),
                ..stale
            })
            .await
            .unwrap();
        assert_eq!(renamed.name, "Renamed");
        assert_eq!(renamed.history_transaction, vec![tx.id.clone()]);

        let stored = store.get_user_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.history_transaction, vec![tx.id]);
    }

    #[tokio::test]
    async fn test_ticket_update_leaves_stock_alone() {
        let (store, user, ticket) = seeded().await;
        store.create_pending_transaction(&order(&user, &ticket, 2)).await.unwrap();

        let edited = store
            .update_ticket(&Ticket {
                name: "Festival A".into(),
                ..ticket.clone()
            })
            .await
            .unwrap();
        assert_eq!(edited.name, "Festival A");
        assert_eq!(edited.stock, 1);
    }

    #[tokio::test]
    async fn test_stock_adjustment_is_relative_and_bounded() {
        let (store, _, ticket) = seeded().await;
        assert_eq!(store.adjust_ticket_stock(&ticket.id, 4).await.unwrap().stock, 7);
        assert!(matches!(
            store.adjust_ticket_stock(&ticket.id, -8).await,
            Err(DatabaseError::InsufficientStock(_))
        ));
        assert_eq!(store.adjust_ticket_stock(&ticket.id, -7).await.unwrap().stock, 0);
        assert!(matches!(
            store.adjust_ticket_stock(&RecordId::new(), 1).await,
            Err(DatabaseError::NotFound)
        ));
    }
}
