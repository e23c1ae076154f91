use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{Checker, Len, Range, ValidationErrors};
use crate::db::models::RecordId;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryInput {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventInput {
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    pub date: DateTime<Utc>,
    pub category_id: Option<RecordId>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TicketInput {
    pub event_id: RecordId,
    pub name: String,
    pub price: i64,
    pub stock: i64,
}

/// Editable ticket fields. Stock is only changed through [`stock_adjustment`].
#[derive(Debug, Clone, PartialEq)]
pub struct TicketDetails {
    pub event_id: RecordId,
    pub name: String,
    pub price: i64,
}

pub fn category(value: &Value) -> Result<CategoryInput, ValidationErrors> {
    let mut checker = Checker::new();
    let input = checker
        .root(value)
        .and_then(|obj| checker.string(obj, "name", "name", Len(1, 100)))
        .map(|name| CategoryInput {
            name: name.trim().to_string(),
        });
    checker.finish(input)
}

pub fn event(value: &Value) -> Result<EventInput, ValidationErrors> {
    let mut checker = Checker::new();
    let input = checker.root(value).and_then(|obj| {
        let name = checker.string(obj, "name", "name", Len(1, 255));
        let description = checker.optional_string(obj, "description", "description", Len(0, 5000));
        let location = checker.string(obj, "location", "location", Len(1, 255));
        let date = checker
            .string(obj, "date", "date", Len(1, 64))
            .and_then(|raw| match DateTime::parse_from_rfc3339(&raw) {
                Ok(date) => Some(date.with_timezone(&Utc)),
                Err(_) => {
                    checker.issue("date", "Invalid datetime");
                    None
                }
            });
        let category_id = obj
            .get("categoryId")
            .filter(|v| !v.is_null())
            .and_then(|_| checker.record_id::<RecordId>(obj, "categoryId", "categoryId"));
        let image_url = checker.optional_string(obj, "imageUrl", "imageUrl", Len(1, 2048));
        Some(EventInput {
            name: name?,
            description,
            location: location?,
            date: date?,
            category_id,
            image_url,
        })
    });
    checker.finish(input)
}

pub fn ticket(value: &Value) -> Result<TicketInput, ValidationErrors> {
    let mut checker = Checker::new();
    let input = checker.root(value).and_then(|obj| {
        let event_id = checker.record_id::<RecordId>(obj, "eventId", "eventId");
        let name = checker.string(obj, "name", "name", Len(1, 100));
        let price = checker.number(obj, "price", "price", Range(0, i64::MAX));
        let stock = checker.number(obj, "stock", "stock", Range(0, i64::MAX));
        Some(TicketInput {
            event_id: event_id?,
            name: name?,
            price: price?,
            stock: stock?,
        })
    });
    checker.finish(input)
}

pub fn ticket_details(value: &Value) -> Result<TicketDetails, ValidationErrors> {
    let mut checker = Checker::new();
    let input = checker.root(value).and_then(|obj| {
        let event_id = checker.record_id::<RecordId>(obj, "eventId", "eventId");
        let name = checker.string(obj, "name", "name", Len(1, 100));
        let price = checker.number(obj, "price", "price", Range(0, i64::MAX));
        if obj.get("stock").is_some_and(|v| !v.is_null()) {
            checker.issue("stock", "Stock is changed with a relative adjustment");
        }
        Some(TicketDetails {
            event_id: event_id?,
            name: name?,
            price: price?,
        })
    });
    checker.finish(input)
}

/// Signed, non-zero change applied to a ticket's current stock.
pub fn stock_adjustment(value: &Value) -> Result<i64, ValidationErrors> {
    let mut checker = Checker::new();
    let input = checker
        .root(value)
        .and_then(|obj| checker.number(obj, "adjustment", "adjustment", Range(-1_000_000, 1_000_000)))
        .and_then(|delta| {
            if delta == 0 {
                checker.issue("adjustment", "Adjustment must not be zero");
                None
            } else {
                Some(delta)
            }
        });
    checker.finish(input)
}
