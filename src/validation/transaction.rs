use serde_json::Value;

use super::{join, Checker, Range, ValidationErrors};
use crate::db::models::{RecordId, TicketItem, TransactionStatus};

pub const MAX_QUANTITY_PER_ITEM: i64 = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionInput {
    pub tickets: Vec<TicketItem>,
    pub total_ticket: i64,
    pub total_price: i64,
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusUpdate {
    pub status: TransactionStatus,
}

pub fn check_transaction(value: &Value) -> Result<TransactionInput, ValidationErrors> {
    let mut checker = Checker::new();
    let input = checker.root(value).and_then(|obj| {
        let tickets = checker.array(obj, "tickets", "tickets", 1).map(|items| {
            items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| {
                    let path = join("tickets", &index.to_string());
                    let Value::Object(item) = item else {
                        checker.issue(path, "Expected object");
                        return None;
                    };
                    let ticket_id = checker.record_id::<RecordId>(item, "ticketId", &join(&path, "ticketId"));
                    let quantity = checker.number(
                        item,
                        "quantity",
                        &join(&path, "quantity"),
                        Range(1, MAX_QUANTITY_PER_ITEM),
                    );
                    Some(TicketItem {
                        ticket_id: ticket_id?,
                        quantity: quantity?,
                    })
                })
                .collect::<Vec<_>>()
        });
        let total_ticket = checker.number(obj, "totalTicket", "totalTicket", Range(1, i64::MAX));
        let total_price = checker.number(obj, "totalPrice", "totalPrice", Range(0, i64::MAX));
        let status = checker.one_of(
            obj,
            "status",
            "status",
            &[
                TransactionStatus::Pending,
                TransactionStatus::Paid,
                TransactionStatus::Cancelled,
            ],
            Some(TransactionStatus::Pending),
        );
        Some(TransactionInput {
            tickets: tickets?,
            total_ticket: total_ticket?,
            total_price: total_price?,
            status: status?,
        })
    });
    checker.finish(input)
}

pub fn transaction(value: &Value) -> Result<TransactionInput, ValidationErrors> {
    check_transaction(value)
}

/// Back-office settlement of a pending transaction.
pub fn status_update(value: &Value) -> Result<StatusUpdate, ValidationErrors> {
    let mut checker = Checker::new();
    let input = checker
        .root(value)
        .and_then(|obj| {
            checker.one_of(
                obj,
                "status",
                "status",
                &[
                    TransactionStatus::Paid,
                    TransactionStatus::Cancelled,
                    TransactionStatus::Reject,
                ],
                None,
            )
        })
        .map(|status| StatusUpdate { status });
    checker.finish(input)
}
