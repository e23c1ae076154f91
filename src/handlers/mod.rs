//! HTTP handlers for the storefront, the signed-in profile area and the back
//! office. Authentication endpoints live in `crate::auth::handlers`.

pub mod admin;
pub mod profile;
pub mod storefront;

use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::json;

use crate::db::models::RecordId;
use crate::error::AppError;
use crate::validation::ValidationErrors;

/// `{"data": ..., "message": ...}`
pub fn envelope<T: Serialize>(data: T, message: &str) -> serde_json::Value {
    json!({ "data": data, "message": message })
}

pub fn ok<T: Serialize>(data: T, message: &str) -> HttpResponse {
    HttpResponse::Ok().json(envelope(data, message))
}

pub fn created<T: Serialize>(data: T, message: &str) -> HttpResponse {
    HttpResponse::Created().json(envelope(data, message))
}

/// Parses an id taken from the URL or query string.
pub fn parse_id(raw: &str, path: &str) -> Result<RecordId, AppError> {
    raw.parse()
        .map_err(|_| ValidationErrors::single(path, "Invalid id").into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let body = envelope(vec![1, 2], "Fetched");
        assert_eq!(body["data"], json!([1, 2]));
        assert_eq!(body["message"], "Fetched");
    }

    #[test]
    fn test_parse_id() {
        assert!(parse_id("65a1b2c3d4e5f60718293a4b", "id").is_ok());
        match parse_id("42", "id") {
            Err(AppError::ValidationError(errors)) => {
                assert_eq!(errors.message_for("id"), Some("Invalid id"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
