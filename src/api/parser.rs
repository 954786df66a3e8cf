// src/api/parser.rs
//! Turns raw catalog responses into [`RemotePage`]s.

use super::client::ApiResponse;
use super::responses::{BooksResponse, RemotePage};
use crate::constants::ERROR_BODY_PREVIEW_LENGTH;
use crate::error::AppError;

/// Parses a `GET /books` response, mapping non-success statuses to errors.
pub fn parse_books_response(result: ApiResponse<String>) -> Result<RemotePage, AppError> {
    if !result.status.is_success() {
        log::warn!("Catalog request {} failed with {}", result.url, result.status);
        return Err(AppError::service(result.status, &result.data));
    }
    parse_books_body(&result.data, &result.url)
}

/// Parses a successful response body.
pub fn parse_books_body(body: &str, url: &str) -> Result<RemotePage, AppError> {
    let response: BooksResponse = serde_json::from_str(body).map_err(|e| {
        log::error!("Failed to parse response from {}: {}", url, e);
        AppError::MalformedResponse(format!("{} (body: {})", e, preview(body)))
    })?;
    Ok(response.into())
}

/// Truncates a response body for inclusion in error messages.
pub fn preview(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_PREVIEW_LENGTH) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn response(status: StatusCode, body: &str) -> ApiResponse<String> {
        ApiResponse {
            data: body.to_string(),
            status,
            url: "http://localhost/books?page=1".to_string(),
        }
    }

    #[test]
    fn parses_books_and_has_more() {
        let page = parse_books_response(response(
            StatusCode::OK,
            r#"{"books": [{"id": 1, "title": "A"}, {"id": 2, "title": "B"}], "hasMore": true}"#,
        ))
        .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[1].title, "B");
        assert!(page.has_more);
    }

    #[test]
    fn missing_fields_mean_empty_and_exhausted() {
        let page = parse_books_response(response(StatusCode::OK, "{}")).unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn malformed_body_is_a_remote_failure() {
        let err = parse_books_response(response(StatusCode::OK, "<html>oops</html>")).unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)));
        assert!(err.is_network_or_server());
    }

    #[test]
    fn error_status_is_a_service_failure() {
        let err = parse_books_response(response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "generator crashed",
        ))
        .unwrap_err();
        match err {
            AppError::Service { status, message } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message, "generator crashed");
            }
            other => panic!("Expected AppError::Service, got {:?}", other),
        }
    }

    #[test]
    fn preview_truncates_long_bodies() {
        let body = "x".repeat(ERROR_BODY_PREVIEW_LENGTH + 50);
        let shown = preview(&body);
        assert_eq!(shown.len(), ERROR_BODY_PREVIEW_LENGTH + 3);
        assert!(shown.ends_with("..."));
    }
}
