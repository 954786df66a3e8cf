// src/api/client.rs
//! Thin HTTP client for the catalog service.
//!
//! This module wraps reqwest for requests to the book generator backend.
//! It builds the request and hands the raw body to the parser; it makes no
//! decisions about pagination or retries.

use super::responses::RemotePage;
use crate::error::AppError;
use crate::types::{Cursor, QueryKey};
use reqwest::{header, Client, Response};
use url::Url;

const BOOKS_ENDPOINT: &str = "books";

/// A thin wrapper around reqwest Client for catalog requests.
#[derive(Clone, Debug)]
pub struct BookHttpClient {
    client: Client,
    base_url: Url,
}

impl BookHttpClient {
    /// Creates a client rooted at `base_url`.
    pub fn new(base_url: &Url) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers())
            .build()?;
        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
        })
    }

    fn create_headers() -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers
    }

    /// The absolute URL of the books endpoint.
    pub fn books_url(&self) -> Result<Url, AppError> {
        Ok(self.base_url.join(BOOKS_ENDPOINT)?)
    }

    /// Makes a GET request for one page of books.
    pub async fn get_books(&self, key: &QueryKey, cursor: Cursor) -> Result<Response, AppError> {
        let url = self.books_url()?;
        log::debug!("GET {} page={} ({})", url, cursor, key);
        let response = self
            .client
            .get(url)
            .query(&key.request_params(cursor))
            .send()
            .await?;
        log::debug!("Catalog responded {} for page {}", response.status(), cursor);
        Ok(response)
    }
}

/// Keeps the last path segment of the base URL when joining endpoints.
fn with_trailing_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        return url.clone();
    }
    let mut url = url.clone();
    let path = format!("{}/", url.path());
    url.set_path(&path);
    url
}

#[async_trait::async_trait]
impl super::BookSource for BookHttpClient {
    async fn fetch_page(&self, key: &QueryKey, cursor: Cursor) -> Result<RemotePage, AppError> {
        let response = self.get_books(key, cursor).await?;
        let result = extract_response_text(response).await?;
        super::parser::parse_books_response(result)
    }
}

/// Result of an HTTP operation with response metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: reqwest::StatusCode,
    pub url: String,
}

/// Extracts the response body as text with metadata.
pub async fn extract_response_text(response: Response) -> Result<ApiResponse<String>, AppError> {
    let status = response.status();
    let url = response.url().to_string();
    let text = response.text().await?;

    Ok(ApiResponse {
        data: text,
        status,
        url,
    })
}
