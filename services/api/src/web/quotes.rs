//! services/api/src/web/quotes.rs
//!
//! Handler for the daily-quote endpoint. The quote pool ships inside the
//! binary; the pick rotates once per UTC day.

use crate::web::rest::fail;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::error;

const QUOTES_JSON: &str = include_str!("../../assets/daily_quotes.json");

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub quote: String,
    pub author: String,
}

#[derive(Serialize)]
pub struct QuoteResponse {
    pub status: bool,
    #[serde(rename = "dailyQuote")]
    pub daily_quote: Quote,
}

fn quote_pool() -> &'static [Quote] {
    static POOL: OnceLock<Vec<Quote>> = OnceLock::new();
    POOL.get_or_init(|| match serde_json::from_str(QUOTES_JSON) {
        Ok(quotes) => quotes,
        Err(e) => {
            error!("Embedded quote pool failed to parse: {e}");
            Vec::new()
        }
    })
}

/// The quote for today: UTC day number modulo the pool size, so every client
/// sees the same quote on the same day without any stored state.
pub async fn daily_quote_handler() -> impl IntoResponse {
    let pool = quote_pool();
    if pool.is_empty() {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "Could not load thoughts")
            .into_response();
    }
    let day = Utc::now().timestamp() / SECONDS_PER_DAY;
    let quote = pool[day as usize % pool.len()].clone();
    Json(QuoteResponse {
        status: true,
        daily_quote: quote,
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_quote_pool_parses_and_is_non_empty() {
        let pool: Vec<Quote> = serde_json::from_str(QUOTES_JSON).unwrap();
        assert!(!pool.is_empty());
        assert!(pool.iter().all(|q| !q.quote.is_empty() && !q.author.is_empty()));
    }
}
