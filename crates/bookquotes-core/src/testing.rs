//! Fakes shared by repository and view model tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Notify;

use crate::api::QuoteSource;
use crate::models::{Quote, QuoteApiResponse};
use crate::net::Connectivity;
use crate::utils::eq_ignore_case;

pub fn quote(id: i64, category: &str, text: &str) -> Quote {
    Quote {
        local_id: 0,
        id,
        category: category.to_string(),
        quote: text.to_string(),
        author: "Anonymous".to_string(),
        description: String::new(),
    }
}

/// What the fake service answers with.
#[derive(Debug, Clone)]
pub enum FakeResponse {
    /// The service's whole catalog; category requests get the matching subset.
    Catalog(Vec<Quote>),
    /// A response whose `Quotes` key is null.
    Missing,
    Fail(String),
}

/// Pauses a request at the network boundary until released.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Debug)]
pub struct FakeQuoteSource {
    response: Mutex<FakeResponse>,
    calls: Mutex<Vec<Option<String>>>,
    gate: Option<Gate>,
}

impl FakeQuoteSource {
    pub fn new(response: FakeResponse) -> Self {
        Self {
            response: Mutex::new(response),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn with_catalog(quotes: Vec<Quote>) -> Self {
        Self::new(FakeResponse::Catalog(quotes))
    }

    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_response(&self, response: FakeResponse) {
        *self.response.lock().expect("response lock") = response;
    }

    /// Requested categories in call order (`None` = all quotes endpoint).
    pub fn calls(&self) -> Vec<Option<String>> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }

    async fn respond(&self, category: Option<&str>) -> Result<QuoteApiResponse> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(category.map(str::to_string));

        if let Some(ref gate) = self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let response = self.response.lock().expect("response lock").clone();
        match response {
            FakeResponse::Catalog(quotes) => {
                let quotes = match category {
                    Some(c) => quotes.into_iter().filter(|q| eq_ignore_case(&q.category, c)).collect(),
                    None => quotes,
                };
                Ok(QuoteApiResponse {
                    message: "ok".to_string(),
                    quotes: Some(quotes),
                })
            }
            FakeResponse::Missing => Ok(QuoteApiResponse {
                message: "No quotes".to_string(),
                quotes: None,
            }),
            FakeResponse::Fail(message) => Err(anyhow!(message)),
        }
    }
}

#[async_trait]
impl QuoteSource for FakeQuoteSource {
    async fn all_quotes(&self) -> Result<QuoteApiResponse> {
        self.respond(None).await
    }

    async fn quotes_by_category(&self, category: &str) -> Result<QuoteApiResponse> {
        self.respond(Some(category)).await
    }
}

#[derive(Debug)]
pub struct FakeConnectivity {
    online: AtomicBool,
}

impl FakeConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connectivity for FakeConnectivity {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
