//! HTTP client for a TheCocktailDB-style cocktail API.
//!
//! Drinks are listed by first letter (`search.php?f=<letter>`); letters are
//! fetched concurrently, bounded by a semaphore.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

use mocktailverse_shared::{MocktailverseError, RawRecord, Result};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("Mocktailverse/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 3;

/// Settings for [`CocktailApiClient`].
#[derive(Debug, Clone)]
pub struct ApiClientOptions {
    /// Base URL, e.g. `https://www.thecocktaildb.com/api/json/v1/1`.
    pub base_url: Url,
    /// First letters to query.
    pub letters: Vec<char>,
    /// Maximum concurrent requests.
    pub concurrency: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Response envelope of `search.php`.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    /// `null` when nothing matches.
    drinks: Option<Vec<serde_json::Value>>,
}

/// Cocktail API client.
#[derive(Debug, Clone)]
pub struct CocktailApiClient {
    client: Client,
    options: ApiClientOptions,
}

impl CocktailApiClient {
    pub fn new(options: ApiClientOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .map_err(|e| {
                MocktailverseError::Network(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, options })
    }

    pub fn options(&self) -> &ApiClientOptions {
        &self.options
    }

    /// Build the search URL for one letter.
    fn search_url(&self, letter: char) -> Result<Url> {
        let mut base = self.options.base_url.clone();
        // Treat the base as a directory so `join` appends instead of replacing
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let mut url = base
            .join("search.php")
            .map_err(|e| MocktailverseError::config(format!("invalid API base URL: {e}")))?;
        url.query_pairs_mut().append_pair("f", &letter.to_string());
        Ok(url)
    }

    /// Fetch every drink for a single first letter.
    pub async fn fetch_letter(&self, letter: char) -> Result<Vec<RawRecord>> {
        let url = self.search_url(letter)?;
        fetch_search(&self.client, &url).await
    }

    /// Fetch all configured letters. Any failed letter fails the whole batch,
    /// so a retry re-lands a complete extract. Letters still queued or in
    /// flight are aborted on the first failure.
    #[instrument(skip_all, fields(base_url = %self.options.base_url, letters = self.options.letters.len()))]
    pub async fn fetch_all(&self) -> Result<Vec<RawRecord>> {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (idx, &letter) in self.options.letters.iter().enumerate() {
            let url = self.search_url(letter)?;
            let client = self.client.clone();
            let sem = semaphore.clone();

            tasks.spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|e| MocktailverseError::Network(format!("semaphore closed: {e}")))?;
                fetch_search(&client, &url).await.map(|batch| (idx, batch))
            });
        }

        // Completion order is arbitrary; keep the configured letter order.
        let mut batches: Vec<Option<Vec<RawRecord>>> = vec![None; self.options.letters.len()];
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined
                .map_err(|e| MocktailverseError::Network(format!("fetch task failed: {e}")))
                .and_then(|r| r);
            match outcome {
                Ok((idx, batch)) => batches[idx] = Some(batch),
                Err(e) => {
                    tasks.abort_all();
                    debug!(aborted = tasks.len(), "abandoning remaining letters");
                    return Err(e);
                }
            }
        }

        let records: Vec<RawRecord> = batches.into_iter().flatten().flatten().collect();
        info!(records = records.len(), "fetched drinks from API");
        Ok(records)
    }
}

async fn fetch_search(client: &Client, url: &Url) -> Result<Vec<RawRecord>> {
    debug!(%url, "requesting drinks");

    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| MocktailverseError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        warn!(%url, %status, "API request failed");
        return Err(MocktailverseError::Network(format!("{url}: HTTP {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| MocktailverseError::Network(format!("{url}: {e}")))?;

    // The API answers an empty body for some letters
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let parsed: SearchResponse = serde_json::from_str(&body)
        .map_err(|e| MocktailverseError::parse(format!("{url}: invalid API response: {e}")))?;

    Ok(parsed
        .drinks
        .unwrap_or_default()
        .into_iter()
        .map(RawRecord)
        .collect())
}
