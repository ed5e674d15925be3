use std::collections::HashMap;

use tokio::sync::RwLock;

use coverdesk_core::domain::quote::{Quote, QuoteId};

use super::{QuoteRepository, RepositoryError};

/// Whether a listing came straight from the store or from the local cache
/// after a remote failure. Degradation is explicit, never silent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Freshness {
    Live,
    Stale { reason: String },
}

#[derive(Clone, Debug)]
pub struct QuoteListing {
    pub quotes: Vec<Quote>,
    pub freshness: Freshness,
}

/// Merge-remote-and-local cache over a [`QuoteRepository`].
///
/// Reads merge the store into the cache (store wins by id). Writes go to the
/// store first; if the store is unreachable the cached copy is still updated
/// so later stale reads see the local edit, and the error propagates to the
/// caller. Version conflicts never touch the cache: a rejected write is not
/// a lost write.
pub struct CachedQuoteRepository<R> {
    inner: R,
    cache: RwLock<HashMap<String, Quote>>,
}

impl<R> CachedQuoteRepository<R>
where
    R: QuoteRepository,
{
    pub fn new(inner: R) -> Self {
        Self { inner, cache: RwLock::new(HashMap::new()) }
    }

    /// Listing that degrades to the cache when the store is unreachable.
    /// Interactive views use this; workflow operations stay on the trait
    /// methods, which surface storage errors instead.
    pub async fn list_merged(&self) -> QuoteListing {
        match self.inner.list_all().await {
            Ok(remote) => {
                let mut cache = self.cache.write().await;
                for quote in &remote {
                    cache.insert(quote.id.0.clone(), quote.clone());
                }
                let quotes = sorted_newest_first(cache.values().cloned().collect());
                QuoteListing { quotes, freshness: Freshness::Live }
            }
            Err(error) => {
                let cache = self.cache.read().await;
                let quotes = sorted_newest_first(cache.values().cloned().collect());
                QuoteListing { quotes, freshness: Freshness::Stale { reason: error.to_string() } }
            }
        }
    }
}

fn sorted_newest_first(mut quotes: Vec<Quote>) -> Vec<Quote> {
    quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.0.cmp(&a.id.0)));
    quotes
}

#[async_trait::async_trait]
impl<R> QuoteRepository for CachedQuoteRepository<R>
where
    R: QuoteRepository,
{
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        {
            let cache = self.cache.read().await;
            if let Some(quote) = cache.get(&id.0) {
                return Ok(Some(quote.clone()));
            }
        }

        let fetched = self.inner.find_by_id(id).await?;
        if let Some(quote) = &fetched {
            let mut cache = self.cache.write().await;
            cache.insert(quote.id.0.clone(), quote.clone());
        }
        Ok(fetched)
    }

    async fn list_all(&self) -> Result<Vec<Quote>, RepositoryError> {
        let remote = self.inner.list_all().await?;
        let mut cache = self.cache.write().await;
        for quote in &remote {
            cache.insert(quote.id.0.clone(), quote.clone());
        }
        Ok(sorted_newest_first(cache.values().cloned().collect()))
    }

    async fn insert(&self, quote: Quote) -> Result<(), RepositoryError> {
        let result = self.inner.insert(quote.clone()).await;
        match &result {
            Ok(()) | Err(RepositoryError::Database(_)) => {
                let mut cache = self.cache.write().await;
                cache.insert(quote.id.0.clone(), quote);
            }
            Err(_) => {}
        }
        result
    }

    async fn update_guarded(
        &self,
        quote: Quote,
        expected_version: u64,
    ) -> Result<(), RepositoryError> {
        let result = self.inner.update_guarded(quote.clone(), expected_version).await;
        match &result {
            Ok(()) | Err(RepositoryError::Database(_)) => {
                let mut cache = self.cache.write().await;
                cache.insert(quote.id.0.clone(), quote);
            }
            Err(_) => {}
        }
        result
    }
}
